// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership tags and deterministic names for cloud resources.
//!
//! Every target group the engine creates carries the ownership selector of the
//! workload that owns it. The selector is used both to discover existing
//! resources and to scope garbage collection, so two workloads must never share
//! one. It is derived from the cluster name plus the workload's namespace and
//! name, which makes selectors of distinct workloads disjoint by construction.

use crate::cloud::TagFilters;
use crate::constants::{
    TAG_CLUSTER_OWNED, TAG_CLUSTER_PREFIX, TAG_INGRESS_NAME, TAG_NAMESPACE, TAG_SERVICE_NAME,
    TAG_SERVICE_PORT, TARGET_GROUP_NAME_MAX_LEN, TARGET_GROUP_NAME_PREFIX,
};
use crate::crd::TargetType;
use crate::model::{Backend, WorkloadKey};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Immutable tag key/value set identifying the owner of a group of cloud resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnershipSelector {
    tags: BTreeMap<String, String>,
}

impl OwnershipSelector {
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Exact-match tag filters for this selector.
    #[must_use]
    pub fn to_tag_filters(&self) -> TagFilters {
        self.tags
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect()
    }

    /// Whether a resource tagged with `tags` falls under this selector.
    #[must_use]
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        self.tags.iter().all(|(k, v)| tags.get(k) == Some(v))
    }
}

impl fmt::Display for OwnershipSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
        f.write_str(&pairs.join(","))
    }
}

/// Derives ownership selectors, per-backend tags and target group names.
#[derive(Clone, Debug)]
pub struct NameTagGenerator {
    cluster_name: String,
}

impl NameTagGenerator {
    #[must_use]
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
        }
    }

    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Ownership selector of all target groups created for one workload.
    #[must_use]
    pub fn tag_tg_group(&self, workload: &WorkloadKey) -> OwnershipSelector {
        let mut tags = BTreeMap::new();
        tags.insert(
            format!("{TAG_CLUSTER_PREFIX}{}", self.cluster_name),
            TAG_CLUSTER_OWNED.to_string(),
        );
        tags.insert(TAG_NAMESPACE.to_string(), workload.namespace.clone());
        tags.insert(TAG_INGRESS_NAME.to_string(), workload.name.clone());
        OwnershipSelector { tags }
    }

    /// Tags identifying the backend a target group serves.
    #[must_use]
    pub fn tag_tg(&self, backend: &Backend) -> BTreeMap<String, String> {
        BTreeMap::from([
            (TAG_SERVICE_NAME.to_string(), backend.service_name.clone()),
            (TAG_SERVICE_PORT.to_string(), backend.service_port.to_string()),
        ])
    }

    /// Full tag set of a backend's target group: ownership selector plus backend tags.
    #[must_use]
    pub fn tags_for(&self, workload: &WorkloadKey, backend: &Backend) -> BTreeMap<String, String> {
        let mut tags = self.tag_tg_group(workload).tags;
        tags.extend(self.tag_tg(backend));
        tags
    }

    /// Deterministic target group name.
    ///
    /// Recreating a deleted target group for the same backend yields the same
    /// name. The name is `k8s-<ns>-<svc>-<hash>` truncated to the cloud limit.
    #[must_use]
    pub fn name_tg(
        &self,
        workload: &WorkloadKey,
        backend: &Backend,
        target_type: TargetType,
        protocol: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.cluster_name.as_bytes());
        hasher.update(workload.namespace.as_bytes());
        hasher.update(workload.name.as_bytes());
        hasher.update(backend.service_name.as_bytes());
        hasher.update(backend.service_port.to_string().as_bytes());
        hasher.update(target_type.as_str().as_bytes());
        hasher.update(protocol.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let namespace: String = sanitize(&workload.namespace).chars().take(8).collect();
        let service: String = sanitize(&backend.service_name).chars().take(8).collect();
        let hash_len = TARGET_GROUP_NAME_MAX_LEN
            - TARGET_GROUP_NAME_PREFIX.len()
            - namespace.len()
            - service.len()
            - 3;
        format!(
            "{TARGET_GROUP_NAME_PREFIX}-{namespace}-{service}-{}",
            &digest[..hash_len]
        )
    }
}

/// Keep only characters valid in a target group name.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
#[path = "tags_tests.rs"]
mod tags_tests;
