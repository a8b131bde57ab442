// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all reconcilers.
//!
//! Every controller receives an `Arc<Context>` that contains:
//! - The cloud API collaborator
//! - The workload configuration store
//! - The ownership tag / name generator
//! - Engine-level configuration

use crate::cloud::{CloudApi, Protocol};
use crate::constants::DEFAULT_SSL_POLICY;
use crate::crd::TargetType;
use crate::store::Store;
use crate::tags::NameTagGenerator;
use std::sync::Arc;

/// Engine-level defaults applied when a workload does not annotate a value.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Cluster name, part of every ownership selector
    pub cluster_name: String,
    /// SSL policy for TLS listeners
    pub default_ssl_policy: String,
    /// Target type for target groups
    pub default_target_type: TargetType,
    /// Protocol between load balancer and targets
    pub default_backend_protocol: Protocol,
}

impl EngineConfig {
    /// Defaults for the given cluster.
    #[must_use]
    pub fn for_cluster(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            default_ssl_policy: DEFAULT_SSL_POLICY.to_string(),
            default_target_type: TargetType::Instance,
            default_backend_protocol: Protocol::Http,
        }
    }
}

/// Shared context passed to all reconcilers.
#[derive(Clone)]
pub struct Context {
    /// Cloud load-balancing API
    pub cloud: Arc<dyn CloudApi>,

    /// Workload object and annotation lookup
    pub store: Arc<dyn Store>,

    /// Ownership selectors, backend tags and target group names
    pub name_tag_gen: NameTagGenerator,

    /// Engine defaults
    pub config: EngineConfig,
}

impl Context {
    #[must_use]
    pub fn new(cloud: Arc<dyn CloudApi>, store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self {
            cloud,
            store,
            name_tag_gen: NameTagGenerator::new(config.cluster_name.clone()),
            config,
        }
    }
}
