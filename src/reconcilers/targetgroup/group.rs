// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Target group lifecycle for a whole ingress.
//!
//! [`TargetGroupGroupController`] realizes one target group per distinct backend
//! an ingress references, garbage-collects target groups the ingress no longer
//! uses, and tears everything down when the ingress goes away.
//!
//! Backends are collected from the default backend, then every rule path in
//! order, then the service targets of every `forward` action annotation. Paths
//! whose port is `use-annotation` are skipped; the annotation's own targets
//! stand in for them.

use super::TargetGroupReconciler;
use crate::cancel::ensure_active;
use crate::cloud::ResourceType;
use crate::context::Context;
use crate::errors::{LbError, Result};
use crate::metrics::{
    record_reconciliation_error, record_reconciliation_success, record_resource_deleted,
    CONTROLLER_TARGET_GROUP_GROUP, RESOURCE_TARGET_GROUP,
};
use crate::model::{Backend, BackendRef, ServicePortRef, TargetGroupGroup, WorkloadKey};
use k8s_openapi::api::networking::v1::Ingress;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Manages every target group of one ingress.
#[derive(Clone)]
pub struct TargetGroupGroupController {
    ctx: Arc<Context>,
    tg_reconciler: TargetGroupReconciler,
}

impl TargetGroupGroupController {
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            tg_reconciler: TargetGroupReconciler::new(ctx.clone()),
            ctx,
        }
    }

    /// Ensure a target group exists for each distinct backend of `ingress`.
    ///
    /// Stops at the first backend that fails; nothing is garbage-collected on
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the first error from annotation parsing or a backend reconcile.
    pub async fn reconcile(
        &self,
        cancel: &CancellationToken,
        ingress: &Ingress,
    ) -> Result<TargetGroupGroup> {
        let start = Instant::now();
        let workload = WorkloadKey::of(ingress);
        info!("Reconciling target groups of ingress {}", workload);

        let result = self.reconcile_backends(cancel, ingress, &workload).await;
        match &result {
            Ok(group) => {
                debug!(
                    "Ingress {} has {} target group(s)",
                    workload,
                    group.len()
                );
                record_reconciliation_success(CONTROLLER_TARGET_GROUP_GROUP, start.elapsed());
            }
            Err(e) => {
                error!("Failed to reconcile target groups of {}: {}", workload, e);
                record_reconciliation_error(
                    CONTROLLER_TARGET_GROUP_GROUP,
                    e.reason(),
                    start.elapsed(),
                );
            }
        }
        result
    }

    async fn reconcile_backends(
        &self,
        cancel: &CancellationToken,
        ingress: &Ingress,
        workload: &WorkloadKey,
    ) -> Result<TargetGroupGroup> {
        let mut tg_by_backend = BTreeMap::new();
        for backend in self.extract_backends(ingress, workload)? {
            let tg = self.tg_reconciler.reconcile(cancel, ingress, &backend).await?;
            tg_by_backend.insert(backend, tg);
        }
        let selector = self.ctx.name_tag_gen.tag_tg_group(workload);
        Ok(TargetGroupGroup::new(tg_by_backend, selector))
    }

    /// Delete every target group under the group's selector that the group does not use.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag search or a delete fails. Deletes already
    /// issued are not rolled back.
    pub async fn gc(&self, cancel: &CancellationToken, group: &TargetGroupGroup) -> Result<()> {
        let filters = group.selector().to_tag_filters();
        ensure_active(cancel, "GetResources")?;
        let current: BTreeSet<String> = self
            .ctx
            .cloud
            .get_resources_by_filters(&filters, ResourceType::TargetGroup)
            .await
            .map_err(|e| LbError::cloud("GetResources", group.selector().to_string(), e))?
            .into_iter()
            .collect();
        let used: BTreeSet<&str> = group
            .tg_by_backend()
            .values()
            .map(|tg| tg.arn.as_str())
            .collect();

        for arn in current.iter().filter(|arn| !used.contains(arn.as_str())) {
            ensure_active(cancel, "DeleteTargetGroup")?;
            info!("Deleting unused target group {}", arn);
            self.ctx
                .cloud
                .delete_target_group_by_arn(arn)
                .await
                .map_err(|e| LbError::cloud("DeleteTargetGroup", arn, e))?;
            record_resource_deleted(RESOURCE_TARGET_GROUP);
        }
        Ok(())
    }

    /// Delete every target group created for the ingress `key`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::gc`].
    pub async fn delete(&self, cancel: &CancellationToken, key: &WorkloadKey) -> Result<()> {
        info!("Deleting all target groups of ingress {}", key);
        let group = TargetGroupGroup::empty(self.ctx.name_tag_gen.tag_tg_group(key));
        self.gc(cancel, &group).await
    }

    /// Distinct backends referenced by `ingress`, in first-seen order.
    fn extract_backends(&self, ingress: &Ingress, workload: &WorkloadKey) -> Result<Vec<Backend>> {
        let mut refs = Vec::new();
        if let Some(spec) = &ingress.spec {
            refs.extend(spec.default_backend.as_ref().and_then(BackendRef::from_ingress_backend));
            for rule in spec.rules.iter().flatten() {
                let Some(http) = &rule.http else {
                    continue;
                };
                refs.extend(
                    http.paths
                        .iter()
                        .filter_map(|path| BackendRef::from_ingress_backend(&path.backend)),
                );
            }
        }
        let mut backends: Vec<Backend> = refs.iter().filter_map(BackendRef::literal).collect();

        let annos = self.ctx.store.get_ingress_annotations(workload)?;
        for action in annos.actions.values() {
            for target in action.forward_targets() {
                if let (Some(name), Some(port)) = (&target.service_name, &target.service_port) {
                    backends.push(Backend::new(name.clone(), ServicePortRef::parse(port)));
                }
            }
        }

        let mut seen = BTreeSet::new();
        backends.retain(|b| seen.insert(b.clone()));
        Ok(backends)
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod group_tests;
