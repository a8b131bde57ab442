// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Listener lifecycle for a whole load balancer.
//!
//! [`ListenerGroupController`] reconciles one listener per port a service
//! declares, then deletes every listener on the load balancer whose port is no
//! longer declared.

use super::{delete_listener, ListenerReconciler, ReconcileOptions};
use crate::cancel::ensure_active;
use crate::cloud::SdkListener;
use crate::context::Context;
use crate::errors::{LbError, Result};
use crate::metrics::{
    record_reconciliation_error, record_reconciliation_success, CONTROLLER_LISTENER_GROUP,
};
use crate::model::{TargetGroupGroup, WorkloadKey};
use k8s_openapi::api::core::v1::Service;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Manages every listener of one load balancer.
#[derive(Clone)]
pub struct ListenerGroupController {
    ctx: Arc<Context>,
    ls_reconciler: ListenerReconciler,
}

impl ListenerGroupController {
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ls_reconciler: ListenerReconciler::new(ctx.clone()),
            ctx,
        }
    }

    /// Ensure the listeners on `lb_arn` match the ports `service` declares.
    ///
    /// # Errors
    ///
    /// Returns the first error from the annotation lookup, a listener
    /// reconcile, or a delete.
    pub async fn reconcile(
        &self,
        cancel: &CancellationToken,
        lb_arn: &str,
        service: &Service,
        tg_group: &TargetGroupGroup,
    ) -> Result<()> {
        let start = Instant::now();
        let key = WorkloadKey::of(service);
        info!("Reconciling listeners of {} on {}", key, lb_arn);

        let result = self.reconcile_ports(cancel, lb_arn, service, &key, tg_group).await;
        match &result {
            Ok(()) => record_reconciliation_success(CONTROLLER_LISTENER_GROUP, start.elapsed()),
            Err(e) => {
                error!("Failed to reconcile listeners of {}: {}", key, e);
                record_reconciliation_error(CONTROLLER_LISTENER_GROUP, e.reason(), start.elapsed());
            }
        }
        result
    }

    async fn reconcile_ports(
        &self,
        cancel: &CancellationToken,
        lb_arn: &str,
        service: &Service,
        key: &WorkloadKey,
        tg_group: &TargetGroupGroup,
    ) -> Result<()> {
        let service_annos = self.ctx.store.get_service_annotations(key, None)?;
        let mut instances_by_port = self.load_listener_instances(cancel, lb_arn).await?;

        let mut ports_in_use = BTreeSet::new();
        for port in &service_annos.load_balancer.ports {
            ports_in_use.insert(port.port);
            let instance = instances_by_port.get(&port.port).cloned();
            self.ls_reconciler
                .reconcile(
                    cancel,
                    ReconcileOptions {
                        lb_arn,
                        service,
                        service_annos: &service_annos,
                        port,
                        tg_group,
                        instance,
                    },
                )
                .await?;
        }

        instances_by_port.retain(|port, _| !ports_in_use.contains(port));
        for instance in instances_by_port.values() {
            delete_listener(self.ctx.cloud.as_ref(), cancel, instance).await?;
        }
        Ok(())
    }

    /// Delete every listener on `lb_arn`.
    ///
    /// # Errors
    ///
    /// Returns the first failing list or delete call.
    pub async fn delete(&self, cancel: &CancellationToken, lb_arn: &str) -> Result<()> {
        info!("Deleting all listeners on {}", lb_arn);
        let instances_by_port = self.load_listener_instances(cancel, lb_arn).await?;
        for instance in instances_by_port.values() {
            delete_listener(self.ctx.cloud.as_ref(), cancel, instance).await?;
        }
        Ok(())
    }

    async fn load_listener_instances(
        &self,
        cancel: &CancellationToken,
        lb_arn: &str,
    ) -> Result<BTreeMap<i64, SdkListener>> {
        ensure_active(cancel, "DescribeListeners")?;
        let instances = self
            .ctx
            .cloud
            .list_listeners_by_load_balancer(lb_arn)
            .await
            .map_err(|e| LbError::cloud("DescribeListeners", lb_arn, e))?;
        Ok(instances.into_iter().map(|l| (l.port, l)).collect())
    }
}

#[cfg(test)]
#[path = "group_tests.rs"]
mod group_tests;
