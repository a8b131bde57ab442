// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Target group reconciliation.
//!
//! [`TargetGroupReconciler`] ensures one cloud target group exists for a single
//! `(workload, backend)` pair and returns its ARN. The group-level logic that
//! walks every backend of an ingress and garbage-collects leftovers lives in
//! [`group`].
//!
//! ## Reconcile flow
//!
//! 1. Build the desired target group from annotations and the service port
//! 2. Look up an existing target group by its full tag set
//! 3. Create it when absent
//! 4. Fail with a drift conflict when protocol, port or target type differ
//! 5. Modify the health check only when it differs

pub mod group;

use crate::cancel::ensure_active;
use crate::cloud::{HealthCheckConfig, ResourceType, SdkTargetGroup, TargetGroupInput};
use crate::constants::{
    DEFAULT_HEALTHCHECK_INTERVAL_SECONDS, DEFAULT_HEALTHCHECK_PATH, DEFAULT_HEALTHCHECK_PORT,
    DEFAULT_HEALTHCHECK_TIMEOUT_SECONDS, DEFAULT_HEALTHY_THRESHOLD_COUNT, DEFAULT_SUCCESS_CODES,
    DEFAULT_UNHEALTHY_THRESHOLD_COUNT,
};
use crate::context::Context;
use crate::crd::TargetType;
use crate::errors::{LbError, Result};
use crate::metrics::{record_resource_created, record_resource_updated, RESOURCE_TARGET_GROUP};
use crate::model::{Backend, ServicePortRef, TargetGroup, WorkloadKey};
use k8s_openapi::api::core::v1::{Service, ServicePort};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ensures the target group of one backend exists and matches its desired configuration.
#[derive(Clone)]
pub struct TargetGroupReconciler {
    ctx: Arc<Context>,
}

impl TargetGroupReconciler {
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Reconcile the target group serving `backend` for `ingress`.
    ///
    /// # Errors
    ///
    /// - `LbError::Store` / `LbError::InvalidAnnotation` if configuration cannot be read
    /// - `LbError::Config` if the backend's service port cannot be resolved
    /// - `LbError::DriftConflict` if an immutable attribute differs from the cloud
    /// - `LbError::CloudApi` if a cloud call fails
    /// - `LbError::Cancelled` if `cancel` fires before a cloud call
    pub async fn reconcile(
        &self,
        cancel: &CancellationToken,
        ingress: &Ingress,
        backend: &Backend,
    ) -> Result<TargetGroup> {
        let workload = WorkloadKey::of(ingress);
        let desired = self.build_desired(&workload, backend)?;

        let existing = self.find_existing(cancel, &desired).await?;
        let tg = match existing {
            None => {
                ensure_active(cancel, "CreateTargetGroup")?;
                info!(
                    "Creating target group {} for backend {} of {}",
                    desired.name, backend, workload
                );
                let created = self
                    .ctx
                    .cloud
                    .create_target_group(&desired)
                    .await
                    .map_err(|e| LbError::cloud("CreateTargetGroup", &desired.name, e))?;
                record_resource_created(RESOURCE_TARGET_GROUP);
                created
            }
            Some(actual) => self.update(cancel, &desired, actual).await?,
        };

        Ok(TargetGroup {
            arn: tg.target_group_arn,
            name: tg.target_group_name,
            target_type: tg.target_type,
        })
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        desired: &TargetGroupInput,
        actual: SdkTargetGroup,
    ) -> Result<SdkTargetGroup> {
        let drifted = immutable_drift(desired, &actual);
        if !drifted.is_empty() {
            warn!(
                "Target group {} drifted on immutable fields: {:?}",
                actual.target_group_arn, drifted
            );
            return Err(LbError::DriftConflict {
                resource: actual.target_group_arn,
                fields: drifted.into_iter().map(str::to_string).collect(),
            });
        }

        if desired.health_check == actual.health_check {
            debug!("Target group {} is up to date", actual.target_group_arn);
            return Ok(actual);
        }

        ensure_active(cancel, "ModifyTargetGroup")?;
        info!(
            "Modifying health check of target group {}",
            actual.target_group_arn
        );
        let modified = self
            .ctx
            .cloud
            .modify_target_group(&actual.target_group_arn, &desired.health_check)
            .await
            .map_err(|e| LbError::cloud("ModifyTargetGroup", &actual.target_group_arn, e))?;
        record_resource_updated(RESOURCE_TARGET_GROUP);
        Ok(modified)
    }

    async fn find_existing(
        &self,
        cancel: &CancellationToken,
        desired: &TargetGroupInput,
    ) -> Result<Option<SdkTargetGroup>> {
        let filters = desired
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();

        ensure_active(cancel, "GetResources")?;
        let mut arns = self
            .ctx
            .cloud
            .get_resources_by_filters(&filters, ResourceType::TargetGroup)
            .await
            .map_err(|e| LbError::cloud("GetResources", &desired.name, e))?;
        if arns.is_empty() {
            return Ok(None);
        }
        arns.sort();
        if arns.len() > 1 {
            warn!(
                "Found {} target groups tagged for {}, using {}",
                arns.len(),
                desired.name,
                arns[0]
            );
            arns.truncate(1);
        }

        ensure_active(cancel, "DescribeTargetGroups")?;
        let found = self
            .ctx
            .cloud
            .describe_target_groups(&arns)
            .await
            .map_err(|e| LbError::cloud("DescribeTargetGroups", &arns[0], e))?;
        Ok(found.into_iter().next())
    }

    /// Desired target group for `backend`, combining service and ingress
    /// annotations with engine defaults.
    fn build_desired(&self, workload: &WorkloadKey, backend: &Backend) -> Result<TargetGroupInput> {
        let service_key = WorkloadKey::new(&workload.namespace, &backend.service_name);
        let ingress_annos = self.ctx.store.get_ingress_annotations(workload)?;
        let service_annos = self
            .ctx
            .store
            .get_service_annotations(&service_key, Some(&ingress_annos))?;
        let service = self.ctx.store.get_service(&service_key)?;

        let config = &self.ctx.config;
        let attrs = service_annos.target_group;
        let target_type = attrs.target_type.unwrap_or(config.default_target_type);
        let protocol = attrs
            .backend_protocol
            .unwrap_or(config.default_backend_protocol);
        let port = resolve_target_port(&service, &backend.service_port, target_type)?;

        let health_check = HealthCheckConfig {
            path: attrs
                .healthcheck_path
                .unwrap_or_else(|| DEFAULT_HEALTHCHECK_PATH.to_string()),
            port: attrs
                .healthcheck_port
                .unwrap_or_else(|| DEFAULT_HEALTHCHECK_PORT.to_string()),
            protocol: attrs.healthcheck_protocol.unwrap_or(protocol),
            interval_seconds: attrs
                .healthcheck_interval_seconds
                .unwrap_or(DEFAULT_HEALTHCHECK_INTERVAL_SECONDS),
            timeout_seconds: attrs
                .healthcheck_timeout_seconds
                .unwrap_or(DEFAULT_HEALTHCHECK_TIMEOUT_SECONDS),
            healthy_threshold_count: attrs
                .healthy_threshold_count
                .unwrap_or(DEFAULT_HEALTHY_THRESHOLD_COUNT),
            unhealthy_threshold_count: attrs
                .unhealthy_threshold_count
                .unwrap_or(DEFAULT_UNHEALTHY_THRESHOLD_COUNT),
            success_codes: attrs
                .success_codes
                .unwrap_or_else(|| DEFAULT_SUCCESS_CODES.to_string()),
        };

        let name_tag_gen = &self.ctx.name_tag_gen;
        Ok(TargetGroupInput {
            name: name_tag_gen.name_tg(workload, backend, target_type, protocol.as_str()),
            protocol,
            port,
            target_type,
            health_check,
            tags: name_tag_gen.tags_for(workload, backend),
        })
    }
}

/// Names of attributes that differ and cannot be changed in place.
#[must_use]
pub fn immutable_drift(desired: &TargetGroupInput, actual: &SdkTargetGroup) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if desired.protocol != actual.protocol {
        fields.push("protocol");
    }
    if desired.port != actual.port {
        fields.push("port");
    }
    if desired.target_type != actual.target_type {
        fields.push("targetType");
    }
    fields
}

/// Port registered targets listen on.
///
/// Instance targets receive traffic on the service's node port. IP targets
/// receive it on the pod port: the numeric target port when set, otherwise
/// the service port itself.
fn resolve_target_port(
    service: &Service,
    port_ref: &ServicePortRef,
    target_type: TargetType,
) -> Result<i64> {
    let service_name = service.metadata.name.as_deref().unwrap_or_default();
    let ports: &[ServicePort] = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_deref())
        .unwrap_or_default();

    let port = ports
        .iter()
        .find(|p| match port_ref {
            ServicePortRef::Number(n) => p.port == *n,
            ServicePortRef::Name(name) => p.name.as_deref() == Some(name.as_str()),
        })
        .ok_or_else(|| {
            LbError::Config(format!(
                "unable to find port {port_ref} on service {service_name}"
            ))
        })?;

    match target_type {
        TargetType::Instance => port.node_port.map(i64::from).ok_or_else(|| {
            LbError::Config(format!(
                "service {service_name} port {port_ref} has no nodePort, which targetType instance requires"
            ))
        }),
        TargetType::Ip => Ok(match &port.target_port {
            Some(IntOrString::Int(n)) => i64::from(*n),
            _ => i64::from(port.port),
        }),
    }
}
