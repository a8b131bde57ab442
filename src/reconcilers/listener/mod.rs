// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Listener reconciliation for a single load balancer port.
//!
//! [`ListenerReconciler`] turns one [`PortData`] of a service into a complete
//! [`ListenerConfig`], then creates the listener or modifies the existing one
//! with the full configuration when any field differs. TLS listeners also get
//! their extra certificate set converged after the create/modify step.
//!
//! Default actions are one entry per service port. Each port resolves to a
//! forward to the target group of `(service, port)`, unless the port name
//! matches an `actions.<name>` annotation, in which case that action is used.

pub mod group;
pub mod synthesizer;

use crate::annotations::{literal_tuple, PortData, ServiceAnnotations};
use crate::cancel::ensure_active;
use crate::cloud::{Action, Certificate, CloudApi, ListenerInput, Protocol, SdkListener, TargetGroupTuple};
use crate::context::Context;
use crate::errors::{LbError, Result};
use crate::metrics::{
    record_resource_created, record_resource_deleted, record_resource_updated,
    RESOURCE_LISTENER, RESOURCE_LISTENER_CERTIFICATE,
};
use crate::model::{Backend, BackendRef, BackendSource, ServicePortRef, TargetGroupGroup};
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Error returned when a TLS listener has no certificate annotation.
pub const MISSING_CERTIFICATE_MESSAGE: &str = "certificate ARN must be specified for this listener";

/// Complete desired configuration of one listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerConfig {
    pub port: i64,
    pub protocol: Protocol,
    pub default_actions: Vec<Action>,
    pub ssl_policy: Option<String>,
    /// At most one entry: the default certificate
    pub default_certificates: Vec<Certificate>,
    pub extra_certificate_arns: Vec<String>,
}

impl ListenerConfig {
    /// Fields of `actual` that differ from this configuration.
    ///
    /// Extra certificates are not part of the listener record and are
    /// reconciled separately.
    #[must_use]
    pub fn drift(&self, actual: &SdkListener) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.port != actual.port {
            debug!("listener port needs modification: {} => {}", actual.port, self.port);
            fields.push("port");
        }
        if self.protocol != actual.protocol {
            debug!(
                "listener protocol needs modification: {} => {}",
                actual.protocol, self.protocol
            );
            fields.push("protocol");
        }
        if self.default_certificates != actual.certificates {
            debug!(
                "listener certificates needs modification: {:?} => {:?}",
                actual.certificates, self.default_certificates
            );
            fields.push("certificates");
        }
        if self.ssl_policy != actual.ssl_policy {
            debug!(
                "listener sslPolicy needs modification: {:?} => {:?}",
                actual.ssl_policy, self.ssl_policy
            );
            fields.push("sslPolicy");
        }
        if self.default_actions != actual.default_actions {
            debug!(
                "listener defaultActions needs modification: {:?} => {:?}",
                actual.default_actions, self.default_actions
            );
            fields.push("defaultActions");
        }
        fields
    }

    #[must_use]
    pub fn to_input(&self) -> ListenerInput {
        ListenerInput {
            port: self.port,
            protocol: self.protocol,
            ssl_policy: self.ssl_policy.clone(),
            certificates: self.default_certificates.clone(),
            default_actions: self.default_actions.clone(),
        }
    }

    /// Split a certificate list into the default certificate and the extras.
    #[must_use]
    pub fn with_certificates(mut self, certificate_arns: &[String]) -> Self {
        if let Some((first, rest)) = certificate_arns.split_first() {
            self.default_certificates = vec![Certificate::new(first.clone())];
            self.extra_certificate_arns = rest.to_vec();
        }
        self
    }
}

/// Inputs of one listener reconcile.
pub struct ReconcileOptions<'a> {
    pub lb_arn: &'a str,
    pub service: &'a Service,
    pub service_annos: &'a ServiceAnnotations,
    pub port: &'a PortData,
    pub tg_group: &'a TargetGroupGroup,
    /// Existing listener on this port; `None` creates a new one
    pub instance: Option<SdkListener>,
}

/// Creates or modifies one listener and converges its extra certificates.
#[derive(Clone)]
pub struct ListenerReconciler {
    ctx: Arc<Context>,
}

impl ListenerReconciler {
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Reconcile the listener described by `options` and return the realized record.
    ///
    /// # Errors
    ///
    /// - `LbError::Config` if the configuration cannot be built (missing
    ///   certificate, unresolved backend, unknown action)
    /// - `LbError::CloudApi` if a cloud call fails
    /// - `LbError::Cancelled` if `cancel` fires before a cloud call
    pub async fn reconcile(
        &self,
        cancel: &CancellationToken,
        options: ReconcileOptions<'_>,
    ) -> Result<SdkListener> {
        let config = self.build_listener_config(&options)?;
        let cloud = self.ctx.cloud.as_ref();

        let instance = match options.instance {
            None => create_listener(cloud, cancel, options.lb_arn, &config).await?,
            Some(instance) => modify_listener(cloud, cancel, instance, &config).await?,
        };

        if config.protocol.requires_tls() {
            reconcile_extra_certificates(
                cloud,
                cancel,
                &instance.listener_arn,
                &config.extra_certificate_arns,
            )
            .await?;
        }
        Ok(instance)
    }

    fn build_listener_config(&self, options: &ReconcileOptions<'_>) -> Result<ListenerConfig> {
        let mut config = ListenerConfig {
            port: options.port.port,
            protocol: options.port.scheme,
            default_actions: build_default_actions(
                options.service,
                options.service_annos,
                options.tg_group,
            )?,
            ssl_policy: None,
            default_certificates: Vec::new(),
            extra_certificate_arns: Vec::new(),
        };

        if config.protocol.requires_tls() {
            if options.service_annos.certificate_arns.is_empty() {
                return Err(LbError::Config(MISSING_CERTIFICATE_MESSAGE.to_string()));
            }
            config.ssl_policy = Some(
                options
                    .service_annos
                    .ssl_policy
                    .clone()
                    .unwrap_or_else(|| self.ctx.config.default_ssl_policy.clone()),
            );
            config = config.with_certificates(&options.service_annos.certificate_arns);
        }
        Ok(config)
    }
}

/// Create a listener with `config`.
pub(crate) async fn create_listener(
    cloud: &dyn CloudApi,
    cancel: &CancellationToken,
    lb_arn: &str,
    config: &ListenerConfig,
) -> Result<SdkListener> {
    ensure_active(cancel, "CreateListener")?;
    info!("Creating listener {} on {}", config.port, lb_arn);
    let created = cloud
        .create_listener(lb_arn, &config.to_input())
        .await
        .map_err(|e| LbError::cloud("CreateListener", config.port.to_string(), e))?;
    record_resource_created(RESOURCE_LISTENER);
    Ok(created)
}

/// Modify `instance` with the full `config` when any field differs.
pub(crate) async fn modify_listener(
    cloud: &dyn CloudApi,
    cancel: &CancellationToken,
    instance: SdkListener,
    config: &ListenerConfig,
) -> Result<SdkListener> {
    if config.drift(&instance).is_empty() {
        return Ok(instance);
    }
    ensure_active(cancel, "ModifyListener")?;
    info!(
        "Modifying listener {}, arn: {}",
        config.port, instance.listener_arn
    );
    let modified = cloud
        .modify_listener(&instance.listener_arn, &config.to_input())
        .await
        .map_err(|e| LbError::cloud("ModifyListener", &instance.listener_arn, e))?;
    record_resource_updated(RESOURCE_LISTENER);
    Ok(modified)
}

/// Delete a listener.
pub(crate) async fn delete_listener(
    cloud: &dyn CloudApi,
    cancel: &CancellationToken,
    instance: &SdkListener,
) -> Result<()> {
    ensure_active(cancel, "DeleteListener")?;
    info!(
        "Deleting listener {}, arn: {}",
        instance.port, instance.listener_arn
    );
    cloud
        .delete_listeners_by_arn(&instance.listener_arn)
        .await
        .map_err(|e| LbError::cloud("DeleteListener", &instance.listener_arn, e))?;
    record_resource_deleted(RESOURCE_LISTENER);
    Ok(())
}

/// Converge the extra (non-default) certificates of a listener to `desired`.
///
/// Additions are issued before removals, each in sorted ARN order, one call
/// per certificate. The first failing call aborts the pass.
///
/// # Errors
///
/// Returns `LbError::CloudApi` on the first failing describe, add or remove call.
pub async fn reconcile_extra_certificates(
    cloud: &dyn CloudApi,
    cancel: &CancellationToken,
    listener_arn: &str,
    desired: &[String],
) -> Result<()> {
    ensure_active(cancel, "DescribeListenerCertificates")?;
    let attached = cloud
        .describe_listener_certificates(listener_arn)
        .await
        .map_err(|e| LbError::cloud("DescribeListenerCertificates", listener_arn, e))?;

    let actual: BTreeSet<&str> = attached
        .iter()
        .filter(|c| !c.is_default)
        .map(|c| c.certificate_arn.as_str())
        .collect();
    let desired: BTreeSet<&str> = desired.iter().map(String::as_str).collect();

    for arn in desired.difference(&actual) {
        ensure_active(cancel, "AddListenerCertificates")?;
        info!("Adding certificate {} to listener {}", arn, listener_arn);
        cloud
            .add_listener_certificates(listener_arn, &[Certificate::new(*arn)])
            .await
            .map_err(|e| LbError::cloud("AddListenerCertificates", listener_arn, e))?;
        record_resource_created(RESOURCE_LISTENER_CERTIFICATE);
    }
    for arn in actual.difference(&desired) {
        ensure_active(cancel, "RemoveListenerCertificates")?;
        info!("Removing certificate {} from listener {}", arn, listener_arn);
        cloud
            .remove_listener_certificates(listener_arn, &[Certificate::new(*arn)])
            .await
            .map_err(|e| LbError::cloud("RemoveListenerCertificates", listener_arn, e))?;
        record_resource_deleted(RESOURCE_LISTENER_CERTIFICATE);
    }
    Ok(())
}

/// One default action per service port, in declaration order.
fn build_default_actions(
    service: &Service,
    annos: &ServiceAnnotations,
    tg_group: &TargetGroupGroup,
) -> Result<Vec<Action>> {
    let service_name = service.name_any();
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .into_iter()
        .flatten();

    let mut actions = Vec::new();
    for port in ports {
        let name = port.name.clone().unwrap_or_default();
        let backend = if !name.is_empty() && annos.actions.contains_key(&name) {
            BackendRef {
                service_name: name,
                source: BackendSource::AnnotationForward,
            }
        } else {
            let port_ref = if name.is_empty() {
                ServicePortRef::Number(port.port)
            } else {
                ServicePortRef::Name(name)
            };
            BackendRef {
                service_name: service_name.clone(),
                source: BackendSource::LiteralPort(port_ref),
            }
        };
        actions.push(build_action(&backend, annos, tg_group)?);
    }
    Ok(actions)
}

/// Resolve one backend reference into a listener action.
pub(crate) fn build_action(
    backend: &BackendRef,
    annos: &ServiceAnnotations,
    tg_group: &TargetGroupGroup,
) -> Result<Action> {
    if let Some(literal) = backend.literal() {
        return resolve_target_group(&literal, tg_group).map(Action::forward_to);
    }

    let action = annos.actions.get(&backend.service_name).ok_or_else(|| {
        LbError::Config(format!(
            "backend with serviceName {} and servicePort use-annotation has no matching action annotation",
            backend.service_name
        ))
    })?;
    if let Some(action) = action.static_action() {
        return Ok(action);
    }

    let mut target_groups = Vec::new();
    for target in action.forward_targets() {
        let tuple = match literal_tuple(target) {
            Some(tuple) => tuple,
            None => {
                let name = target.service_name.clone().unwrap_or_default();
                let port = ServicePortRef::parse(target.service_port.as_deref().unwrap_or_default());
                TargetGroupTuple {
                    target_group_arn: resolve_target_group(&Backend::new(name, port), tg_group)?,
                    weight: target.weight,
                }
            }
        };
        target_groups.push(tuple);
    }
    Ok(Action::Forward { target_groups })
}

fn resolve_target_group(backend: &Backend, tg_group: &TargetGroupGroup) -> Result<String> {
    tg_group
        .find(backend)
        .map(|tg| tg.arn.clone())
        .ok_or_else(|| LbError::Config(format!("unable to find targetGroup for backend {backend}")))
}
