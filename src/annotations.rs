// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Parsed workload annotations read by the reconcilers.
//!
//! Only the fields the engine consumes are modelled here: forward-action
//! definitions, load balancer ports, SSL policy, certificate ARNs and target
//! group attributes. All keys live under [`ANNOTATION_PREFIX`].
//!
//! Service annotations fall back to the owning ingress for target group
//! attributes, so an ingress-wide `target-type` applies to every backend
//! unless a service overrides it.

use crate::cloud::{Action, Protocol, TargetGroupTuple};
use crate::constants::{
    ANNOTATION_ACTIONS_PREFIX, ANNOTATION_BACKEND_PROTOCOL, ANNOTATION_CERTIFICATE_ARN,
    ANNOTATION_HEALTHCHECK_INTERVAL_SECONDS, ANNOTATION_HEALTHCHECK_PATH,
    ANNOTATION_HEALTHCHECK_PORT, ANNOTATION_HEALTHCHECK_PROTOCOL,
    ANNOTATION_HEALTHCHECK_TIMEOUT_SECONDS, ANNOTATION_HEALTHY_THRESHOLD_COUNT,
    ANNOTATION_PREFIX, ANNOTATION_SSL_POLICY, ANNOTATION_SSL_PORTS, ANNOTATION_SUCCESS_CODES,
    ANNOTATION_TARGET_TYPE, ANNOTATION_UNHEALTHY_THRESHOLD_COUNT,
};
use crate::crd::TargetType;
use crate::errors::{LbError, Result};
use k8s_openapi::api::core::v1::Service;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One weighted target of an annotation-defined forward action.
///
/// Either `target_group_arn` or the `service_name`/`service_port` pair is set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ForwardTarget {
    #[serde(default, rename = "targetGroupARN", skip_serializing_if = "Option::is_none")]
    pub target_group_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

/// Forward configuration of an annotation-defined action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForwardConfig {
    #[serde(default)]
    pub target_groups: Vec<ForwardTarget>,
}

/// An action defined through an `actions.<name>` annotation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionConfig {
    Forward {
        #[serde(rename = "forwardConfig", default)]
        forward_config: ForwardConfig,
    },
    FixedResponse {
        #[serde(rename = "fixedResponseConfig")]
        fixed_response_config: FixedResponseConfig,
    },
    Redirect {
        #[serde(rename = "redirectConfig")]
        redirect_config: RedirectConfig,
    },
}

/// Fixed response parameters.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixedResponseConfig {
    pub status_code: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub message_body: Option<String>,
}

/// Redirect parameters.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectConfig {
    pub status_code: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl ActionConfig {
    /// Targets of a forward action; empty for other action types.
    #[must_use]
    pub fn forward_targets(&self) -> &[ForwardTarget] {
        match self {
            Self::Forward { forward_config } => &forward_config.target_groups,
            _ => &[],
        }
    }

    /// Cloud action for non-forward types. Forward actions need target group
    /// resolution and return `None`.
    #[must_use]
    pub fn static_action(&self) -> Option<Action> {
        match self {
            Self::Forward { .. } => None,
            Self::FixedResponse {
                fixed_response_config: c,
            } => Some(Action::FixedResponse {
                status_code: c.status_code.clone(),
                content_type: c.content_type.clone(),
                message_body: c.message_body.clone(),
            }),
            Self::Redirect { redirect_config: c } => Some(Action::Redirect {
                status_code: c.status_code.clone(),
                protocol: c.protocol.clone(),
                host: c.host.clone(),
                port: c.port.clone(),
                path: c.path.clone(),
            }),
        }
    }
}

/// Target group attributes. Unset fields fall back to the ingress, then to defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetGroupAnnotations {
    pub target_type: Option<TargetType>,
    pub backend_protocol: Option<Protocol>,
    pub healthcheck_path: Option<String>,
    pub healthcheck_port: Option<String>,
    pub healthcheck_protocol: Option<Protocol>,
    pub healthcheck_interval_seconds: Option<i64>,
    pub healthcheck_timeout_seconds: Option<i64>,
    pub healthy_threshold_count: Option<i64>,
    pub unhealthy_threshold_count: Option<i64>,
    pub success_codes: Option<String>,
}

impl TargetGroupAnnotations {
    /// Fill unset fields from `fallback`.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            target_type: self.target_type.or(fallback.target_type),
            backend_protocol: self.backend_protocol.or(fallback.backend_protocol),
            healthcheck_path: self
                .healthcheck_path
                .or_else(|| fallback.healthcheck_path.clone()),
            healthcheck_port: self
                .healthcheck_port
                .or_else(|| fallback.healthcheck_port.clone()),
            healthcheck_protocol: self.healthcheck_protocol.or(fallback.healthcheck_protocol),
            healthcheck_interval_seconds: self
                .healthcheck_interval_seconds
                .or(fallback.healthcheck_interval_seconds),
            healthcheck_timeout_seconds: self
                .healthcheck_timeout_seconds
                .or(fallback.healthcheck_timeout_seconds),
            healthy_threshold_count: self
                .healthy_threshold_count
                .or(fallback.healthy_threshold_count),
            unhealthy_threshold_count: self
                .unhealthy_threshold_count
                .or(fallback.unhealthy_threshold_count),
            success_codes: self
                .success_codes
                .or_else(|| fallback.success_codes.clone()),
        }
    }
}

/// Annotations of an ingress.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngressAnnotations {
    /// Actions by name (`actions.<name>`)
    pub actions: BTreeMap<String, ActionConfig>,
    pub target_group: TargetGroupAnnotations,
}

/// A load balancer port derived from a service port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortData {
    pub port: i64,
    /// Listener protocol for this port
    pub scheme: Protocol,
}

/// Load balancer settings of a service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadBalancerAnnotations {
    pub ports: Vec<PortData>,
}

/// Annotations of a service, merged with its ingress where applicable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceAnnotations {
    pub actions: BTreeMap<String, ActionConfig>,
    pub load_balancer: LoadBalancerAnnotations,
    pub ssl_policy: Option<String>,
    pub certificate_arns: Vec<String>,
    pub target_group: TargetGroupAnnotations,
}

/// Parse the annotations of an ingress.
///
/// # Errors
///
/// Returns `LbError::InvalidAnnotation` if an action or attribute value is malformed.
pub fn parse_ingress_annotations(
    annotations: &BTreeMap<String, String>,
) -> Result<IngressAnnotations> {
    Ok(IngressAnnotations {
        actions: parse_actions(annotations)?,
        target_group: parse_target_group(annotations)?,
    })
}

/// Parse the annotations of a service, falling back to `ingress` for target group attributes.
///
/// # Errors
///
/// Returns `LbError::InvalidAnnotation` if a value is malformed, or
/// `LbError::Config` if one port is exposed with protocols a single listener
/// cannot serve.
pub fn parse_service_annotations(
    service: &Service,
    ingress: Option<&IngressAnnotations>,
) -> Result<ServiceAnnotations> {
    let empty = BTreeMap::new();
    let annotations = service.metadata.annotations.as_ref().unwrap_or(&empty);

    let mut actions = parse_actions(annotations)?;
    let mut target_group = parse_target_group(annotations)?;
    if let Some(ingress) = ingress {
        target_group = target_group.or(&ingress.target_group);
        for (name, action) in &ingress.actions {
            actions.entry(name.clone()).or_insert_with(|| action.clone());
        }
    }

    let certificate_arns = lookup(annotations, ANNOTATION_CERTIFICATE_ARN)
        .map(split_list)
        .unwrap_or_default();
    let ssl_policy = lookup(annotations, ANNOTATION_SSL_POLICY).map(str::to_string);
    let ssl_ports = lookup(annotations, ANNOTATION_SSL_PORTS).map(split_list);

    let mut ports: Vec<PortData> = Vec::new();
    let service_ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .into_iter()
        .flatten();
    for p in service_ports {
        let name = p.name.clone().unwrap_or_default();
        let terminates_tls = match &ssl_ports {
            Some(list) => list
                .iter()
                .any(|s| s == "*" || *s == p.port.to_string() || (!name.is_empty() && *s == name)),
            None => !certificate_arns.is_empty(),
        };
        let scheme = if terminates_tls {
            Protocol::Tls
        } else if p.protocol.as_deref() == Some("UDP") {
            Protocol::Udp
        } else {
            Protocol::Tcp
        };
        let port = i64::from(p.port);

        // One listener per load balancer port
        match ports.iter_mut().find(|existing| existing.port == port) {
            None => ports.push(PortData { port, scheme }),
            Some(existing) => existing.scheme = merge_schemes(port, existing.scheme, scheme)?,
        }
    }

    Ok(ServiceAnnotations {
        actions,
        load_balancer: LoadBalancerAnnotations { ports },
        ssl_policy,
        certificate_arns,
        target_group,
    })
}

/// Scheme of a load balancer port exposed by several service ports.
fn merge_schemes(port: i64, current: Protocol, other: Protocol) -> Result<Protocol> {
    match (current, other) {
        (a, b) if a == b => Ok(a),
        (Protocol::Tcp | Protocol::TcpUdp, Protocol::Udp)
        | (Protocol::Udp | Protocol::TcpUdp, Protocol::Tcp) => Ok(Protocol::TcpUdp),
        (a, b) => Err(LbError::Config(format!(
            "service port {port} is declared with incompatible protocols {a} and {b}"
        ))),
    }
}

fn lookup<'a>(annotations: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    annotations
        .get(&format!("{ANNOTATION_PREFIX}{key}"))
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(key: &str, reason: impl ToString) -> LbError {
    LbError::InvalidAnnotation {
        key: format!("{ANNOTATION_PREFIX}{key}"),
        reason: reason.to_string(),
    }
}

fn parse_value<T>(annotations: &BTreeMap<String, String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: ToString,
{
    lookup(annotations, key)
        .map(|v| v.parse::<T>().map_err(|e| invalid(key, e)))
        .transpose()
}

fn parse_actions(annotations: &BTreeMap<String, String>) -> Result<BTreeMap<String, ActionConfig>> {
    let prefix = format!("{ANNOTATION_PREFIX}{ANNOTATION_ACTIONS_PREFIX}");
    let mut actions = BTreeMap::new();
    for (key, value) in annotations {
        let Some(name) = key.strip_prefix(&prefix) else {
            continue;
        };
        let action: ActionConfig = serde_json::from_str(value).map_err(|e| LbError::InvalidAnnotation {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        for target in action.forward_targets() {
            if target.target_group_arn.is_none()
                && (target.service_name.is_none() || target.service_port.is_none())
            {
                return Err(LbError::InvalidAnnotation {
                    key: key.clone(),
                    reason: "forward target needs targetGroupARN or serviceName and servicePort"
                        .to_string(),
                });
            }
        }
        actions.insert(name.to_string(), action);
    }
    Ok(actions)
}

fn parse_target_group(annotations: &BTreeMap<String, String>) -> Result<TargetGroupAnnotations> {
    Ok(TargetGroupAnnotations {
        target_type: parse_value(annotations, ANNOTATION_TARGET_TYPE)?,
        backend_protocol: parse_value(annotations, ANNOTATION_BACKEND_PROTOCOL)?,
        healthcheck_path: lookup(annotations, ANNOTATION_HEALTHCHECK_PATH).map(str::to_string),
        healthcheck_port: lookup(annotations, ANNOTATION_HEALTHCHECK_PORT).map(str::to_string),
        healthcheck_protocol: parse_value(annotations, ANNOTATION_HEALTHCHECK_PROTOCOL)?,
        healthcheck_interval_seconds: parse_value(
            annotations,
            ANNOTATION_HEALTHCHECK_INTERVAL_SECONDS,
        )?,
        healthcheck_timeout_seconds: parse_value(annotations, ANNOTATION_HEALTHCHECK_TIMEOUT_SECONDS)?,
        healthy_threshold_count: parse_value(annotations, ANNOTATION_HEALTHY_THRESHOLD_COUNT)?,
        unhealthy_threshold_count: parse_value(annotations, ANNOTATION_UNHEALTHY_THRESHOLD_COUNT)?,
        success_codes: lookup(annotations, ANNOTATION_SUCCESS_CODES).map(str::to_string),
    })
}

/// Cloud forward tuple for a target that names its target group ARN directly.
#[must_use]
pub fn literal_tuple(target: &ForwardTarget) -> Option<TargetGroupTuple> {
    target.target_group_arn.as_ref().map(|arn| TargetGroupTuple {
        target_group_arn: arn.clone(),
        weight: target.weight,
    })
}

#[cfg(test)]
#[path = "annotations_tests.rs"]
mod annotations_tests;
