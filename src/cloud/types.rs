// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Records exchanged with the cloud load-balancing API.
//!
//! These are the *actual-state* shapes returned by the provider. Desired-state
//! types live in [`crate::model`] and [`crate::graph`]; the two sides only meet
//! through explicit conversions and the matcher's key functions.

use crate::crd::TargetType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Listener and target group protocols.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Protocol {
    Http,
    Https,
    Tcp,
    Tls,
    Udp,
    TcpUdp,
}

impl Protocol {
    /// Wire representation (e.g., `HTTPS`, `TCP_UDP`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Tcp => "TCP",
            Self::Tls => "TLS",
            Self::Udp => "UDP",
            Self::TcpUdp => "TCP_UDP",
        }
    }

    /// Whether a listener on this protocol terminates TLS and needs certificates.
    #[must_use]
    pub fn requires_tls(self) -> bool {
        matches!(self, Self::Https | Self::Tls)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HTTP" => Ok(Self::Http),
            "HTTPS" => Ok(Self::Https),
            "TCP" => Ok(Self::Tcp),
            "TLS" => Ok(Self::Tls),
            "UDP" => Ok(Self::Udp),
            "TCP_UDP" => Ok(Self::TcpUdp),
            other => Err(format!("unknown protocol {other:?}")),
        }
    }
}

/// Kinds of resources searchable by tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceType {
    TargetGroup,
    LoadBalancer,
}

impl ResourceType {
    /// Resource type filter string understood by the tagging API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TargetGroup => "elasticloadbalancing:targetgroup",
            Self::LoadBalancer => "elasticloadbalancing:loadbalancer",
        }
    }
}

/// Tag filters: every key must be present with one of the listed values.
pub type TagFilters = BTreeMap<String, Vec<String>>;

/// A certificate reference as accepted by listener create/modify calls.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub certificate_arn: String,
}

impl Certificate {
    #[must_use]
    pub fn new(arn: impl Into<String>) -> Self {
        Self {
            certificate_arn: arn.into(),
        }
    }
}

/// A certificate attached to a listener, as reported by `DescribeListenerCertificates`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListenerCertificate {
    pub certificate_arn: String,
    pub is_default: bool,
}

/// One weighted target of a forward action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroupTuple {
    pub target_group_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
}

/// A listener default action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Forward to one or more (weighted) target groups
    Forward {
        #[serde(rename = "targetGroups")]
        target_groups: Vec<TargetGroupTuple>,
    },
    /// Answer with a fixed response
    FixedResponse {
        #[serde(rename = "statusCode")]
        status_code: String,
        #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(rename = "messageBody", default, skip_serializing_if = "Option::is_none")]
        message_body: Option<String>,
    },
    /// Redirect the client
    Redirect {
        #[serde(rename = "statusCode")]
        status_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        protocol: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        host: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        port: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}

impl Action {
    /// Forward action to a single target group.
    #[must_use]
    pub fn forward_to(target_group_arn: impl Into<String>) -> Self {
        Self::Forward {
            target_groups: vec![TargetGroupTuple {
                target_group_arn: target_group_arn.into(),
                weight: None,
            }],
        }
    }
}

/// Complete listener configuration sent on create and modify.
///
/// Modify calls always carry the full desired configuration, never a partial patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerInput {
    pub port: i64,
    pub protocol: Protocol,
    pub ssl_policy: Option<String>,
    /// Default certificate only; extra certificates are managed separately
    pub certificates: Vec<Certificate>,
    pub default_actions: Vec<Action>,
}

/// A listener as reported by the cloud API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdkListener {
    pub listener_arn: String,
    pub load_balancer_arn: String,
    pub port: i64,
    pub protocol: Protocol,
    pub ssl_policy: Option<String>,
    /// Default certificate only
    pub certificates: Vec<Certificate>,
    pub default_actions: Vec<Action>,
}

/// Health check parameters of a target group. All fields are mutable in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthCheckConfig {
    pub path: String,
    /// Port number or `traffic-port`
    pub port: String,
    pub protocol: Protocol,
    pub interval_seconds: i64,
    pub timeout_seconds: i64,
    pub healthy_threshold_count: i64,
    pub unhealthy_threshold_count: i64,
    /// HTTP codes counted as healthy (e.g., `200-299`)
    pub success_codes: String,
}

/// Target group configuration sent on create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetGroupInput {
    pub name: String,
    pub protocol: Protocol,
    pub port: i64,
    pub target_type: TargetType,
    pub health_check: HealthCheckConfig,
    pub tags: BTreeMap<String, String>,
}

/// A target group as reported by the cloud API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdkTargetGroup {
    pub target_group_arn: String,
    pub target_group_name: String,
    pub protocol: Protocol,
    pub port: i64,
    pub target_type: TargetType,
    pub health_check: HealthCheckConfig,
    pub tags: BTreeMap<String, String>,
}
