// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for load balancer bindings.
//!
//! # Resource Types
//!
//! - [`TargetGroupBinding`] - Binds a pre-existing target group to a Kubernetes `Service`
//!
//! # Example: Creating a Binding
//!
//! ```rust,no_run
//! use lbsync::crd::{ServiceReference, TargetGroupBindingSpec, TargetType};
//! use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
//!
//! let spec = TargetGroupBindingSpec {
//!     target_group_arn: "arn:aws:elasticloadbalancing:us-west-2:123:targetgroup/web/abc".to_string(),
//!     target_type: Some(TargetType::Ip),
//!     node_selector: None,
//!     service_ref: ServiceReference {
//!         name: "web".to_string(),
//!         port: IntOrString::Int(80),
//!     },
//! };
//! ```

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label selector to match Kubernetes resources.
///
/// A label selector is a label query over a set of resources. The result of matchLabels and
/// matchExpressions are `ANDed`. An empty label selector matches all objects.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Map of {key,value} pairs. A single {key,value} in the matchLabels map is equivalent
    /// to an element of matchExpressions, whose key field is "key", the operator is "In",
    /// and the values array contains only "value". All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,

    /// List of label selector requirements. All requirements must be satisfied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_expressions: Option<Vec<LabelSelectorRequirement>>,
}

/// A label selector requirement is a selector that contains values, a key, and an operator
/// that relates the key and values.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct LabelSelectorRequirement {
    /// The label key that the selector applies to.
    pub key: String,

    /// Operator represents a key's relationship to a set of values.
    /// Valid operators are In, `NotIn`, Exists and `DoesNotExist`.
    pub operator: String,

    /// An array of string values. If the operator is In or `NotIn`,
    /// the values array must be non-empty. If the operator is Exists or `DoesNotExist`,
    /// the values array must be empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

/// How targets are registered with a target group.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// Targets are cluster nodes, traffic is sent to the Service's `NodePort`
    Instance,
    /// Targets are pod IPs, traffic is sent to the pod port directly
    Ip,
}

impl TargetType {
    /// Wire representation (`instance` or `ip`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Ip => "ip",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instance" => Ok(Self::Instance),
            "ip" => Ok(Self::Ip),
            other => Err(format!("unknown target type {other:?}, expected instance or ip")),
        }
    }
}

/// Reference to the `Service` whose endpoints are registered into the bound target group.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReference {
    /// Name of the `Service` in the binding's namespace.
    pub name: String,

    /// Port of the `Service` (number or name).
    pub port: IntOrString,
}

/// `TargetGroupBinding` manually associates an existing target group with the
/// operator's management domain.
///
/// At most one binding may reference a given target group ARN cluster-wide, and
/// both `targetGroupARN` and `targetType` are immutable once created. These
/// invariants are enforced by the admission webhook.
///
/// # Example
///
/// ```yaml
/// apiVersion: elbv2.lbsync.io/v1beta1
/// kind: TargetGroupBinding
/// metadata:
///   name: web
///   namespace: default
/// spec:
///   targetGroupARN: arn:aws:elasticloadbalancing:us-west-2:123:targetgroup/web/abc
///   targetType: ip
///   serviceRef:
///     name: web
///     port: 80
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "elbv2.lbsync.io",
    version = "v1beta1",
    kind = "TargetGroupBinding",
    namespaced,
    shortname = "tgb",
    doc = "TargetGroupBinding binds a pre-existing cloud target group to a Kubernetes Service so that the Service endpoints are registered as targets.",
    printcolumn = r#"{"name":"TargetGroupARN","type":"string","jsonPath":".spec.targetGroupARN"}"#,
    printcolumn = r#"{"name":"TargetType","type":"string","jsonPath":".spec.targetType"}"#
)]
#[kube(status = "TargetGroupBindingStatus")]
#[serde(rename_all = "camelCase")]
pub struct TargetGroupBindingSpec {
    /// ARN of the bound target group. Immutable.
    #[serde(rename = "targetGroupARN", default)]
    pub target_group_arn: String,

    /// How targets are registered (`instance` or `ip`). Required and immutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<TargetType>,

    /// Restricts which nodes are registered. Only valid with `targetType: instance`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_selector: Option<LabelSelector>,

    /// The `Service` whose endpoints are registered.
    pub service_ref: ServiceReference,
}

/// Status of a `TargetGroupBinding`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetGroupBindingStatus {
    /// Generation of the spec last processed by the controller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
