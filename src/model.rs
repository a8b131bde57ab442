// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-state types shared by the reconcilers.
//!
//! - [`Backend`] - a `(service, port)` traffic destination, used as a map key
//! - [`BackendRef`] - a backend as written in a workload, which may defer to an
//!   `actions.<name>` annotation instead of naming a real service port
//! - [`TargetGroup`] / [`TargetGroupGroup`] - the realized target groups of one workload
//! - [`WorkloadKey`] - `namespace/name` of a workload object

use crate::crd::TargetType;
use crate::tags::OwnershipSelector;
use k8s_openapi::api::networking::v1::IngressBackend;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;

/// A service port referenced by number or by name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServicePortRef {
    Number(i32),
    Name(String),
}

impl fmt::Display for ServicePortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl ServicePortRef {
    /// Parse a port reference: numeric strings become numbers, anything else a name.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value
            .parse::<i32>()
            .map_or_else(|_| Self::Name(value.to_string()), Self::Number)
    }
}

/// A traffic destination inside a workload definition. Equality is by value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Backend {
    pub service_name: String,
    pub service_port: ServicePortRef,
}

impl Backend {
    #[must_use]
    pub fn new(service_name: impl Into<String>, service_port: ServicePortRef) -> Self {
        Self {
            service_name: service_name.into(),
            service_port,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service_name, self.service_port)
    }
}

/// Where a backend's destination comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendSource {
    /// A real service port
    LiteralPort(ServicePortRef),
    /// Resolved through the `actions.<serviceName>` annotation
    AnnotationForward,
}

/// A backend as declared by a workload path, default backend, or service port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendRef {
    pub service_name: String,
    pub source: BackendSource,
}

impl BackendRef {
    /// The concrete backend, or `None` for annotation-resolved references.
    #[must_use]
    pub fn literal(&self) -> Option<Backend> {
        match &self.source {
            BackendSource::LiteralPort(port) => {
                Some(Backend::new(self.service_name.clone(), port.clone()))
            }
            BackendSource::AnnotationForward => None,
        }
    }

    /// Convert a `networking.k8s.io/v1` ingress backend.
    ///
    /// Resource backends and service backends without a port carry no
    /// destination the engine can realize and yield `None`.
    #[must_use]
    pub fn from_ingress_backend(backend: &IngressBackend) -> Option<Self> {
        let service = backend.service.as_ref()?;
        let port = service.port.as_ref()?;
        let source = match (&port.name, port.number) {
            (Some(name), _) if name == crate::constants::USE_ANNOTATION_PORT => {
                BackendSource::AnnotationForward
            }
            (Some(name), _) if !name.is_empty() => {
                BackendSource::LiteralPort(ServicePortRef::Name(name.clone()))
            }
            (_, Some(number)) => BackendSource::LiteralPort(ServicePortRef::Number(number)),
            _ => return None,
        };
        Some(Self {
            service_name: service.name.clone(),
            source,
        })
    }
}

/// `namespace/name` key of a workload object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a Kubernetes object.
    #[must_use]
    pub fn of<K: Resource + ResourceExt>(obj: &K) -> Self {
        Self::new(obj.namespace().unwrap_or_default(), obj.name_any())
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A realized target group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetGroup {
    pub arn: String,
    pub name: String,
    pub target_type: TargetType,
}

/// The realized target groups of one workload, keyed by backend.
///
/// Built fresh on every reconcile pass and never persisted. The ownership
/// selector is fixed at construction and scopes garbage collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetGroupGroup {
    tg_by_backend: BTreeMap<Backend, TargetGroup>,
    selector: OwnershipSelector,
}

impl TargetGroupGroup {
    #[must_use]
    pub fn new(tg_by_backend: BTreeMap<Backend, TargetGroup>, selector: OwnershipSelector) -> Self {
        Self {
            tg_by_backend,
            selector,
        }
    }

    /// A group with no live backends; garbage collecting it tears everything down.
    #[must_use]
    pub fn empty(selector: OwnershipSelector) -> Self {
        Self::new(BTreeMap::new(), selector)
    }

    #[must_use]
    pub fn tg_by_backend(&self) -> &BTreeMap<Backend, TargetGroup> {
        &self.tg_by_backend
    }

    #[must_use]
    pub fn selector(&self) -> &OwnershipSelector {
        &self.selector
    }

    #[must_use]
    pub fn find(&self, backend: &Backend) -> Option<&TargetGroup> {
        self.tg_by_backend.get(backend)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tg_by_backend.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tg_by_backend.is_empty()
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod model_tests;
