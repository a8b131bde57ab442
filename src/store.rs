// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lookup of workload objects and their parsed annotations.
//!
//! The reconcilers read workload configuration through the [`Store`] trait.
//! [`ReflectorStore`] implements it on top of kube-rs reflector caches, so a
//! lookup is an in-memory read with no API call. The informer tasks that feed
//! the caches are owned by the outer controller.

use crate::annotations::{
    parse_ingress_annotations, parse_service_annotations, IngressAnnotations, ServiceAnnotations,
};
use crate::errors::{LbError, Result};
use crate::model::WorkloadKey;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::reflector::{self, ObjectRef};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-object configuration lookup used by the reconcilers.
pub trait Store: Send + Sync {
    /// Parsed annotations of an ingress.
    ///
    /// # Errors
    ///
    /// Returns an error if the ingress is unknown or an annotation is malformed.
    fn get_ingress_annotations(&self, key: &WorkloadKey) -> Result<IngressAnnotations>;

    /// Parsed annotations of a service, with target group attributes falling
    /// back to `ingress` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unknown or an annotation is malformed.
    fn get_service_annotations(
        &self,
        key: &WorkloadKey,
        ingress: Option<&IngressAnnotations>,
    ) -> Result<ServiceAnnotations>;

    /// The service object itself (ports are needed to resolve target group ports).
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unknown.
    fn get_service(&self, key: &WorkloadKey) -> Result<Arc<Service>>;
}

/// [`Store`] backed by reflector caches of ingresses and services.
#[derive(Clone)]
pub struct ReflectorStore {
    ingresses: reflector::Store<Ingress>,
    services: reflector::Store<Service>,
}

impl ReflectorStore {
    #[must_use]
    pub fn new(ingresses: reflector::Store<Ingress>, services: reflector::Store<Service>) -> Self {
        Self {
            ingresses,
            services,
        }
    }

    fn ingress(&self, key: &WorkloadKey) -> Result<Arc<Ingress>> {
        self.ingresses
            .get(&ObjectRef::new(&key.name).within(&key.namespace))
            .ok_or_else(|| LbError::Store {
                key: key.to_string(),
                reason: "ingress not found in cache".to_string(),
            })
    }
}

impl Store for ReflectorStore {
    fn get_ingress_annotations(&self, key: &WorkloadKey) -> Result<IngressAnnotations> {
        let ingress = self.ingress(key)?;
        let empty = BTreeMap::new();
        parse_ingress_annotations(ingress.metadata.annotations.as_ref().unwrap_or(&empty))
    }

    fn get_service_annotations(
        &self,
        key: &WorkloadKey,
        ingress: Option<&IngressAnnotations>,
    ) -> Result<ServiceAnnotations> {
        let service = self.get_service(key)?;
        parse_service_annotations(&service, ingress)
    }

    fn get_service(&self, key: &WorkloadKey) -> Result<Arc<Service>> {
        self.services
            .get(&ObjectRef::new(&key.name).within(&key.namespace))
            .ok_or_else(|| LbError::Store {
                key: key.to_string(),
                reason: "service not found in cache".to_string(),
            })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::store_with;
    use super::Store;
    use crate::errors::LbError;
    use crate::model::WorkloadKey;
    use k8s_openapi::api::core::v1::Service;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_service_is_store_error() {
        let store = store_with(&[], &[]);
        let err = store
            .get_service(&WorkloadKey::new("default", "web"))
            .unwrap_err();
        assert!(matches!(err, LbError::Store { ref key, .. } if key == "default/web"));
    }

    #[test]
    fn test_service_annotations_from_cache() {
        let service = Service {
            metadata: ObjectMeta {
                name: Some("web".to_string()),
                namespace: Some("default".to_string()),
                annotations: Some(BTreeMap::from([(
                    "lbsync.io/ssl-policy".to_string(),
                    "ELBSecurityPolicy-TLS-1-2-2017-01".to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };
        let store = store_with(&[], &[service]);

        let annos = store
            .get_service_annotations(&WorkloadKey::new("default", "web"), None)
            .unwrap();
        assert_eq!(
            annos.ssl_policy.as_deref(),
            Some("ELBSecurityPolicy-TLS-1-2-2017-01")
        );
    }
}
