// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Workload fixtures shared by reconciler tests.

use crate::cloud::fake::FakeCloud;
use crate::context::{Context, EngineConfig};
use crate::store::testing::store_with;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const NAMESPACE: &str = "default";
pub const CLUSTER: &str = "test-cluster";

/// `lbsync.io/<key>` annotations.
pub fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (format!("lbsync.io/{k}"), (*v).to_string()))
        .collect()
}

/// Ingress backend by service name and port; numeric ports become port numbers.
pub fn backend(service: &str, port: &str) -> IngressBackend {
    let port = match port.parse::<i32>() {
        Ok(number) => ServiceBackendPort {
            number: Some(number),
            name: None,
        },
        Err(_) => ServiceBackendPort {
            number: None,
            name: Some(port.to_string()),
        },
    };
    IngressBackend {
        service: Some(IngressServiceBackend {
            name: service.to_string(),
            port: Some(port),
        }),
        resource: None,
    }
}

pub fn ingress(
    name: &str,
    pairs: &[(&str, &str)],
    default_backend: Option<IngressBackend>,
    paths: Vec<IngressBackend>,
) -> Ingress {
    let rules = if paths.is_empty() {
        None
    } else {
        Some(vec![IngressRule {
            host: Some("example.com".to_string()),
            http: Some(HTTPIngressRuleValue {
                paths: paths
                    .into_iter()
                    .enumerate()
                    .map(|(i, backend)| HTTPIngressPath {
                        path: Some(format!("/p{i}")),
                        path_type: "Prefix".to_string(),
                        backend,
                    })
                    .collect(),
            }),
        }])
    };
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            annotations: Some(annotations(pairs)),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            default_backend,
            rules,
            ..Default::default()
        }),
        status: None,
    }
}

/// Service with `(name, port, nodePort, targetPort)` ports.
pub fn service(
    name: &str,
    pairs: &[(&str, &str)],
    ports: &[(Option<&str>, i32, Option<i32>, Option<i32>)],
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            annotations: Some(annotations(pairs)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(
                ports
                    .iter()
                    .map(|(port_name, port, node_port, target_port)| ServicePort {
                        name: port_name.map(str::to_string),
                        port: *port,
                        node_port: *node_port,
                        target_port: target_port.map(IntOrString::Int),
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: None,
    }
}

/// Context over a fake cloud and a store holding `ingresses` and `services`.
pub fn context(
    cloud: &Arc<FakeCloud>,
    ingresses: &[Ingress],
    services: &[Service],
) -> Arc<Context> {
    Arc::new(Context::new(
        cloud.clone(),
        Arc::new(store_with(ingresses, services)),
        EngineConfig::for_cluster(CLUSTER),
    ))
}
