// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the listener group controller

use super::ListenerGroupController;
use crate::cloud::fake::FakeCloud;
use crate::cloud::{Action, ListenerInput, Protocol};
use crate::crd::TargetType;
use crate::errors::LbError;
use crate::model::{Backend, ServicePortRef, TargetGroup, TargetGroupGroup, WorkloadKey};
use crate::reconcilers::fixtures::{context, service, CLUSTER, NAMESPACE};
use crate::tags::NameTagGenerator;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LB_ARN: &str = "arn:fake:loadbalancer/net/web/1";

fn tg_group() -> TargetGroupGroup {
    let tg_by_backend = [80, 8080]
        .into_iter()
        .map(|port| {
            (
                Backend::new("web", ServicePortRef::Number(port)),
                TargetGroup {
                    arn: format!("arn:tg/web-{port}"),
                    name: format!("tg-web-{port}"),
                    target_type: TargetType::Instance,
                },
            )
        })
        .collect::<BTreeMap<_, _>>();
    let selector = NameTagGenerator::new(CLUSTER).tag_tg_group(&WorkloadKey::new(NAMESPACE, "web"));
    TargetGroupGroup::new(tg_by_backend, selector)
}

fn seed(cloud: &FakeCloud, port: i64) {
    cloud.seed_listener(
        LB_ARN,
        &ListenerInput {
            port,
            protocol: Protocol::Tcp,
            ssl_policy: None,
            certificates: vec![],
            default_actions: vec![Action::forward_to("arn:tg/stale")],
        },
    );
}

#[tokio::test]
async fn test_converges_ports_then_deletes_unused() {
    let cloud = Arc::new(FakeCloud::new());
    seed(&cloud, 80);
    seed(&cloud, 9000);
    let svc = service(
        "web",
        &[],
        &[(None, 80, Some(30080), None), (None, 8080, Some(30081), None)],
    );
    let controller = ListenerGroupController::new(context(&cloud, &[], &[svc.clone()]));
    let cancel = CancellationToken::new();

    controller
        .reconcile(&cancel, LB_ARN, &svc, &tg_group())
        .await
        .unwrap();

    assert_eq!(
        cloud.mutations(),
        vec!["ModifyListener:80", "CreateListener:8080", "DeleteListener:9000"]
    );
    let mut ports: Vec<i64> = cloud.listeners().iter().map(|l| l.port).collect();
    ports.sort_unstable();
    assert_eq!(ports, vec![80, 8080]);

    cloud.reset_calls();
    controller
        .reconcile(&cancel, LB_ARN, &svc, &tg_group())
        .await
        .unwrap();
    assert!(cloud.mutations().is_empty());
}

#[tokio::test]
async fn test_delete_removes_every_listener() {
    let cloud = Arc::new(FakeCloud::new());
    seed(&cloud, 80);
    seed(&cloud, 443);
    let controller = ListenerGroupController::new(context(&cloud, &[], &[]));

    controller
        .delete(&CancellationToken::new(), LB_ARN)
        .await
        .unwrap();

    assert_eq!(cloud.mutations(), vec!["DeleteListener:80", "DeleteListener:443"]);
    assert!(cloud.listeners().is_empty());
}

#[tokio::test]
async fn test_failed_listener_stops_before_deletes() {
    let cloud = Arc::new(FakeCloud::new());
    seed(&cloud, 9000);
    cloud.fail_on("CreateListener");
    let svc = service("web", &[], &[(None, 80, Some(30080), None)]);
    let controller = ListenerGroupController::new(context(&cloud, &[], &[svc.clone()]));

    let err = controller
        .reconcile(&CancellationToken::new(), LB_ARN, &svc, &tg_group())
        .await
        .unwrap_err();

    assert!(matches!(err, LbError::CloudApi { ref operation, .. } if operation == "CreateListener"));
    assert!(cloud.mutations().is_empty());
    assert_eq!(cloud.listeners().len(), 1);
}

#[tokio::test]
async fn test_port_shared_by_tcp_and_udp_gets_one_listener() {
    let cloud = Arc::new(FakeCloud::new());
    let mut svc = service(
        "web",
        &[],
        &[(None, 80, Some(30080), None), (None, 80, Some(30080), None)],
    );
    if let Some(ports) = svc.spec.as_mut().and_then(|spec| spec.ports.as_mut()) {
        ports[1].protocol = Some("UDP".to_string());
    }
    let controller = ListenerGroupController::new(context(&cloud, &[], &[svc.clone()]));
    let cancel = CancellationToken::new();

    controller
        .reconcile(&cancel, LB_ARN, &svc, &tg_group())
        .await
        .unwrap();

    assert_eq!(cloud.mutations(), vec!["CreateListener:80"]);
    let listeners = cloud.listeners();
    assert_eq!(listeners.len(), 1);
    assert_eq!(listeners[0].protocol, Protocol::TcpUdp);

    cloud.reset_calls();
    controller
        .reconcile(&cancel, LB_ARN, &svc, &tg_group())
        .await
        .unwrap();
    assert!(cloud.mutations().is_empty());
    assert_eq!(cloud.listeners().len(), 1);
}
