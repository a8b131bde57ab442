// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the target group group controller

use super::TargetGroupGroupController;
use crate::cloud::fake::FakeCloud;
use crate::errors::LbError;
use crate::model::{Backend, ServicePortRef, WorkloadKey};
use crate::reconcilers::fixtures::{backend, context, ingress, service, NAMESPACE};
use k8s_openapi::api::core::v1::Service;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn services() -> Vec<Service> {
    vec![
        service("web", &[], &[(Some("http"), 80, Some(30080), None)]),
        service("api", &[], &[(Some("http"), 8080, Some(30081), None)]),
        service("blue", &[], &[(None, 80, Some(30082), None)]),
        service("green", &[], &[(None, 80, Some(30083), None)]),
    ]
}

#[tokio::test]
async fn test_two_backends_create_two_then_nothing() {
    let cloud = Arc::new(FakeCloud::new());
    let ing = ingress(
        "shop",
        &[],
        Some(backend("web", "80")),
        vec![backend("api", "8080"), backend("web", "80")],
    );
    let controller = TargetGroupGroupController::new(context(&cloud, &[ing.clone()], &services()));
    let cancel = CancellationToken::new();

    let group = controller.reconcile(&cancel, &ing).await.unwrap();
    controller.gc(&cancel, &group).await.unwrap();

    assert_eq!(group.len(), 2);
    assert_eq!(cloud.mutations_of("CreateTargetGroup").len(), 2);
    assert!(group
        .find(&Backend::new("api", ServicePortRef::Number(8080)))
        .is_some());

    cloud.reset_calls();
    let again = controller.reconcile(&cancel, &ing).await.unwrap();
    controller.gc(&cancel, &again).await.unwrap();

    assert_eq!(again, group);
    assert!(cloud.mutations().is_empty());
}

#[tokio::test]
async fn test_use_annotation_paths_resolve_through_forward_targets() {
    let cloud = Arc::new(FakeCloud::new());
    let ing = ingress(
        "shop",
        &[(
            "actions.blue-green",
            r#"{"type":"forward","forwardConfig":{"targetGroups":[
                {"serviceName":"blue","servicePort":"80","weight":80},
                {"serviceName":"green","servicePort":"80","weight":20},
                {"targetGroupARN":"arn:external/tg","weight":0}]}}"#,
        )],
        None,
        vec![backend("blue-green", "use-annotation")],
    );
    let controller = TargetGroupGroupController::new(context(&cloud, &[ing.clone()], &services()));

    let group = controller
        .reconcile(&CancellationToken::new(), &ing)
        .await
        .unwrap();

    let backends: Vec<String> = group.tg_by_backend().keys().map(ToString::to_string).collect();
    assert_eq!(backends, vec!["blue:80", "green:80"]);
}

#[tokio::test]
async fn test_removed_backend_is_garbage_collected() {
    let cloud = Arc::new(FakeCloud::new());
    let cancel = CancellationToken::new();

    let before = ingress(
        "shop",
        &[],
        None,
        vec![backend("web", "80"), backend("api", "8080")],
    );
    let group = TargetGroupGroupController::new(context(&cloud, &[before.clone()], &services()))
        .reconcile(&cancel, &before)
        .await
        .unwrap();
    let api_arn = group
        .find(&Backend::new("api", ServicePortRef::Number(8080)))
        .unwrap()
        .arn
        .clone();
    cloud.reset_calls();

    let after = ingress("shop", &[], None, vec![backend("web", "80")]);
    let controller = TargetGroupGroupController::new(context(&cloud, &[after.clone()], &services()));
    let group = controller.reconcile(&cancel, &after).await.unwrap();
    controller.gc(&cancel, &group).await.unwrap();

    assert_eq!(cloud.mutations(), vec![format!("DeleteTargetGroup:{api_arn}")]);
    assert_eq!(cloud.target_groups().len(), 1);
}

#[tokio::test]
async fn test_gc_never_touches_other_workloads() {
    let cloud = Arc::new(FakeCloud::new());
    let cancel = CancellationToken::new();
    let shop = ingress("shop", &[], None, vec![backend("web", "80")]);
    let admin = ingress("admin", &[], None, vec![backend("web", "80")]);
    let ctx = context(&cloud, &[shop.clone(), admin.clone()], &services());
    let controller = TargetGroupGroupController::new(ctx);

    let shop_group = controller.reconcile(&cancel, &shop).await.unwrap();
    let admin_group = controller.reconcile(&cancel, &admin).await.unwrap();
    assert_eq!(cloud.target_groups().len(), 2);
    cloud.reset_calls();

    controller
        .delete(&cancel, &WorkloadKey::new(NAMESPACE, "admin"))
        .await
        .unwrap();
    controller.gc(&cancel, &shop_group).await.unwrap();

    let remaining: Vec<String> = cloud
        .target_groups()
        .into_iter()
        .map(|tg| tg.target_group_arn)
        .collect();
    let admin_arn = &admin_group.tg_by_backend().values().next().unwrap().arn;
    let shop_arn = &shop_group.tg_by_backend().values().next().unwrap().arn;
    assert_eq!(remaining, vec![shop_arn.clone()]);
    assert_eq!(cloud.mutations(), vec![format!("DeleteTargetGroup:{admin_arn}")]);
}

#[tokio::test]
async fn test_first_failure_stops_the_pass() {
    let cloud = Arc::new(FakeCloud::new());
    cloud.fail_on("CreateTargetGroup");
    let ing = ingress(
        "shop",
        &[],
        None,
        vec![backend("web", "80"), backend("api", "8080")],
    );
    let controller = TargetGroupGroupController::new(context(&cloud, &[ing.clone()], &services()));

    let err = controller
        .reconcile(&CancellationToken::new(), &ing)
        .await
        .unwrap_err();

    assert!(matches!(err, LbError::CloudApi { ref operation, .. } if operation == "CreateTargetGroup"));
    // Only the first backend was looked up.
    assert_eq!(
        cloud
            .lookups()
            .iter()
            .filter(|l| l.starts_with("GetResources"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_gc_search_failure_names_the_workload_selector() {
    let cloud = Arc::new(FakeCloud::new());
    cloud.fail_on("GetResources");
    let controller = TargetGroupGroupController::new(context(&cloud, &[], &services()));

    let err = controller
        .delete(&CancellationToken::new(), &WorkloadKey::new(NAMESPACE, "shop"))
        .await
        .unwrap_err();

    match err {
        LbError::CloudApi {
            operation, resource, ..
        } => {
            assert_eq!(operation, "GetResources");
            assert!(resource.contains("kubernetes.io/ingress-name=shop"));
            assert!(resource.contains(&format!("kubernetes.io/namespace={NAMESPACE}")));
        }
        other => panic!("expected CloudApi error, got {other:?}"),
    }
    assert!(cloud.mutations().is_empty());
}
