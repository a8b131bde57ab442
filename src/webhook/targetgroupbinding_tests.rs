// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `TargetGroupBinding` admission validation

use super::{BindingLister, TargetGroupBindingValidator};
use crate::crd::{LabelSelector, ServiceReference, TargetGroupBinding, TargetGroupBindingSpec, TargetType};
use crate::errors::LbError;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) struct StaticLister(pub Vec<TargetGroupBinding>);

#[async_trait::async_trait]
impl BindingLister for StaticLister {
    async fn list_bindings(&self) -> anyhow::Result<Vec<TargetGroupBinding>> {
        Ok(self.0.clone())
    }
}

struct FailingLister;

#[async_trait::async_trait]
impl BindingLister for FailingLister {
    async fn list_bindings(&self) -> anyhow::Result<Vec<TargetGroupBinding>> {
        anyhow::bail!("connection refused")
    }
}

pub(crate) fn binding(name: &str, arn: &str, target_type: Option<TargetType>) -> TargetGroupBinding {
    let mut tgb = TargetGroupBinding::new(
        name,
        TargetGroupBindingSpec {
            target_group_arn: arn.to_string(),
            target_type,
            node_selector: None,
            service_ref: ServiceReference {
                name: "web".to_string(),
                port: IntOrString::Int(80),
            },
        },
    );
    tgb.metadata.namespace = Some("default".to_string());
    tgb
}

fn node_selector() -> Option<LabelSelector> {
    Some(LabelSelector {
        match_labels: Some(BTreeMap::from([(
            "pool".to_string(),
            "web".to_string(),
        )])),
        match_expressions: None,
    })
}

fn validator(existing: Vec<TargetGroupBinding>) -> TargetGroupBindingValidator {
    TargetGroupBindingValidator::new(Arc::new(StaticLister(existing)))
}

fn message(err: LbError) -> String {
    assert!(matches!(err, LbError::Validation(_)));
    err.to_string()
}

#[tokio::test]
async fn test_create_requires_target_type() {
    let err = validator(vec![])
        .validate_create(&binding("web", "arn:1", None))
        .await
        .unwrap_err();
    assert_eq!(
        message(err),
        "TargetGroupBinding must specify these fields: spec.targetType"
    );
}

#[tokio::test]
async fn test_create_rejects_duplicate_target_group() {
    let existing = binding("first", "arn:1", Some(TargetType::Ip));
    let v = validator(vec![existing]);

    let err = v
        .validate_create(&binding("second", "arn:1", Some(TargetType::Ip)))
        .await
        .unwrap_err();
    assert_eq!(
        message(err),
        "TargetGroup arn:1 is already bound to TargetGroupBinding default/first"
    );

    v.validate_create(&binding("second", "arn:2", Some(TargetType::Ip)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_rejects_node_selector_with_ip_targets() {
    let mut tgb = binding("web", "arn:1", Some(TargetType::Ip));
    tgb.spec.node_selector = node_selector();

    let err = validator(vec![]).validate_create(&tgb).await.unwrap_err();
    assert_eq!(
        message(err),
        "TargetGroupBinding cannot set NodeSelector when TargetType is ip"
    );

    tgb.spec.target_type = Some(TargetType::Instance);
    validator(vec![]).validate_create(&tgb).await.unwrap();
}

#[tokio::test]
async fn test_create_surfaces_list_failure() {
    let v = TargetGroupBindingValidator::new(Arc::new(FailingLister));
    let err = v
        .validate_create(&binding("web", "arn:1", Some(TargetType::Ip)))
        .await
        .unwrap_err();
    assert!(matches!(err, LbError::Store { .. }));
    assert!(err.is_retryable());
    assert_eq!(err.reason(), "StoreError");
    assert_eq!(
        err.to_string(),
        "failed to load targetgroupbindings.elbv2.lbsync.io: connection refused"
    );
}

#[test]
fn test_update_rejects_target_group_change() {
    let old = binding("web", "arn:1", Some(TargetType::Ip));
    let new = binding("web", "arn:2", Some(TargetType::Ip));

    let err = validator(vec![]).validate_update(&new, &old).unwrap_err();
    assert_eq!(
        message(err),
        "TargetGroupBinding update may not change these fields: spec.targetGroupARN"
    );
}

#[test]
fn test_update_rejects_target_type_change() {
    let old = binding("web", "arn:1", Some(TargetType::Ip));
    let new = binding("web", "arn:1", Some(TargetType::Instance));

    let err = validator(vec![]).validate_update(&new, &old).unwrap_err();
    assert_eq!(
        message(err),
        "TargetGroupBinding update may not change these fields: spec.targetType"
    );
}

#[test]
fn test_update_reports_every_changed_field() {
    let old = binding("web", "arn:1", Some(TargetType::Ip));
    let new = binding("web", "arn:2", Some(TargetType::Instance));

    let err = validator(vec![]).validate_update(&new, &old).unwrap_err();
    assert_eq!(
        message(err),
        "TargetGroupBinding update may not change these fields: spec.targetGroupARN,spec.targetType"
    );
}

#[test]
fn test_update_allows_node_selector_removal() {
    let mut old = binding("web", "arn:1", Some(TargetType::Instance));
    old.spec.node_selector = node_selector();
    let new = binding("web", "arn:1", Some(TargetType::Instance));

    validator(vec![]).validate_update(&new, &old).unwrap();
}

#[test]
fn test_update_requires_target_type() {
    let old = binding("web", "arn:1", Some(TargetType::Ip));
    let new = binding("web", "arn:1", None);

    let err = validator(vec![]).validate_update(&new, &old).unwrap_err();
    assert_eq!(
        message(err),
        "TargetGroupBinding must specify these fields: spec.targetType"
    );
}

#[test]
fn test_delete_is_always_allowed() {
    let tgb = binding("web", "", None);
    validator(vec![]).validate_delete(&tgb).unwrap();
}
