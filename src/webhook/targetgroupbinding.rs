// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Admission validation for `TargetGroupBinding`.
//!
//! Enforced invariants:
//! - `spec.targetGroupARN` and `spec.targetType` are required
//! - both fields are immutable after creation
//! - a node selector is only allowed with `targetType: instance`
//! - at most one binding references a given target group ARN
//!
//! The uniqueness check reads the current bindings and then decides. Two
//! concurrent creates for the same ARN can both pass it.

use crate::crd::{TargetGroupBinding, TargetType};
use crate::errors::{LbError, Result};
use async_trait::async_trait;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use tracing::debug;

const KIND: &str = "TargetGroupBinding";
const BINDINGS_RESOURCE: &str = "targetgroupbindings.elbv2.lbsync.io";

/// Lists every binding in the cluster.
#[async_trait]
pub trait BindingLister: Send + Sync {
    async fn list_bindings(&self) -> anyhow::Result<Vec<TargetGroupBinding>>;
}

#[async_trait]
impl BindingLister for Client {
    async fn list_bindings(&self) -> anyhow::Result<Vec<TargetGroupBinding>> {
        let api: Api<TargetGroupBinding> = Api::all(self.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

/// Validates `TargetGroupBinding` create, update and delete requests.
#[derive(Clone)]
pub struct TargetGroupBindingValidator {
    lister: Arc<dyn BindingLister>,
}

impl TargetGroupBindingValidator {
    #[must_use]
    pub fn new(lister: Arc<dyn BindingLister>) -> Self {
        Self { lister }
    }

    /// # Errors
    ///
    /// Returns `LbError::Validation` with the message shown to the client, or
    /// `LbError::Store` if the existing bindings cannot be listed.
    pub async fn validate_create(&self, tgb: &TargetGroupBinding) -> Result<()> {
        check_required_fields(tgb)?;
        check_node_selector(tgb)?;
        self.check_existing_target_groups(tgb).await
    }

    /// # Errors
    ///
    /// Returns `LbError::Validation` with the message shown to the client.
    pub fn validate_update(&self, tgb: &TargetGroupBinding, old: &TargetGroupBinding) -> Result<()> {
        check_required_fields(tgb)?;
        check_immutable_fields(tgb, old)?;
        check_node_selector(tgb)
    }

    /// Deletes are always allowed.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub fn validate_delete(&self, _tgb: &TargetGroupBinding) -> Result<()> {
        Ok(())
    }

    async fn check_existing_target_groups(&self, tgb: &TargetGroupBinding) -> Result<()> {
        let bindings = self
            .lister
            .list_bindings()
            .await
            .map_err(|e| LbError::Store {
                key: BINDINGS_RESOURCE.to_string(),
                reason: e.to_string(),
            })?;
        debug!(
            "Checking {} against {} existing bindings",
            tgb.spec.target_group_arn,
            bindings.len()
        );

        let name = tgb.name_any();
        let namespace = tgb.namespace().unwrap_or_default();
        for existing in &bindings {
            let existing_namespace = existing.namespace().unwrap_or_default();
            if existing.name_any() == name && existing_namespace == namespace {
                continue;
            }
            if existing.spec.target_group_arn == tgb.spec.target_group_arn {
                return Err(LbError::Validation(format!(
                    "TargetGroup {} is already bound to {KIND} {}/{}",
                    tgb.spec.target_group_arn,
                    existing_namespace,
                    existing.name_any()
                )));
            }
        }
        Ok(())
    }
}

fn check_required_fields(tgb: &TargetGroupBinding) -> Result<()> {
    let mut absent = Vec::new();
    if tgb.spec.target_group_arn.is_empty() {
        absent.push("spec.targetGroupARN");
    }
    if tgb.spec.target_type.is_none() {
        absent.push("spec.targetType");
    }
    if absent.is_empty() {
        return Ok(());
    }
    Err(LbError::Validation(format!(
        "{KIND} must specify these fields: {}",
        absent.join(",")
    )))
}

fn check_immutable_fields(tgb: &TargetGroupBinding, old: &TargetGroupBinding) -> Result<()> {
    let mut changed = Vec::new();
    if tgb.spec.target_group_arn != old.spec.target_group_arn {
        changed.push("spec.targetGroupARN");
    }
    if tgb.spec.target_type != old.spec.target_type {
        changed.push("spec.targetType");
    }
    if changed.is_empty() {
        return Ok(());
    }
    Err(LbError::Validation(format!(
        "{KIND} update may not change these fields: {}",
        changed.join(",")
    )))
}

fn check_node_selector(tgb: &TargetGroupBinding) -> Result<()> {
    if tgb.spec.target_type == Some(TargetType::Ip) && tgb.spec.node_selector.is_some() {
        return Err(LbError::Validation(format!(
            "{KIND} cannot set NodeSelector when TargetType is ip"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "targetgroupbinding_tests.rs"]
mod targetgroupbinding_tests;
