// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Abstract cloud load-balancing API consumed by the reconcilers.
//!
//! The engine never talks to a provider SDK directly. Everything goes through
//! the [`CloudApi`] trait, which exposes the create/modify/delete/list/describe
//! and tag-search operations the reconcilers need. Credential handling,
//! transport retries and throttling belong to the implementation.
//!
//! # Architecture
//!
//! ```text
//! TargetGroup / Listener reconcilers
//!              │
//!              ▼
//!       Arc<dyn CloudApi>  ──►  provider SDK client (out of tree)
//! ```

pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use types::{
    Action, Certificate, HealthCheckConfig, ListenerCertificate, ListenerInput, Protocol,
    ResourceType, SdkListener, SdkTargetGroup, TagFilters, TargetGroupInput, TargetGroupTuple,
};

use crate::errors::CloudError;

/// Result type returned by every cloud call.
pub type CloudResult<T> = std::result::Result<T, CloudError>;

/// Cloud load-balancing operations used by the engine.
///
/// ARNs are opaque strings, ports are 64-bit integers and protocols are the
/// enumerated [`Protocol`] values. All calls may block for a network round trip.
#[async_trait::async_trait]
pub trait CloudApi: Send + Sync {
    // ===== Listeners =====

    /// Create a listener on a load balancer and return the realized record.
    async fn create_listener(&self, lb_arn: &str, input: &ListenerInput)
        -> CloudResult<SdkListener>;

    /// Replace a listener's configuration and return the updated record.
    async fn modify_listener(
        &self,
        listener_arn: &str,
        input: &ListenerInput,
    ) -> CloudResult<SdkListener>;

    /// Delete a listener by ARN.
    async fn delete_listeners_by_arn(&self, listener_arn: &str) -> CloudResult<()>;

    /// List every listener on a load balancer, following pagination.
    async fn list_listeners_by_load_balancer(&self, lb_arn: &str) -> CloudResult<Vec<SdkListener>>;

    /// Describe the listeners of a load balancer as a flat list.
    ///
    /// Providers without a separate paginated describe call can rely on the
    /// default, which delegates to [`CloudApi::list_listeners_by_load_balancer`].
    async fn describe_listeners_as_list(&self, lb_arn: &str) -> CloudResult<Vec<SdkListener>> {
        self.list_listeners_by_load_balancer(lb_arn).await
    }

    /// Describe every certificate attached to a listener, including the default one.
    async fn describe_listener_certificates(
        &self,
        listener_arn: &str,
    ) -> CloudResult<Vec<ListenerCertificate>>;

    /// Attach extra certificates to a listener.
    async fn add_listener_certificates(
        &self,
        listener_arn: &str,
        certificates: &[Certificate],
    ) -> CloudResult<()>;

    /// Detach extra certificates from a listener.
    async fn remove_listener_certificates(
        &self,
        listener_arn: &str,
        certificates: &[Certificate],
    ) -> CloudResult<()>;

    // ===== Tagging =====

    /// Return the ARNs of all resources of `resource_type` matching every tag filter.
    async fn get_resources_by_filters(
        &self,
        tag_filters: &TagFilters,
        resource_type: ResourceType,
    ) -> CloudResult<Vec<String>>;

    // ===== Target groups =====

    /// Create a target group (with its tags) and return the realized record.
    async fn create_target_group(&self, input: &TargetGroupInput) -> CloudResult<SdkTargetGroup>;

    /// Update the mutable health check attributes of a target group.
    async fn modify_target_group(
        &self,
        target_group_arn: &str,
        health_check: &HealthCheckConfig,
    ) -> CloudResult<SdkTargetGroup>;

    /// Describe target groups by ARN. Unknown ARNs are omitted from the result.
    async fn describe_target_groups(&self, arns: &[String]) -> CloudResult<Vec<SdkTargetGroup>>;

    /// Delete a target group by ARN.
    async fn delete_target_group_by_arn(&self, target_group_arn: &str) -> CloudResult<()>;
}
