// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the load balancer reconciliation engine.
//!
//! This module provides the error taxonomy shared by every reconciler:
//! - Admission-time validation failures (user facing, never touch cloud state)
//! - Wrapped cloud API failures tagged with the operation and resource key
//! - Unresolved upstream dependencies (retry later, not a real failure)
//! - Drift on attributes that the cloud layer cannot change in place
//!
//! Every error maps to a stable CamelCase reason string through
//! [`LbError::reason`], which is used for metrics labels and log fields.

use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, LbError>;

/// Structured failure returned by a [`CloudApi`](crate::cloud::CloudApi) implementation.
///
/// Transport-level retries and throttling are handled below this layer, so a
/// `CloudError` always represents a final answer for the call that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct CloudError {
    /// Provider error code (e.g., `TargetGroupNotFound`, `Throttling`)
    pub code: String,
    /// Human-readable message returned by the provider
    pub message: String,
}

impl CloudError {
    /// Create a new cloud error from a code and message.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by the reconciliation engine and the admission validator.
#[derive(Error, Debug)]
pub enum LbError {
    /// Admission-time invariant violation.
    ///
    /// The message is returned verbatim to the admission client.
    #[error("{0}")]
    Validation(String),

    /// A cloud API call failed.
    ///
    /// Always tagged with the operation name and the target resource (ARN or
    /// port) so the outer control loop can log and requeue with context.
    #[error("{operation} failed for {resource}: {source}")]
    CloudApi {
        /// Cloud operation name (e.g., `CreateListener`)
        operation: String,
        /// Resource key the operation targeted
        resource: String,
        /// Underlying provider error
        #[source]
        source: CloudError,
    },

    /// A referenced upstream resource has not been realized yet.
    #[error("dependency {resource} is not resolved yet")]
    DependencyUnresolved {
        /// Identifier of the unresolved resource
        resource: String,
    },

    /// An attribute that is immutable at the cloud layer differs between desired and actual.
    ///
    /// Cannot be resolved by a modify call; requires out-of-band remediation.
    #[error("{resource} has drifted on immutable fields: {}", fields.join(","))]
    DriftConflict {
        /// Resource key (ARN)
        resource: String,
        /// Names of the immutable fields that differ
        fields: Vec<String>,
    },

    /// The caller-supplied cancellation token fired before the operation ran.
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was about to run
        operation: String,
    },

    /// A workload object or its configuration could not be read from the store.
    #[error("failed to load {key}: {reason}")]
    Store {
        /// Object key (`namespace/name`)
        key: String,
        /// Reason for the failure
        reason: String,
    },

    /// An annotation value could not be parsed.
    #[error("invalid annotation {key}: {reason}")]
    InvalidAnnotation {
        /// Fully qualified annotation key
        key: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Desired configuration cannot be built from the workload definition.
    #[error("{0}")]
    Config(String),
}

impl LbError {
    /// Wrap a cloud failure with the operation name and resource key.
    #[must_use]
    pub fn cloud(operation: &str, resource: impl Into<String>, source: CloudError) -> Self {
        Self::CloudApi {
            operation: operation.to_string(),
            resource: resource.into(),
            source,
        }
    }

    /// Stable reason string for metrics labels and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationFailed",
            Self::CloudApi { .. } => "CloudApiError",
            Self::DependencyUnresolved { .. } => "DependencyUnresolved",
            Self::DriftConflict { .. } => "DriftConflict",
            Self::Cancelled { .. } => "Cancelled",
            Self::Store { .. } => "StoreError",
            Self::InvalidAnnotation { .. } => "InvalidAnnotation",
            Self::Config(_) => "InvalidConfiguration",
        }
    }

    /// Whether requeueing the same pass later can succeed without user action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CloudApi { .. }
                | Self::DependencyUnresolved { .. }
                | Self::Cancelled { .. }
                | Self::Store { .. }
        )
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
