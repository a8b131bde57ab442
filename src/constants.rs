// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the lbsync engine.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `TargetGroupBinding` CRD
pub const API_GROUP: &str = "elbv2.lbsync.io";

/// API version for the `TargetGroupBinding` CRD
pub const API_VERSION: &str = "v1beta1";

/// Kind name for `TargetGroupBinding` resource
pub const KIND_TARGET_GROUP_BINDING: &str = "TargetGroupBinding";

/// Admission webhook path for validating `TargetGroupBinding` objects
pub const VALIDATE_TARGET_GROUP_BINDING_PATH: &str =
    "/validate-elbv2-lbsync-io-v1beta1-targetgroupbinding";

// ============================================================================
// Annotation Keys
// ============================================================================

/// Prefix shared by every annotation the engine reads
pub const ANNOTATION_PREFIX: &str = "lbsync.io/";

/// SSL negotiation policy for TLS listeners
pub const ANNOTATION_SSL_POLICY: &str = "ssl-policy";

/// Comma-separated certificate ARNs; the first one is the default certificate
pub const ANNOTATION_CERTIFICATE_ARN: &str = "certificate-arn";

/// Comma-separated service ports (numbers or names) that terminate TLS, or `*`
pub const ANNOTATION_SSL_PORTS: &str = "ssl-ports";

/// Prefix of per-action annotations (`actions.<name>`)
pub const ANNOTATION_ACTIONS_PREFIX: &str = "actions.";

/// Target type for target groups (`instance` or `ip`)
pub const ANNOTATION_TARGET_TYPE: &str = "target-type";

/// Protocol used between the load balancer and the targets
pub const ANNOTATION_BACKEND_PROTOCOL: &str = "backend-protocol";

/// Health check path
pub const ANNOTATION_HEALTHCHECK_PATH: &str = "healthcheck-path";

/// Health check port (number or `traffic-port`)
pub const ANNOTATION_HEALTHCHECK_PORT: &str = "healthcheck-port";

/// Health check protocol
pub const ANNOTATION_HEALTHCHECK_PROTOCOL: &str = "healthcheck-protocol";

/// Health check interval in seconds
pub const ANNOTATION_HEALTHCHECK_INTERVAL_SECONDS: &str = "healthcheck-interval-seconds";

/// Health check timeout in seconds
pub const ANNOTATION_HEALTHCHECK_TIMEOUT_SECONDS: &str = "healthcheck-timeout-seconds";

/// Consecutive successes before a target is healthy
pub const ANNOTATION_HEALTHY_THRESHOLD_COUNT: &str = "healthy-threshold-count";

/// Consecutive failures before a target is unhealthy
pub const ANNOTATION_UNHEALTHY_THRESHOLD_COUNT: &str = "unhealthy-threshold-count";

/// HTTP codes that count as a successful health check
pub const ANNOTATION_SUCCESS_CODES: &str = "success-codes";

/// Service port name meaning "resolved through an `actions.<name>` annotation"
pub const USE_ANNOTATION_PORT: &str = "use-annotation";

// ============================================================================
// Defaults
// ============================================================================

/// SSL policy applied to TLS listeners when none is annotated
pub const DEFAULT_SSL_POLICY: &str = "ELBSecurityPolicy-2016-08";

/// Default health check path
pub const DEFAULT_HEALTHCHECK_PATH: &str = "/";

/// Default health check port: the port targets receive traffic on
pub const DEFAULT_HEALTHCHECK_PORT: &str = "traffic-port";

/// Default health check interval (seconds)
pub const DEFAULT_HEALTHCHECK_INTERVAL_SECONDS: i64 = 15;

/// Default health check timeout (seconds)
pub const DEFAULT_HEALTHCHECK_TIMEOUT_SECONDS: i64 = 5;

/// Default healthy threshold count
pub const DEFAULT_HEALTHY_THRESHOLD_COUNT: i64 = 2;

/// Default unhealthy threshold count
pub const DEFAULT_UNHEALTHY_THRESHOLD_COUNT: i64 = 2;

/// Default success codes
pub const DEFAULT_SUCCESS_CODES: &str = "200";

// ============================================================================
// Ownership Tags
// ============================================================================

/// Tag key prefix marking cluster ownership (`kubernetes.io/cluster/<name>`)
pub const TAG_CLUSTER_PREFIX: &str = "kubernetes.io/cluster/";

/// Tag value for cluster ownership
pub const TAG_CLUSTER_OWNED: &str = "owned";

/// Tag key holding the owning workload namespace
pub const TAG_NAMESPACE: &str = "kubernetes.io/namespace";

/// Tag key holding the owning ingress name
pub const TAG_INGRESS_NAME: &str = "kubernetes.io/ingress-name";

/// Tag key holding the backend service name of a target group
pub const TAG_SERVICE_NAME: &str = "kubernetes.io/service-name";

/// Tag key holding the backend service port of a target group
pub const TAG_SERVICE_PORT: &str = "kubernetes.io/service-port";

/// Prefix for generated target group names
pub const TARGET_GROUP_NAME_PREFIX: &str = "k8s";

/// Maximum target group name length accepted by the cloud API
pub const TARGET_GROUP_NAME_MAX_LEN: usize = 32;

// ============================================================================
// Server Defaults
// ============================================================================

/// Default listen address of the admission webhook server
pub const DEFAULT_WEBHOOK_ADDR: &str = "0.0.0.0:9443";

/// Default listen address of the metrics server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";
