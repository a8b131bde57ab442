// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # lbsync - Load Balancer Reconciliation for Kubernetes
//!
//! lbsync converges cloud load balancer resources (target groups, listeners
//! and listener certificates) toward the state declared by Kubernetes
//! `Ingress` and `Service` objects and their annotations, and validates
//! `TargetGroupBinding` custom resources at admission time.
//!
//! ## Overview
//!
//! Every reconciler compares the desired state derived from a workload with
//! the actual state reported by the [`cloud::CloudApi`] and issues only the
//! create, modify and delete calls needed to close the gap. A second pass
//! over unchanged inputs issues no mutations. Resources are owned through
//! tags, so garbage collection never touches another workload's resources.
//!
//! ## Modules
//!
//! - [`reconcilers`] - Target group, listener and synthesizer controllers
//! - [`webhook`] - `TargetGroupBinding` validating admission webhook
//! - [`matcher`] - Desired/actual matching by key
//! - [`model`] - Backends, target groups and target group groups
//! - [`annotations`] - Workload annotation parsing
//! - [`tags`] - Ownership tags and deterministic resource names
//! - [`graph`] - Declarative resource graph consumed by the synthesizer
//! - [`cloud`] - Abstract cloud load-balancing API
//! - [`store`] - Workload and annotation lookup
//! - [`crd`] - Custom Resource Definitions
//!
//! ## Example
//!
//! ```rust,no_run
//! use lbsync::crd::{ServiceReference, TargetGroupBindingSpec, TargetType};
//! use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
//!
//! let spec = TargetGroupBindingSpec {
//!     target_group_arn: "arn:aws:elasticloadbalancing:us-west-2:123:targetgroup/web/abc".to_string(),
//!     target_type: Some(TargetType::Ip),
//!     node_selector: None,
//!     service_ref: ServiceReference {
//!         name: "web".to_string(),
//!         port: IntOrString::Int(80),
//!     },
//! };
//! ```

pub mod annotations;
pub mod cancel;
pub mod cloud;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod graph;
pub mod matcher;
pub mod metrics;
pub mod model;
pub mod reconcilers;
pub mod store;
pub mod tags;
pub mod webhook;
