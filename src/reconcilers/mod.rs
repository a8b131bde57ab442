// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconcilers converging cloud load balancer resources.
//!
//! # Available Reconcilers
//!
//! ## Target groups
//!
//! - [`TargetGroupReconciler`] - Creates or updates the target group of one backend
//! - [`TargetGroupGroupController`] - Reconciles every backend of an Ingress and
//!   garbage-collects the target groups it no longer uses
//!
//! ## Listeners
//!
//! - [`ListenerReconciler`] - Creates or updates one listener and its certificates
//! - [`ListenerGroupController`] - Converges every listener of a Service's load balancer
//! - [`ListenerSynthesizer`] - Realizes the listener nodes of a resource graph
//!
//! # Example
//!
//! ```rust,no_run
//! use lbsync::context::Context;
//! use lbsync::reconcilers::{ListenerGroupController, TargetGroupGroupController};
//! use k8s_openapi::api::core::v1::Service;
//! use k8s_openapi::api::networking::v1::Ingress;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! async fn converge(
//!     ctx: Arc<Context>,
//!     lb_arn: &str,
//!     ingress: &Ingress,
//!     service: &Service,
//! ) -> lbsync::errors::Result<()> {
//!     let cancel = CancellationToken::new();
//!     let tg_groups = TargetGroupGroupController::new(ctx.clone());
//!     let group = tg_groups.reconcile(&cancel, ingress).await?;
//!     ListenerGroupController::new(ctx)
//!         .reconcile(&cancel, lb_arn, service, &group)
//!         .await?;
//!     tg_groups.gc(&cancel, &group).await
//! }
//! ```

pub mod listener;
pub mod targetgroup;

#[cfg(test)]
pub(crate) mod fixtures;

pub use listener::group::ListenerGroupController;
pub use listener::synthesizer::ListenerSynthesizer;
pub use listener::ListenerReconciler;
pub use targetgroup::group::TargetGroupGroupController;
pub use targetgroup::TargetGroupReconciler;
