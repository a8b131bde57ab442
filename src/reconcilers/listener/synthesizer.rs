// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Graph-driven listener convergence.
//!
//! [`ListenerSynthesizer`] realizes every listener node of a [`Stack`]. Nodes
//! are grouped by their resolved load balancer ARN and matched against the
//! listeners actually present on that load balancer by port. Per load
//! balancer it then deletes unmatched actual listeners, creates unmatched
//! desired ones, and modifies matched pairs that differ, in that order, so a
//! listener replaced at the same port never collides with its predecessor.

use super::{
    create_listener, delete_listener, modify_listener, reconcile_extra_certificates,
    ListenerConfig,
};
use crate::cancel::ensure_active;
use crate::context::Context;
use crate::errors::{LbError, Result};
use crate::graph::{ListenerSpec, ListenerStatus, Stack};
use crate::matcher::match_by_key;
use crate::metrics::{
    record_reconciliation_error, record_reconciliation_success, CONTROLLER_LISTENER_SYNTHESIZER,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Converges the listeners of a resource graph.
#[derive(Clone)]
pub struct ListenerSynthesizer {
    ctx: Arc<Context>,
}

impl ListenerSynthesizer {
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Realize every listener node of `stack` and publish its status.
    ///
    /// # Errors
    ///
    /// - `LbError::DependencyUnresolved` if a node's load balancer is not realized yet
    /// - `LbError::CloudApi` on the first failing cloud call
    /// - `LbError::Cancelled` if `cancel` fires before a cloud call
    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &mut Stack) -> Result<()> {
        let start = Instant::now();
        let result = self.synthesize_all(cancel, stack).await;
        match &result {
            Ok(()) => {
                record_reconciliation_success(CONTROLLER_LISTENER_SYNTHESIZER, start.elapsed());
            }
            Err(e) => {
                error!("Listener synthesis failed: {}", e);
                record_reconciliation_error(
                    CONTROLLER_LISTENER_SYNTHESIZER,
                    e.reason(),
                    start.elapsed(),
                );
            }
        }
        result
    }

    /// Finalization hook run after every synthesizer of the cycle. Listeners need none.
    ///
    /// # Errors
    ///
    /// Never fails.
    pub async fn post_synthesize(&self, _cancel: &CancellationToken) -> Result<()> {
        Ok(())
    }

    async fn synthesize_all(&self, cancel: &CancellationToken, stack: &mut Stack) -> Result<()> {
        let mut nodes_by_lb: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, node) in stack.listeners().iter().enumerate() {
            let lb_arn = stack.resolve(&node.spec.load_balancer_arn)?;
            nodes_by_lb.entry(lb_arn).or_default().push(index);
        }

        for (lb_arn, indices) in nodes_by_lb {
            self.synthesize_on_lb(cancel, stack, &lb_arn, indices).await?;
        }
        Ok(())
    }

    async fn synthesize_on_lb(
        &self,
        cancel: &CancellationToken,
        stack: &mut Stack,
        lb_arn: &str,
        indices: Vec<usize>,
    ) -> Result<()> {
        let cloud = self.ctx.cloud.as_ref();

        ensure_active(cancel, "DescribeListeners")?;
        let sdk_listeners = cloud
            .describe_listeners_as_list(lb_arn)
            .await
            .map_err(|e| LbError::cloud("DescribeListeners", lb_arn, e))?;

        let listeners = stack.listeners();
        let matches = match_by_key(
            indices,
            sdk_listeners,
            |index| listeners[*index].spec.port,
            |sdk| sdk.port,
        );
        debug!(
            "Listeners on {}: {} matched, {} to create, {} to delete",
            lb_arn,
            matches.matched.len(),
            matches.desired_only.len(),
            matches.actual_only.len()
        );

        for sdk in &matches.actual_only {
            delete_listener(cloud, cancel, sdk).await?;
        }

        for index in matches.desired_only {
            let config = listener_config(&stack.listeners()[index].spec);
            let created = create_listener(cloud, cancel, lb_arn, &config).await?;
            if config.protocol.requires_tls() {
                reconcile_extra_certificates(
                    cloud,
                    cancel,
                    &created.listener_arn,
                    &config.extra_certificate_arns,
                )
                .await?;
            }
            info!("Created listener {} as {}", config.port, created.listener_arn);
            stack.listeners_mut()[index].status = Some(ListenerStatus {
                listener_arn: created.listener_arn,
            });
        }

        for (index, sdk) in matches.matched {
            let config = listener_config(&stack.listeners()[index].spec);
            let updated = modify_listener(cloud, cancel, sdk, &config).await?;
            if config.protocol.requires_tls() {
                reconcile_extra_certificates(
                    cloud,
                    cancel,
                    &updated.listener_arn,
                    &config.extra_certificate_arns,
                )
                .await?;
            }
            stack.listeners_mut()[index].status = Some(ListenerStatus {
                listener_arn: updated.listener_arn,
            });
        }
        Ok(())
    }
}

fn listener_config(spec: &ListenerSpec) -> ListenerConfig {
    let certificate_arns: Vec<String> = spec
        .certificates
        .iter()
        .map(|c| c.certificate_arn.clone())
        .collect();
    ListenerConfig {
        port: spec.port,
        protocol: spec.protocol,
        default_actions: spec.default_actions.clone(),
        ssl_policy: spec.ssl_policy.clone(),
        default_certificates: Vec::new(),
        extra_certificate_arns: Vec::new(),
    }
    .with_certificates(&certificate_arns)
}

#[cfg(test)]
#[path = "synthesizer_tests.rs"]
mod synthesizer_tests;
