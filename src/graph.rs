// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Declarative resource graph consumed by the synthesizers.
//!
//! A [`Stack`] holds the desired load balancers and listeners of one
//! convergence cycle. Upstream model builders populate it; synthesizers realize
//! the nodes in the cloud and publish each node's status (its ARN) back onto
//! the graph so downstream nodes can resolve references to it.
//!
//! References between nodes are [`StringToken`]s. A token either carries a
//! literal value or points at another node whose status may not be realized
//! yet, in which case resolution fails with `LbError::DependencyUnresolved`.

use crate::cloud::{Action, Certificate, Protocol};
use crate::errors::{LbError, Result};
use std::collections::BTreeMap;

/// A string value that may depend on another node's status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StringToken {
    /// A value known at model-build time
    Literal(String),
    /// ARN of the load balancer node with this id
    LoadBalancerArn(String),
}

impl From<&str> for StringToken {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

/// Realized state of a load balancer node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadBalancerStatus {
    pub load_balancer_arn: String,
}

/// A desired load balancer. Only its status is read by the listener synthesizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadBalancerNode {
    pub id: String,
    pub status: Option<LoadBalancerStatus>,
}

/// Desired configuration of a listener node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerSpec {
    pub load_balancer_arn: StringToken,
    pub port: i64,
    pub protocol: Protocol,
    pub default_actions: Vec<Action>,
    /// The first certificate is the default one; the rest are extras
    pub certificates: Vec<Certificate>,
    pub ssl_policy: Option<String>,
}

/// Realized state of a listener node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerStatus {
    pub listener_arn: String,
}

/// A desired listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerNode {
    pub id: String,
    pub spec: ListenerSpec,
    pub status: Option<ListenerStatus>,
}

/// Desired resources of one convergence cycle.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    load_balancers: BTreeMap<String, LoadBalancerNode>,
    listeners: Vec<ListenerNode>,
}

impl Stack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a load balancer node, realized when `arn` is given.
    pub fn add_load_balancer(&mut self, id: impl Into<String>, arn: Option<&str>) {
        let id = id.into();
        let status = arn.map(|arn| LoadBalancerStatus {
            load_balancer_arn: arn.to_string(),
        });
        self.load_balancers
            .insert(id.clone(), LoadBalancerNode { id, status });
    }

    /// Publish the ARN of a realized load balancer node.
    ///
    /// # Errors
    ///
    /// Returns `LbError::Config` if no node has this id.
    pub fn set_load_balancer_arn(&mut self, id: &str, arn: impl Into<String>) -> Result<()> {
        let node = self
            .load_balancers
            .get_mut(id)
            .ok_or_else(|| LbError::Config(format!("unknown load balancer node {id}")))?;
        node.status = Some(LoadBalancerStatus {
            load_balancer_arn: arn.into(),
        });
        Ok(())
    }

    pub fn add_listener(&mut self, id: impl Into<String>, spec: ListenerSpec) {
        self.listeners.push(ListenerNode {
            id: id.into(),
            spec,
            status: None,
        });
    }

    #[must_use]
    pub fn listeners(&self) -> &[ListenerNode] {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut [ListenerNode] {
        &mut self.listeners
    }

    #[must_use]
    pub fn listener(&self, id: &str) -> Option<&ListenerNode> {
        self.listeners.iter().find(|l| l.id == id)
    }

    /// Resolve a token to its concrete value.
    ///
    /// # Errors
    ///
    /// Returns `LbError::DependencyUnresolved` if the referenced node is
    /// unknown or has no status yet.
    pub fn resolve(&self, token: &StringToken) -> Result<String> {
        match token {
            StringToken::Literal(value) => Ok(value.clone()),
            StringToken::LoadBalancerArn(id) => self
                .load_balancers
                .get(id)
                .and_then(|node| node.status.as_ref())
                .map(|status| status.load_balancer_arn.clone())
                .ok_or_else(|| LbError::DependencyUnresolved {
                    resource: format!("LoadBalancer/{id}"),
                }),
        }
    }
}
