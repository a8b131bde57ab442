// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`CloudApi`] used by unit tests.
//!
//! Stores target groups, listeners and certificates, hands out deterministic
//! ARNs, and records every mutating call as `"<Operation>:<resource>"` so tests
//! can assert exact call sequences. Any operation can be made to fail.

use super::types::{
    Certificate, HealthCheckConfig, ListenerCertificate, ListenerInput, ResourceType,
    SdkListener, SdkTargetGroup, TagFilters, TargetGroupInput,
};
use super::{CloudApi, CloudResult};
use crate::errors::CloudError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    next_id: u64,
    target_groups: BTreeMap<String, SdkTargetGroup>,
    listeners: BTreeMap<String, SdkListener>,
    extra_certificates: BTreeMap<String, BTreeSet<String>>,
    mutations: Vec<String>,
    lookups: Vec<String>,
    failing: BTreeSet<String>,
}

#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<FakeState>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail with a `InternalFailure` error.
    pub fn fail_on(&self, operation: &str) {
        self.state.lock().unwrap().failing.insert(operation.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    /// Mutating calls issued so far, in order.
    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().unwrap().mutations.clone()
    }

    /// Mutating calls whose operation name is `operation`.
    pub fn mutations_of(&self, operation: &str) -> Vec<String> {
        let prefix = format!("{operation}:");
        self.mutations()
            .into_iter()
            .filter(|m| m.starts_with(&prefix))
            .collect()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().lookups.clone()
    }

    pub fn reset_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.mutations.clear();
        state.lookups.clear();
    }

    pub fn target_groups(&self) -> Vec<SdkTargetGroup> {
        self.state
            .lock()
            .unwrap()
            .target_groups
            .values()
            .cloned()
            .collect()
    }

    pub fn listeners(&self) -> Vec<SdkListener> {
        self.state.lock().unwrap().listeners.values().cloned().collect()
    }

    pub fn extra_certificates(&self, listener_arn: &str) -> BTreeSet<String> {
        self.state
            .lock()
            .unwrap()
            .extra_certificates
            .get(listener_arn)
            .cloned()
            .unwrap_or_default()
    }

    /// Insert a target group directly, bypassing call recording.
    pub fn seed_target_group(&self, input: &TargetGroupInput) -> SdkTargetGroup {
        let mut state = self.state.lock().unwrap();
        let tg = state.new_target_group(input);
        state.target_groups.insert(tg.target_group_arn.clone(), tg.clone());
        tg
    }

    /// Insert a listener directly, bypassing call recording.
    pub fn seed_listener(&self, lb_arn: &str, input: &ListenerInput) -> SdkListener {
        let mut state = self.state.lock().unwrap();
        let listener = state.new_listener(lb_arn, input);
        state
            .listeners
            .insert(listener.listener_arn.clone(), listener.clone());
        listener
    }

    /// Attach extra certificates directly, bypassing call recording.
    pub fn seed_extra_certificates(&self, listener_arn: &str, arns: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .extra_certificates
            .entry(listener_arn.to_string())
            .or_default()
            .extend(arns.iter().map(|a| (*a).to_string()));
    }
}

impl FakeState {
    fn next_arn(&mut self, kind: &str, name: &str) -> String {
        self.next_id += 1;
        format!("arn:fake:{kind}/{name}/{}", self.next_id)
    }

    fn check(&self, operation: &str) -> CloudResult<()> {
        if self.failing.contains(operation) {
            return Err(CloudError::new("InternalFailure", format!("{operation} failed")));
        }
        Ok(())
    }

    fn record(&mut self, operation: &str, resource: &str) -> CloudResult<()> {
        self.check(operation)?;
        self.mutations.push(format!("{operation}:{resource}"));
        Ok(())
    }

    fn lookup(&mut self, operation: &str, resource: &str) -> CloudResult<()> {
        self.check(operation)?;
        self.lookups.push(format!("{operation}:{resource}"));
        Ok(())
    }

    fn new_target_group(&mut self, input: &TargetGroupInput) -> SdkTargetGroup {
        SdkTargetGroup {
            target_group_arn: self.next_arn("targetgroup", &input.name),
            target_group_name: input.name.clone(),
            protocol: input.protocol,
            port: input.port,
            target_type: input.target_type,
            health_check: input.health_check.clone(),
            tags: input.tags.clone(),
        }
    }

    fn new_listener(&mut self, lb_arn: &str, input: &ListenerInput) -> SdkListener {
        SdkListener {
            listener_arn: self.next_arn("listener", &input.port.to_string()),
            load_balancer_arn: lb_arn.to_string(),
            port: input.port,
            protocol: input.protocol,
            ssl_policy: input.ssl_policy.clone(),
            certificates: input.certificates.clone(),
            default_actions: input.default_actions.clone(),
        }
    }
}

fn not_found(what: &str) -> CloudError {
    CloudError::new("NotFound", format!("{what} not found"))
}

#[async_trait::async_trait]
impl CloudApi for FakeCloud {
    async fn create_listener(&self, lb_arn: &str, input: &ListenerInput) -> CloudResult<SdkListener> {
        let mut state = self.state.lock().unwrap();
        state.record("CreateListener", &input.port.to_string())?;
        let listener = state.new_listener(lb_arn, input);
        state
            .listeners
            .insert(listener.listener_arn.clone(), listener.clone());
        Ok(listener)
    }

    async fn modify_listener(
        &self,
        listener_arn: &str,
        input: &ListenerInput,
    ) -> CloudResult<SdkListener> {
        let mut state = self.state.lock().unwrap();
        state.record("ModifyListener", &input.port.to_string())?;
        let listener = state
            .listeners
            .get_mut(listener_arn)
            .ok_or_else(|| not_found(listener_arn))?;
        listener.port = input.port;
        listener.protocol = input.protocol;
        listener.ssl_policy = input.ssl_policy.clone();
        listener.certificates = input.certificates.clone();
        listener.default_actions = input.default_actions.clone();
        Ok(listener.clone())
    }

    async fn delete_listeners_by_arn(&self, listener_arn: &str) -> CloudResult<()> {
        let mut state = self.state.lock().unwrap();
        let port = state
            .listeners
            .get(listener_arn)
            .map(|l| l.port.to_string())
            .ok_or_else(|| not_found(listener_arn))?;
        state.record("DeleteListener", &port)?;
        state.listeners.remove(listener_arn);
        state.extra_certificates.remove(listener_arn);
        Ok(())
    }

    async fn list_listeners_by_load_balancer(&self, lb_arn: &str) -> CloudResult<Vec<SdkListener>> {
        let mut state = self.state.lock().unwrap();
        state.lookup("DescribeListeners", lb_arn)?;
        Ok(state
            .listeners
            .values()
            .filter(|l| l.load_balancer_arn == lb_arn)
            .cloned()
            .collect())
    }

    async fn describe_listener_certificates(
        &self,
        listener_arn: &str,
    ) -> CloudResult<Vec<ListenerCertificate>> {
        let mut state = self.state.lock().unwrap();
        state.lookup("DescribeListenerCertificates", listener_arn)?;
        let listener = state
            .listeners
            .get(listener_arn)
            .ok_or_else(|| not_found(listener_arn))?;
        let mut certificates: Vec<ListenerCertificate> = listener
            .certificates
            .iter()
            .map(|c| ListenerCertificate {
                certificate_arn: c.certificate_arn.clone(),
                is_default: true,
            })
            .collect();
        if let Some(extra) = state.extra_certificates.get(listener_arn) {
            certificates.extend(extra.iter().map(|arn| ListenerCertificate {
                certificate_arn: arn.clone(),
                is_default: false,
            }));
        }
        Ok(certificates)
    }

    async fn add_listener_certificates(
        &self,
        listener_arn: &str,
        certificates: &[Certificate],
    ) -> CloudResult<()> {
        let mut state = self.state.lock().unwrap();
        for certificate in certificates {
            state.record("AddListenerCertificates", &certificate.certificate_arn)?;
            state
                .extra_certificates
                .entry(listener_arn.to_string())
                .or_default()
                .insert(certificate.certificate_arn.clone());
        }
        Ok(())
    }

    async fn remove_listener_certificates(
        &self,
        listener_arn: &str,
        certificates: &[Certificate],
    ) -> CloudResult<()> {
        let mut state = self.state.lock().unwrap();
        for certificate in certificates {
            state.record("RemoveListenerCertificates", &certificate.certificate_arn)?;
            if let Some(extra) = state.extra_certificates.get_mut(listener_arn) {
                extra.remove(&certificate.certificate_arn);
            }
        }
        Ok(())
    }

    async fn get_resources_by_filters(
        &self,
        tag_filters: &TagFilters,
        resource_type: ResourceType,
    ) -> CloudResult<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.lookup("GetResources", resource_type.as_str())?;
        if resource_type != ResourceType::TargetGroup {
            return Ok(Vec::new());
        }
        Ok(state
            .target_groups
            .values()
            .filter(|tg| {
                tag_filters.iter().all(|(key, values)| {
                    tg.tags
                        .get(key)
                        .is_some_and(|v| values.is_empty() || values.contains(v))
                })
            })
            .map(|tg| tg.target_group_arn.clone())
            .collect())
    }

    async fn create_target_group(&self, input: &TargetGroupInput) -> CloudResult<SdkTargetGroup> {
        let mut state = self.state.lock().unwrap();
        state.record("CreateTargetGroup", &input.name)?;
        let tg = state.new_target_group(input);
        state
            .target_groups
            .insert(tg.target_group_arn.clone(), tg.clone());
        Ok(tg)
    }

    async fn modify_target_group(
        &self,
        target_group_arn: &str,
        health_check: &HealthCheckConfig,
    ) -> CloudResult<SdkTargetGroup> {
        let mut state = self.state.lock().unwrap();
        state.record("ModifyTargetGroup", target_group_arn)?;
        let tg = state
            .target_groups
            .get_mut(target_group_arn)
            .ok_or_else(|| not_found(target_group_arn))?;
        tg.health_check = health_check.clone();
        Ok(tg.clone())
    }

    async fn describe_target_groups(&self, arns: &[String]) -> CloudResult<Vec<SdkTargetGroup>> {
        let mut state = self.state.lock().unwrap();
        state.lookup("DescribeTargetGroups", &arns.join(","))?;
        Ok(arns
            .iter()
            .filter_map(|arn| state.target_groups.get(arn).cloned())
            .collect())
    }

    async fn delete_target_group_by_arn(&self, target_group_arn: &str) -> CloudResult<()> {
        let mut state = self.state.lock().unwrap();
        state.record("DeleteTargetGroup", target_group_arn)?;
        state
            .target_groups
            .remove(target_group_arn)
            .map(|_| ())
            .ok_or_else(|| not_found(target_group_arn))
    }
}
