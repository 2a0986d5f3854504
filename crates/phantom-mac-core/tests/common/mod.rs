//! Test doubles and common utilities for orchestrator contract tests
//!
//! This module provides minimal test doubles that record what the
//! orchestrator asks of the platform without touching a real interface.

#![allow(dead_code)]

use phantom_mac_core::config::{OrchestratorConfig, SettleDelays};
use phantom_mac_core::traits::{Confirmation, HostFamily, NetworkController};
use phantom_mac_core::{MacAddress, OrchestratorEvent, OrchestratorState};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// One call made against the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Privileges,
    CurrentAddress(String),
    SetUp(String, bool),
    SetAddress(String, MacAddress),
    DefaultGateway,
    Connectivity(IpAddr, Duration),
}

impl Call {
    /// Calls that change interface state
    pub fn is_interface_mutation(&self) -> bool {
        matches!(self, Call::SetUp(..) | Call::SetAddress(..))
    }
}

/// A controller that records calls and simulates one interface
///
/// Clones share the call log and the simulated address, so a test can
/// hand one clone to the orchestrator and inspect another.
#[derive(Clone)]
pub struct RecordingController {
    calls: Arc<Mutex<Vec<Call>>>,
    address: Arc<Mutex<Option<MacAddress>>>,
    gateway: Option<IpAddr>,
    reachable: bool,
    elevated: bool,
    fail_down: bool,
    fail_set: bool,
    fail_up: bool,
}

impl RecordingController {
    pub fn new(address: &str) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            address: Arc::new(Mutex::new(Some(address.parse().unwrap()))),
            gateway: Some(IpAddr::from([192, 168, 1, 1])),
            reachable: true,
            elevated: true,
            fail_down: false,
            fail_set: false,
            fail_up: false,
        }
    }

    pub fn without_gateway(mut self) -> Self {
        self.gateway = None;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn unprivileged(mut self) -> Self {
        self.elevated = false;
        self
    }

    pub fn failing_down(mut self) -> Self {
        self.fail_down = true;
        self
    }

    pub fn failing_set(mut self) -> Self {
        self.fail_set = true;
        self
    }

    pub fn failing_up(mut self) -> Self {
        self.fail_up = true;
        self
    }

    pub fn gateway(&self) -> Option<IpAddr> {
        self.gateway
    }

    /// Every recorded call in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Only the calls that change interface state
    pub fn interface_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_interface_mutation)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Simulated address currently on the interface
    pub fn address(&self) -> Option<MacAddress> {
        *self.address.lock().unwrap()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl NetworkController for RecordingController {
    fn family(&self) -> HostFamily {
        HostFamily::Linux
    }

    async fn check_privileges(&self) -> bool {
        self.record(Call::Privileges);
        self.elevated
    }

    async fn current_address(&self, interface: &str) -> Option<MacAddress> {
        self.record(Call::CurrentAddress(interface.to_string()));
        self.address()
    }

    async fn set_interface_up(&self, interface: &str, up: bool) -> bool {
        self.record(Call::SetUp(interface.to_string(), up));
        if up { !self.fail_up } else { !self.fail_down }
    }

    async fn set_address(&self, interface: &str, address: &MacAddress) -> bool {
        self.record(Call::SetAddress(interface.to_string(), *address));
        if self.fail_set {
            return false;
        }
        *self.address.lock().unwrap() = Some(*address);
        true
    }

    async fn default_gateway(&self) -> Option<IpAddr> {
        self.record(Call::DefaultGateway);
        self.gateway
    }

    async fn test_connectivity(&self, target: IpAddr, timeout: Duration) -> bool {
        self.record(Call::Connectivity(target, timeout));
        self.reachable
    }
}

/// A confirmation with a fixed answer that remembers every prompt
#[derive(Clone)]
pub struct ScriptedConfirmation {
    answer: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConfirmation {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirmation for ScriptedConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }
}

/// Orchestrator configuration with every settle delay disabled
pub fn minimal_config() -> OrchestratorConfig {
    OrchestratorConfig {
        settle: SettleDelays::none(),
        ..Default::default()
    }
}

/// Drain all buffered events and keep only the state transitions
pub fn drain_states(rx: &mut mpsc::Receiver<OrchestratorEvent>) -> Vec<OrchestratorState> {
    let mut states = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let OrchestratorEvent::StateChanged { state, .. } = event {
            states.push(state);
        }
    }
    states
}

pub fn mac(s: &str) -> MacAddress {
    s.parse().unwrap()
}
