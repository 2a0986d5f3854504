//! Change/restore orchestrator
//!
//! The ChangeOrchestrator is responsible for:
//! - Recording an interface's original address before the first change
//! - Validating (or synthesizing) the requested address
//! - Bracketing the address write with interface down/up and settle delays
//! - Probing the default gateway after the interface comes back
//! - Restoring the recorded original after operator confirmation
//!
//! ## Architecture
//!
//! ```text
//!                      ┌────────────────────┐
//!                      │ ChangeOrchestrator │
//!                      └────────────────────┘
//!                                │
//!         ┌──────────────────────┼──────────────────────┐
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//! ┌───────────────┐    ┌───────────────────┐    ┌──────────────┐
//! │  BackupStore  │    │ NetworkController │    │ Confirmation │
//! │ (original)    │    │ (down/set/up)     │    │ (restore)    │
//! └───────────────┘    └───────────────────┘    └──────────────┘
//! ```
//!
//! ## State Flow
//!
//! Change: `Idle → EnsuringBackup → Validating → InterfaceDown → Mutating →
//! InterfaceUp → Verifying → Done`
//!
//! Restore: `Idle → Confirming → InterfaceDown → Mutating → InterfaceUp →
//! Verifying → RecordCleared → Done`
//!
//! Any failure moves to `Failed`. A failed address write is followed by one
//! best-effort `set_interface_up(true)`; its outcome is logged and never
//! replaces the original error. A failed `down` or `up` is reported as is.

use crate::address::MacAddress;
use crate::config::{OrchestratorConfig, SettleDelays};
use crate::error::{Error, Result, Warning};
use crate::generator;
use crate::traits::{Backed, BackupStore, Confirmation, NetworkController};
use crate::validator;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Steps of the change and restore state machines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    EnsuringBackup,
    Validating,
    Confirming,
    InterfaceDown,
    Mutating,
    InterfaceUp,
    Verifying,
    RecordCleared,
    Done,
    Failed,
}

/// Which flow a state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Change,
    Restore,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Change => f.write_str("change"),
            Operation::Restore => f.write_str("restore"),
        }
    }
}

/// Events emitted by the ChangeOrchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// The state machine entered a new state
    StateChanged {
        interface: String,
        operation: Operation,
        state: OrchestratorState,
    },

    /// A non-fatal condition was observed
    Warned {
        interface: String,
        operation: Operation,
        warning: Warning,
    },
}

/// Outcome of a successful change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReport {
    pub interface: String,
    /// Address before the change, if it could be read
    pub previous: Option<MacAddress>,
    /// Address now applied
    pub new: MacAddress,
    /// Whether `new` was synthesized rather than requested
    pub generated: bool,
    pub warnings: Vec<Warning>,
}

/// Outcome of a successful restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub interface: String,
    /// Original address put back on the interface
    pub restored: MacAddress,
    pub warnings: Vec<Warning>,
}

/// Fail with `PrivilegeRequired` unless the controller reports elevation
pub async fn require_privileges(controller: &dyn NetworkController) -> Result<()> {
    if controller.check_privileges().await {
        Ok(())
    } else {
        Err(Error::PrivilegeRequired)
    }
}

/// Core change/restore orchestrator
///
/// ## Lifecycle
///
/// 1. Create with [`ChangeOrchestrator::new()`]
/// 2. Call [`change_address()`](Self::change_address) or
///    [`restore_address()`](Self::restore_address)
/// 3. Drain the event receiver for progress reporting if desired
///
/// ## Sequencing
///
/// Every step is awaited before the next one starts; each depends on the
/// OS-visible effect of the previous step having settled. There is no
/// cancellation once an interface command has been issued.
pub struct ChangeOrchestrator {
    /// Platform controller for the host
    controller: Box<dyn NetworkController>,

    /// Original address records
    store: Box<dyn BackupStore>,

    /// Operator approval for restores
    confirmation: Box<dyn Confirmation>,

    /// Waits between interface steps
    settle: SettleDelays,

    /// Timeout for the reachability probe
    probe_timeout: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<OrchestratorEvent>,
}

impl ChangeOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Parameters
    ///
    /// - `controller`: Platform controller implementation
    /// - `store`: Backup store implementation
    /// - `confirmation`: Confirmation used before restores
    /// - `config`: Orchestrator configuration
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver) where event_receiver yields
    /// state transitions and warnings
    pub fn new(
        controller: Box<dyn NetworkController>,
        store: Box<dyn BackupStore>,
        confirmation: Box<dyn Confirmation>,
        config: OrchestratorConfig,
    ) -> Result<(Self, mpsc::Receiver<OrchestratorEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let orchestrator = Self {
            controller,
            store,
            confirmation,
            settle: config.settle,
            probe_timeout: config.probe_timeout(),
            event_tx: tx,
        };

        Ok((orchestrator, rx))
    }

    /// Read an interface's current address
    pub async fn show_address(&self, interface: &str) -> Option<MacAddress> {
        self.controller.current_address(interface).await
    }

    /// Change an interface's address
    ///
    /// # Parameters
    ///
    /// - `interface`: Interface name, passed through to the OS unchanged
    /// - `requested`: Address to apply, or `None` to synthesize one
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeReport)`: The address was applied (warnings may be attached)
    /// - `Err(Error)`: The first failing step's error
    pub async fn change_address(
        &self,
        interface: &str,
        requested: Option<&str>,
    ) -> Result<ChangeReport> {
        info!("Changing MAC address of {}", interface);
        let result = self.run_change(interface, requested).await;
        self.conclude(interface, Operation::Change, result).await
    }

    /// Restore an interface's recorded original address
    ///
    /// The backup set is reloaded from persistent storage first, so records
    /// written by earlier invocations are always seen.
    ///
    /// # Returns
    ///
    /// - `Ok(RestoreReport)`: The original was applied and its record removed
    /// - `Err(Error::NoBackupFound)`: Nothing recorded; no interface calls made
    /// - `Err(Error::CancelledByUser)`: Confirmation declined; no interface calls made
    /// - `Err(Error)`: Another step failed; the record is kept
    pub async fn restore_address(&self, interface: &str) -> Result<RestoreReport> {
        info!("Restoring original MAC address of {}", interface);
        let result = self.run_restore(interface).await;
        self.conclude(interface, Operation::Restore, result).await
    }

    async fn run_change(&self, interface: &str, requested: Option<&str>) -> Result<ChangeReport> {
        let op = Operation::Change;
        let mut warnings = Vec::new();

        // Read before the interface goes down and its routes disappear
        let gateway = self.controller.default_gateway().await;
        debug!("Default gateway: {:?}", gateway);

        self.transition(interface, op, OrchestratorState::EnsuringBackup);
        self.ensure_backup(interface, op, &mut warnings).await;

        let previous = self.controller.current_address(interface).await;
        debug!("Current address of {}: {:?}", interface, previous);

        let (candidate, generated) = match requested {
            Some(requested) => (requested.to_string(), false),
            None => {
                let generated = generator::random_address();
                info!("Generated random MAC address {}", generated);
                (generated.to_string(), true)
            }
        };

        self.transition(interface, op, OrchestratorState::Validating);
        let new = validator::validate(&candidate)?;

        self.apply(
            interface,
            op,
            &new,
            self.settle.after_mutation(),
            self.settle.after_up(),
        )
        .await?;

        self.transition(interface, op, OrchestratorState::Verifying);
        self.verify(interface, op, gateway, &mut warnings).await;

        info!(
            "MAC address of {} changed: {} -> {}",
            interface,
            previous.map(|m| m.to_string()).unwrap_or_else(|| "unknown".to_string()),
            new
        );

        Ok(ChangeReport {
            interface: interface.to_string(),
            previous,
            new,
            generated,
            warnings,
        })
    }

    async fn run_restore(&self, interface: &str) -> Result<RestoreReport> {
        let op = Operation::Restore;
        let mut warnings = Vec::new();

        if let Err(e) = self.store.load().await {
            self.warn(
                interface,
                op,
                &mut warnings,
                Warning::Persistence {
                    message: e.to_string(),
                },
            );
        }

        let original = self
            .store
            .original(interface)
            .await
            .ok_or_else(|| Error::NoBackupFound {
                interface: interface.to_string(),
            })?;

        self.transition(interface, op, OrchestratorState::Confirming);
        let prompt = format!(
            "Restoring {} to {} will temporarily disconnect the interface. Continue?",
            interface, original
        );
        if !self.confirmation.confirm(&prompt) {
            info!("Restore of {} cancelled by user", interface);
            return Err(Error::CancelledByUser {
                interface: interface.to_string(),
            });
        }

        self.apply(
            interface,
            op,
            &original,
            Duration::ZERO,
            self.settle.restore_after_up(),
        )
        .await?;

        self.transition(interface, op, OrchestratorState::Verifying);
        let gateway = self.controller.default_gateway().await;
        self.verify(interface, op, gateway, &mut warnings).await;

        self.transition(interface, op, OrchestratorState::RecordCleared);
        if let Err(e) = self.store.take_and_clear(interface).await {
            self.warn(
                interface,
                op,
                &mut warnings,
                Warning::Persistence {
                    message: e.to_string(),
                },
            );
        }

        info!("MAC address of {} restored to original: {}", interface, original);

        Ok(RestoreReport {
            interface: interface.to_string(),
            restored: original,
            warnings,
        })
    }

    /// Record the current address unless an original is already stored
    async fn ensure_backup(&self, interface: &str, op: Operation, warnings: &mut Vec<Warning>) {
        if let Some(original) = self.store.original(interface).await {
            debug!("Original address of {} already recorded: {}", interface, original);
            return;
        }

        let Some(current) = self.controller.current_address(interface).await else {
            warn!(
                "Could not read the current address of {}; no original recorded",
                interface
            );
            return;
        };

        match self.store.ensure_backed(interface, current).await {
            Ok(Backed::Inserted) => info!("Original MAC of {} backed up: {}", interface, current),
            Ok(Backed::AlreadyPresent) => debug!("Original address of {} already recorded", interface),
            Err(e) => self.warn(
                interface,
                op,
                warnings,
                Warning::Persistence {
                    message: e.to_string(),
                },
            ),
        }
    }

    /// Down, write, up, with settle delays in between
    async fn apply(
        &self,
        interface: &str,
        op: Operation,
        address: &MacAddress,
        after_mutation: Duration,
        after_up: Duration,
    ) -> Result<()> {
        self.transition(interface, op, OrchestratorState::InterfaceDown);
        if !self.controller.set_interface_up(interface, false).await {
            return Err(Error::InterfaceDownFailed {
                interface: interface.to_string(),
            });
        }
        settle(self.settle.after_down()).await;

        self.transition(interface, op, OrchestratorState::Mutating);
        if !self.controller.set_address(interface, address).await {
            return Err(Error::AddressMutationFailed {
                interface: interface.to_string(),
                address: address.to_string(),
            });
        }
        settle(after_mutation).await;

        self.transition(interface, op, OrchestratorState::InterfaceUp);
        if !self.controller.set_interface_up(interface, true).await {
            return Err(Error::InterfaceUpFailed {
                interface: interface.to_string(),
            });
        }
        settle(after_up).await;

        Ok(())
    }

    /// Probe the gateway; failures only produce a warning
    async fn verify(
        &self,
        interface: &str,
        op: Operation,
        gateway: Option<IpAddr>,
        warnings: &mut Vec<Warning>,
    ) {
        let Some(gateway) = gateway else {
            debug!("No default gateway known; skipping connectivity test");
            return;
        };

        if self.controller.test_connectivity(gateway, self.probe_timeout).await {
            info!("Network connectivity verified via {}", gateway);
        } else {
            self.warn(interface, op, warnings, Warning::Connectivity { gateway });
        }
    }

    /// Final transition plus best-effort recovery on failure
    async fn conclude<T>(&self, interface: &str, op: Operation, result: Result<T>) -> Result<T> {
        match result {
            Ok(report) => {
                self.transition(interface, op, OrchestratorState::Done);
                Ok(report)
            }
            Err(e) => {
                self.transition(interface, op, OrchestratorState::Failed);
                error!("MAC address {} of {} failed: {}", op, interface, e);

                if e.needs_recovery() {
                    warn!("Attempting to bring {} back up", interface);
                    if self.controller.set_interface_up(interface, true).await {
                        info!("Interface {} is up again", interface);
                    } else {
                        warn!("Recovery of {} failed; interface may still be down", interface);
                    }
                }

                Err(e)
            }
        }
    }

    fn transition(&self, interface: &str, operation: Operation, state: OrchestratorState) {
        debug!("{} {}: {:?}", operation, interface, state);
        self.emit_event(OrchestratorEvent::StateChanged {
            interface: interface.to_string(),
            operation,
            state,
        });
    }

    fn warn(
        &self,
        interface: &str,
        operation: Operation,
        warnings: &mut Vec<Warning>,
        warning: Warning,
    ) {
        warn!("{} {}: {}", operation, interface, warning);
        self.emit_event(OrchestratorEvent::Warned {
            interface: interface.to_string(),
            operation,
            warning: warning.clone(),
        });
        warnings.push(warning);
    }

    /// Emit an orchestrator event
    fn emit_event(&self, event: OrchestratorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Wait for the OS to apply an interface change
async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
