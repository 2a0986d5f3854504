// # phantom-mac-core
//
// Core library for changing, inspecting and restoring the hardware (MAC)
// address of a network interface.
//
// ## Architecture Overview
//
// - **MacAddress**: Six-octet address with lenient parsing and canonical display
// - **validator**: Assignability check (format + unicast bit)
// - **generator**: Random addresses from a pool of vendor prefixes
// - **NetworkController**: Trait for per-OS interface control
// - **BackupStore**: Trait for persisting each interface's original address
// - **ChangeOrchestrator**: State machine sequencing change and restore
// - **ControllerRegistry**: Selects one controller per host family
//
// ## Design Principles
//
// 1. **Soft platform failures**: Controllers report booleans/options, never raw OS errors
// 2. **Explicit state**: The backup store is passed in, never ambient
// 3. **Sequential**: Every interface step is awaited and settled before the next
// 4. **First write wins**: An interface's recorded original is never overwritten

pub mod address;
pub mod config;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod registry;
pub mod store;
pub mod traits;
pub mod validator;

// Re-export core types for convenience
pub use address::MacAddress;
pub use config::{OrchestratorConfig, PhantomConfig, PlatformConfig, SettleDelays};
pub use error::{Error, Result, Warning};
pub use orchestrator::{
    ChangeOrchestrator, ChangeReport, Operation, OrchestratorEvent, OrchestratorState,
    RestoreReport, require_privileges,
};
pub use registry::ControllerRegistry;
pub use store::{FileBackupStore, MemoryBackupStore};
pub use traits::{BackupStore, Confirmation, HostFamily, NetworkController};
pub use validator::is_assignable;
