// # phantom-mac - MAC address changer
//
// The phantom-mac binary is a thin integration layer. It is responsible for:
// 1. Parsing arguments
// 2. Reading configuration from environment variables
// 3. Selecting the platform controller for this host
// 4. Running one change, show or restore through the core orchestrator
// 5. Mapping the outcome to an exit code
//
// All sequencing, validation and backup logic lives in phantom-mac-core.
//
// ## Configuration
//
// - `PHANTOM_MAC_BACKUP_PATH`: Backup file location
// - `PHANTOM_MAC_LOG_LEVEL`: trace, debug, info, warn (default), error
// - `PHANTOM_MAC_SETTLE_DOWN_MS`: Wait after bringing the interface down
// - `PHANTOM_MAC_SETTLE_MUTATE_MS`: Wait after writing the address
// - `PHANTOM_MAC_SETTLE_UP_MS`: Wait after bringing the interface up
// - `PHANTOM_MAC_SETTLE_RESTORE_UP_MS`: Wait after bringing it up on restore
// - `PHANTOM_MAC_PROBE_TIMEOUT_SECS`: Connectivity probe timeout (1-60)
// - `PHANTOM_MAC_ADAPTER_SUBKEY`: Windows adapter class subkey override
//
// ## Example
//
// ```bash
// sudo phantom-mac -i eth0 -m 00:11:22:33:44:55
// sudo phantom-mac -i eth0
// phantom-mac -i eth0 --show
// sudo phantom-mac -i eth0 --restore
// ```

mod cli;
mod console;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Action, Cli, Mutation};
use console::ConsoleConfirmation;
use phantom_mac_core::traits::{FixedConfirmation, NetworkController};
use phantom_mac_core::{
    ChangeOrchestrator, ControllerRegistry, Error, FileBackupStore, MemoryBackupStore,
    PhantomConfig, require_privileges,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    /// Operation completed (warnings allowed)
    Success = 0,
    /// An interface step or query failed
    OperationFailed = 1,
    /// Bad or missing arguments
    UsageError = 2,
    /// Administrative privileges are missing
    PrivilegeRequired = 3,
    /// Restore declined at the confirmation prompt
    Cancelled = 4,
    /// Unsupported platform or invalid configuration
    StartupError = 5,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

impl From<&Error> for ExitStatus {
    fn from(err: &Error) -> Self {
        match err {
            Error::PrivilegeRequired => ExitStatus::PrivilegeRequired,
            Error::CancelledByUser { .. } => ExitStatus::Cancelled,
            Error::UnsupportedPlatform(_) | Error::Config(_) => ExitStatus::StartupError,
            _ => ExitStatus::OperationFailed,
        }
    }
}

/// Settings read from the environment
struct Config {
    backup_path: Option<PathBuf>,
    log_level: String,
    settle_down_ms: Option<u64>,
    settle_mutate_ms: Option<u64>,
    settle_up_ms: Option<u64>,
    settle_restore_up_ms: Option<u64>,
    probe_timeout_secs: Option<u64>,
    adapter_subkey: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            backup_path: env::var_os("PHANTOM_MAC_BACKUP_PATH").map(PathBuf::from),
            log_level: env::var("PHANTOM_MAC_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string()),
            settle_down_ms: number_from_env("PHANTOM_MAC_SETTLE_DOWN_MS")?,
            settle_mutate_ms: number_from_env("PHANTOM_MAC_SETTLE_MUTATE_MS")?,
            settle_up_ms: number_from_env("PHANTOM_MAC_SETTLE_UP_MS")?,
            settle_restore_up_ms: number_from_env("PHANTOM_MAC_SETTLE_RESTORE_UP_MS")?,
            probe_timeout_secs: number_from_env("PHANTOM_MAC_PROBE_TIMEOUT_SECS")?,
            adapter_subkey: env::var("PHANTOM_MAC_ADAPTER_SUBKEY")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }

    /// Validate the log level
    fn validate(&self) -> Result<()> {
        self.tracing_level()?;
        Ok(())
    }

    fn tracing_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "PHANTOM_MAC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Overlay the environment onto the library defaults
    fn to_phantom_config(&self) -> Result<PhantomConfig> {
        let mut config = PhantomConfig::new();

        if let Some(path) = &self.backup_path {
            config.backup.path = path.clone();
        }

        let settle = &mut config.orchestrator.settle;
        if let Some(ms) = self.settle_down_ms {
            settle.after_down_ms = ms;
        }
        if let Some(ms) = self.settle_mutate_ms {
            settle.after_mutation_ms = ms;
        }
        if let Some(ms) = self.settle_up_ms {
            settle.after_up_ms = ms;
        }
        if let Some(ms) = self.settle_restore_up_ms {
            settle.restore_after_up_ms = ms;
        }
        if let Some(secs) = self.probe_timeout_secs {
            config.orchestrator.probe_timeout_secs = secs;
        }
        config.platform.adapter_subkey = self.adapter_subkey.clone();

        config.validate()?;
        Ok(config)
    }
}

fn number_from_env(name: &str) -> Result<Option<u64>> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a non-negative integer. Got: {}", name, value)),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    // Bare invocation prints usage and succeeds
    if env::args_os().len() <= 1 {
        println!("{}", Cli::usage());
        return ExitStatus::Success.into();
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitStatus::UsageError
            } else {
                ExitStatus::Success
            }
            .into();
        }
    };

    let Some(interface) = cli.interface.clone() else {
        eprintln!("Error: Interface is required! Use -i or --interface\n");
        eprintln!("{}", Cli::usage());
        return ExitStatus::UsageError.into();
    };

    // Load configuration from environment
    let env_config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitStatus::StartupError.into();
        }
    };

    if let Err(e) = env_config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return ExitStatus::StartupError.into();
    }

    let config = match env_config.to_phantom_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return ExitStatus::StartupError.into();
        }
    };

    // Initialize tracing; stdout is reserved for results and prompts
    let log_level = env_config.tracing_level().unwrap_or(Level::WARN);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitStatus::StartupError.into();
    }

    debug!("Backup file: {}", config.backup.path.display());

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExitStatus::StartupError.into();
        }
    };

    rt.block_on(run(cli.action(), &interface, config)).into()
}

/// Select the controller and run the requested action
async fn run(action: Action, interface: &str, config: PhantomConfig) -> ExitStatus {
    let registry = ControllerRegistry::new();
    phantom_mac_platform::register(&registry);
    debug!("Registered controllers: {:?}", registry.list_controllers());

    let controller = match registry.create_for_host(&config.platform) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitStatus::from(&e);
        }
    };
    info!("Using {} controller", controller.family());

    match action {
        Action::Show => show(controller, interface, config).await,
        Action::Mutate(mutation) => mutate(controller, mutation, interface, config).await,
    }
}

/// Print the current address; needs no privileges and no backup file
async fn show(
    controller: Box<dyn NetworkController>,
    interface: &str,
    config: PhantomConfig,
) -> ExitStatus {
    let orchestrator = ChangeOrchestrator::new(
        controller,
        Box::new(MemoryBackupStore::new()),
        Box::new(FixedConfirmation(false)),
        config.orchestrator,
    );
    let (orchestrator, _events) = match orchestrator {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitStatus::from(&e);
        }
    };

    match orchestrator.show_address(interface).await {
        Some(mac) => {
            println!("Current MAC address for {}: {}", interface, mac);
            ExitStatus::Success
        }
        None => {
            eprintln!("Error: Could not get MAC address for {}", interface);
            ExitStatus::OperationFailed
        }
    }
}

/// Change or restore behind the privilege gate
async fn mutate(
    controller: Box<dyn NetworkController>,
    mutation: Mutation,
    interface: &str,
    config: PhantomConfig,
) -> ExitStatus {
    if let Err(e) = require_privileges(controller.as_ref()).await {
        eprintln!("Error: {}", e);
        eprintln!("Please run with sudo (Linux/macOS) or as Administrator (Windows)");
        return ExitStatus::from(&e);
    }

    let store = FileBackupStore::open(&config.backup.path).await;
    let orchestrator = ChangeOrchestrator::new(
        controller,
        Box::new(store),
        Box::new(ConsoleConfirmation),
        config.orchestrator,
    );
    // Receiver stays alive so events are buffered rather than rejected
    let (orchestrator, _events) = match orchestrator {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitStatus::from(&e);
        }
    };

    let outcome = match mutation {
        Mutation::Change { mac } => orchestrator
            .change_address(interface, mac.as_deref())
            .await
            .map(|report| console::print_change(&report)),
        Mutation::Restore => orchestrator
            .restore_address(interface)
            .await
            .map(|report| console::print_restore(&report)),
    };

    match outcome {
        Ok(()) => ExitStatus::Success,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitStatus::from(&e)
        }
    }
}
