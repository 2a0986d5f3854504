//! macOS controller backed by ifconfig, netstat and ping

use crate::command::{self, CommandRunner, SystemCommandRunner};
use async_trait::async_trait;
use phantom_mac_core::traits::{HostFamily, NetworkController};
use phantom_mac_core::MacAddress;
use std::net::IpAddr;
use std::time::Duration;

/// Network controller for macOS hosts
pub struct MacosController<R = SystemCommandRunner> {
    runner: R,
}

impl MacosController {
    pub fn new() -> Self {
        Self::with_runner(SystemCommandRunner)
    }
}

impl Default for MacosController {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> MacosController<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: CommandRunner> NetworkController for MacosController<R> {
    fn family(&self) -> HostFamily {
        HostFamily::Macos
    }

    async fn check_privileges(&self) -> bool {
        crate::effective_user_is_root()
    }

    async fn current_address(&self, interface: &str) -> Option<MacAddress> {
        let output = command::stdout_of(&self.runner, "ifconfig", &[interface]).await?;
        parse_ether_address(&output)
    }

    async fn set_interface_up(&self, interface: &str, up: bool) -> bool {
        let state = if up { "up" } else { "down" };
        command::succeeds(&self.runner, "ifconfig", &[interface, state]).await
    }

    async fn set_address(&self, interface: &str, address: &MacAddress) -> bool {
        let address = address.to_string();
        command::succeeds(&self.runner, "ifconfig", &[interface, "ether", &address]).await
    }

    async fn default_gateway(&self) -> Option<IpAddr> {
        let output = command::stdout_of(&self.runner, "netstat", &["-nr"]).await?;
        parse_netstat_default(&output)
    }

    async fn test_connectivity(&self, host: IpAddr, timeout: Duration) -> bool {
        let secs = command::whole_secs(timeout).to_string();
        let host = host.to_string();
        command::ping(&self.runner, &["-c", "1", "-t", &secs, &host], timeout).await
    }
}

/// Address following `ether` in `ifconfig <iface>` output
pub fn parse_ether_address(output: &str) -> Option<MacAddress> {
    let mut tokens = output.split_whitespace();
    tokens.find(|t| *t == "ether")?;
    tokens.next()?.parse().ok()
}

/// Second column of the first `default` row with a parseable gateway
pub fn parse_netstat_default(output: &str) -> Option<IpAddr> {
    output.lines().find_map(|line| {
        let mut columns = line.split_whitespace();
        if columns.next()? != "default" {
            return None;
        }
        columns.next()?.parse().ok()
    })
}
