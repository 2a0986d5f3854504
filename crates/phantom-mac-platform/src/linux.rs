//! Linux controller backed by iproute2 and ping

use crate::command::{self, CommandRunner, SystemCommandRunner};
use async_trait::async_trait;
use phantom_mac_core::traits::{HostFamily, NetworkController};
use phantom_mac_core::MacAddress;
use std::net::IpAddr;
use std::time::Duration;

/// Network controller for Linux hosts
pub struct LinuxController<R = SystemCommandRunner> {
    runner: R,
}

impl LinuxController {
    pub fn new() -> Self {
        Self::with_runner(SystemCommandRunner)
    }
}

impl Default for LinuxController {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> LinuxController<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    async fn ip_link_set(&self, interface: &str, setting: &[&str]) -> bool {
        let mut args = vec!["link", "set", interface];
        args.extend_from_slice(setting);
        command::succeeds(&self.runner, "ip", &args).await
    }
}

#[async_trait]
impl<R: CommandRunner> NetworkController for LinuxController<R> {
    fn family(&self) -> HostFamily {
        HostFamily::Linux
    }

    async fn check_privileges(&self) -> bool {
        crate::effective_user_is_root()
    }

    async fn current_address(&self, interface: &str) -> Option<MacAddress> {
        let output = command::stdout_of(&self.runner, "ip", &["link", "show", interface]).await?;
        parse_link_address(&output)
    }

    async fn set_interface_up(&self, interface: &str, up: bool) -> bool {
        self.ip_link_set(interface, &[if up { "up" } else { "down" }])
            .await
    }

    async fn set_address(&self, interface: &str, address: &MacAddress) -> bool {
        // iproute2 refuses to change the address of an up link on many drivers
        if !self.ip_link_set(interface, &["down"]).await {
            return false;
        }
        let address = address.to_string();
        let written = self.ip_link_set(interface, &["address", &address]).await;
        let up = self.ip_link_set(interface, &["up"]).await;
        written && up
    }

    async fn default_gateway(&self) -> Option<IpAddr> {
        let output = command::stdout_of(&self.runner, "ip", &["route", "show", "default"]).await?;
        parse_default_route(&output)
    }

    async fn test_connectivity(&self, host: IpAddr, timeout: Duration) -> bool {
        let secs = command::whole_secs(timeout).to_string();
        let host = host.to_string();
        command::ping(&self.runner, &["-c", "1", "-w", &secs, &host], timeout).await
    }
}

/// Address following `link/ether` in `ip link show` output
pub fn parse_link_address(output: &str) -> Option<MacAddress> {
    let mut tokens = output.split_whitespace();
    tokens.find(|t| *t == "link/ether")?;
    tokens.next()?.parse().ok()
}

/// Gateway following `via` on the first default route that has one
pub fn parse_default_route(output: &str) -> Option<IpAddr> {
    output
        .lines()
        .filter(|line| line.trim_start().starts_with("default"))
        .find_map(|line| {
            let mut tokens = line.split_whitespace();
            tokens.find(|t| *t == "via")?;
            tokens.next()?.parse().ok()
        })
}
