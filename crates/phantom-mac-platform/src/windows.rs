//! Windows controller backed by netsh, reg, getmac and ipconfig
//!
//! Windows has no command that writes an adapter's hardware address
//! directly. The address is stored as the `NetworkAddress` value of the
//! adapter's key under the network adapter class, and the driver picks it
//! up the next time the adapter is enabled.

use crate::command::{self, CommandRunner, SystemCommandRunner};
use async_trait::async_trait;
use phantom_mac_core::traits::{HostFamily, NetworkController};
use phantom_mac_core::MacAddress;
use std::net::IpAddr;
use std::time::Duration;

/// Registry key holding one subkey per network adapter
pub const ADAPTER_CLASS_KEY: &str =
    r"HKEY_LOCAL_MACHINE\SYSTEM\CurrentControlSet\Control\Class\{4D36E972-E325-11CE-BFC1-08002BE10318}";

/// Registry key holding `{GUID}\Connection` entries named after each adapter
///
/// Unlike `getmac`, this still lists an adapter while it is disabled.
pub const CONNECTION_KEY: &str =
    r"HKEY_LOCAL_MACHINE\SYSTEM\CurrentControlSet\Control\Network\{4D36E972-E325-11CE-BFC1-08002BE10318}";

/// Subkey used when the adapter's own subkey cannot be found
pub const FALLBACK_SUBKEY: &str = "0000";

/// Network controller for Windows hosts
pub struct WindowsController<R = SystemCommandRunner> {
    runner: R,
    /// Adapter subkey that bypasses discovery
    adapter_subkey: Option<String>,
}

impl WindowsController {
    pub fn new(adapter_subkey: Option<String>) -> Self {
        Self::with_runner(SystemCommandRunner, adapter_subkey)
    }
}

impl<R: CommandRunner> WindowsController<R> {
    pub fn with_runner(runner: R, adapter_subkey: Option<String>) -> Self {
        Self {
            runner,
            adapter_subkey,
        }
    }

    /// Row of `getmac /v /fo csv` whose connection name is `interface`
    async fn getmac_row(&self, interface: &str) -> Option<GetmacRow> {
        let output = command::stdout_of(&self.runner, "getmac", &["/v", "/fo", "csv"]).await?;
        parse_getmac(&output, interface)
    }

    /// Adapter GUID from its connection name, falling back to `getmac`
    ///
    /// The adapter is already disabled when this runs, so the registry
    /// lookup comes first.
    async fn adapter_guid(&self, interface: &str) -> Option<String> {
        let connections = command::stdout_of(
            &self.runner,
            "reg",
            &["query", CONNECTION_KEY, "/s", "/f", interface, "/d", "/e"],
        )
        .await;

        if let Some(guid) = connections.and_then(|output| parse_connection_guid(&output, interface)) {
            return Some(guid);
        }

        self.getmac_row(interface).await.and_then(|r| r.transport_guid())
    }

    /// Find the class subkey whose NetCfgInstanceId matches the adapter
    async fn resolve_subkey(&self, interface: &str) -> String {
        if let Some(subkey) = &self.adapter_subkey {
            return subkey.clone();
        }

        let guid = match self.adapter_guid(interface).await {
            Some(guid) => guid,
            None => {
                tracing::warn!(
                    "No adapter GUID for {}; falling back to subkey {}",
                    interface,
                    FALLBACK_SUBKEY
                );
                return FALLBACK_SUBKEY.to_string();
            }
        };

        let query = command::stdout_of(
            &self.runner,
            "reg",
            &["query", ADAPTER_CLASS_KEY, "/s", "/f", &guid, "/d"],
        )
        .await;

        match query.and_then(|output| parse_subkey_for_guid(&output, &guid)) {
            Some(subkey) => {
                tracing::debug!("Adapter {} ({}) is subkey {}", interface, guid, subkey);
                subkey
            }
            None => {
                tracing::warn!(
                    "Adapter {} ({}) not found under the class key; falling back to subkey {}",
                    interface,
                    guid,
                    FALLBACK_SUBKEY
                );
                FALLBACK_SUBKEY.to_string()
            }
        }
    }
}

#[async_trait]
impl<R: CommandRunner> NetworkController for WindowsController<R> {
    fn family(&self) -> HostFamily {
        HostFamily::Windows
    }

    async fn check_privileges(&self) -> bool {
        // Only succeeds from an elevated prompt
        command::succeeds(&self.runner, "net", &["session"]).await
    }

    async fn current_address(&self, interface: &str) -> Option<MacAddress> {
        self.getmac_row(interface).await?.physical_address.parse().ok()
    }

    async fn set_interface_up(&self, interface: &str, up: bool) -> bool {
        let admin = if up { "admin=enable" } else { "admin=disable" };
        command::succeeds(
            &self.runner,
            "netsh",
            &["interface", "set", "interface", interface, admin],
        )
        .await
    }

    async fn set_address(&self, interface: &str, address: &MacAddress) -> bool {
        if !self.set_interface_up(interface, false).await {
            return false;
        }

        let key = format!(r"{}\{}", ADAPTER_CLASS_KEY, self.resolve_subkey(interface).await);
        let value = address.to_compact_upper();
        let written = command::succeeds(
            &self.runner,
            "reg",
            &[
                "add",
                &key,
                "/v",
                "NetworkAddress",
                "/t",
                "REG_SZ",
                "/d",
                &value,
                "/f",
            ],
        )
        .await;

        let enabled = self.set_interface_up(interface, true).await;
        written && enabled
    }

    async fn default_gateway(&self) -> Option<IpAddr> {
        let output = command::stdout_of(&self.runner, "ipconfig", &[]).await?;
        parse_ipconfig_gateway(&output)
    }

    async fn test_connectivity(&self, host: IpAddr, timeout: Duration) -> bool {
        let millis = timeout.as_millis().max(1).to_string();
        let host = host.to_string();
        command::ping(&self.runner, &["-n", "1", "-w", &millis, &host], timeout).await
    }
}

/// One adapter row of `getmac /v /fo csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetmacRow {
    pub connection_name: String,
    pub physical_address: String,
    pub transport_name: String,
}

impl GetmacRow {
    /// GUID from a transport name like `\Device\Tcpip_{GUID}`
    pub fn transport_guid(&self) -> Option<String> {
        let start = self.transport_name.find('{')?;
        let end = self.transport_name[start..].find('}')? + start;
        Some(self.transport_name[start..=end].to_string())
    }
}

/// Find the row for `interface` (connection name, case-insensitive)
pub fn parse_getmac(output: &str, interface: &str) -> Option<GetmacRow> {
    output.lines().find_map(|line| {
        let fields = split_csv_line(line);
        if fields.len() < 4 || !fields[0].eq_ignore_ascii_case(interface) {
            return None;
        }
        Some(GetmacRow {
            connection_name: fields[0].clone(),
            physical_address: fields[2].clone(),
            transport_name: fields[3].clone(),
        })
    })
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;

    for c in line.trim_end().chars() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Subkey name of the registry key that lists `guid` as NetCfgInstanceId
pub fn parse_subkey_for_guid(output: &str, guid: &str) -> Option<String> {
    let mut current_key: Option<&str> = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("HKEY_") {
            current_key = Some(trimmed);
            continue;
        }

        let mut columns = trimmed.split_whitespace();
        if columns.next() != Some("NetCfgInstanceId") {
            continue;
        }
        if columns.last().is_some_and(|value| value.eq_ignore_ascii_case(guid)) {
            let subkey = current_key?.rsplit('\\').next()?;
            if subkey.len() == 4 && subkey.chars().all(|c| c.is_ascii_digit()) {
                return Some(subkey.to_string());
            }
        }
    }

    None
}

/// GUID of the `...\{GUID}\Connection` key whose `Name` is `interface`
pub fn parse_connection_guid(output: &str, interface: &str) -> Option<String> {
    let mut current_key: Option<&str> = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("HKEY_") {
            current_key = Some(trimmed);
            continue;
        }

        let Some((label, value)) = trimmed.split_once("REG_SZ") else {
            continue;
        };
        if label.trim() != "Name" || !value.trim().eq_ignore_ascii_case(interface) {
            continue;
        }

        let mut components = current_key?.rsplit('\\');
        if components.next() != Some("Connection") {
            continue;
        }
        if let Some(guid) = components.next()
            && guid.starts_with('{')
            && guid.ends_with('}')
        {
            return Some(guid.to_string());
        }
    }

    None
}

/// First parseable address in the `Default Gateway` entries of `ipconfig`
///
/// Addresses can continue on following indented lines when an adapter
/// has both IPv6 and IPv4 gateways.
pub fn parse_ipconfig_gateway(output: &str) -> Option<IpAddr> {
    let mut in_gateway = false;

    for line in output.lines() {
        let value = match line.split_once(" :") {
            Some((label, value)) => {
                in_gateway = label.contains("Default Gateway");
                value.trim()
            }
            None if in_gateway && line.starts_with(char::is_whitespace) => line.trim(),
            None => {
                in_gateway = false;
                continue;
            }
        };

        if in_gateway && let Ok(ip) = value.parse::<IpAddr>() {
            return Some(ip);
        }
    }

    None
}
