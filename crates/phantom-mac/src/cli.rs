//! Command-line arguments

use clap::{CommandFactory, Parser};

#[derive(Parser, Debug)]
#[command(name = "phantom-mac")]
#[command(version)]
#[command(about = "Change, show and restore the MAC address of a network interface")]
pub struct Cli {
    /// Network interface to operate on
    #[arg(short, long, value_name = "NAME")]
    pub interface: Option<String>,

    /// New MAC address (random if not specified)
    #[arg(short, long, value_name = "ADDR")]
    pub mac: Option<String>,

    /// Show the current MAC address
    #[arg(short, long)]
    pub show: bool,

    /// Restore the original MAC address
    #[arg(short, long, conflicts_with_all = ["mac", "show"])]
    pub restore: bool,
}

/// What the invocation asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Show,
    Mutate(Mutation),
}

/// Operations that need privileges and touch the interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Change { mac: Option<String> },
    Restore,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.show {
            Action::Show
        } else if self.restore {
            Action::Mutate(Mutation::Restore)
        } else {
            Action::Mutate(Mutation::Change {
                mac: self.mac.clone(),
            })
        }
    }

    /// Rendered help text
    pub fn usage() -> String {
        Self::command().render_help().to_string()
    }
}
