//! Terminal interaction: restore confirmation and outcome reporting

use phantom_mac_core::traits::{Confirmation, is_affirmative};
use phantom_mac_core::{ChangeReport, RestoreReport, Warning};
use std::io::{self, BufRead, Write};

/// Asks on stdout and reads one answer line from stdin
pub struct ConsoleConfirmation;

impl Confirmation for ConsoleConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if let Err(e) = io::stdout().flush() {
            tracing::warn!("Failed to write prompt: {}", e);
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_affirmative(&answer),
            Err(e) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }
}

pub fn print_change(report: &ChangeReport) {
    let previous = report
        .previous
        .map(|mac| mac.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let origin = if report.generated { " (random)" } else { "" };

    println!(
        "MAC address of {} changed: {} -> {}{}",
        report.interface, previous, report.new, origin
    );
    print_warnings(&report.warnings);
}

pub fn print_restore(report: &RestoreReport) {
    println!(
        "MAC address of {} restored to original: {}",
        report.interface, report.restored
    );
    print_warnings(&report.warnings);
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
}
