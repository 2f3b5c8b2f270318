// Output formatting for CLI

use colored::*;
use crate::signal::SigNum;

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print the forwarded signal set, one per line
pub fn print_signals(signals: &[SigNum]) {
    println!(
        "{}",
        format!("Forwarding {} signals:", signals.len()).bold()
    );
    for signal in signals {
        println!("  {:>2}  {}", signal.as_raw(), signal.to_string().cyan());
    }
}
