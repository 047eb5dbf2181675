//! Operation catalog command

use colored::*;
use remodel_core::domain::operation::OperationKind;

/// Print every operation kind with its aliases and availability
pub fn list_operations() {
    println!(
        "{}",
        format!("{} operation(s):", OperationKind::ALL.len()).bold()
    );
    println!();

    for kind in OperationKind::ALL {
        let status = if kind.is_placeholder() {
            "placeholder".dimmed()
        } else {
            "implemented".green()
        };

        println!("  {} {} [{}]", "▸".cyan(), kind.name().bold(), status);
        println!("    {}", kind.description());
        if !kind.aliases().is_empty() {
            println!("    Aliases: {}", kind.aliases().join(", ").dimmed());
        }
    }
}
