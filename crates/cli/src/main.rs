//! Benchmark history CLI entry point.

use bench_history_core::ValidationErrors;
use colored::Colorize;

fn main() {
    if let Err(e) = bench_history_cli::run() {
        match e.downcast_ref::<ValidationErrors>() {
            Some(errors) => {
                eprintln!("{} invalid entry", "Error:".red().bold());
                for violation in &errors.violations {
                    eprintln!("  {}", violation);
                }
            }
            None => eprintln!("{} {:#}", "Error:".red().bold(), e),
        }
        std::process::exit(bench_history_cli::exit_code(&e));
    }
}
