//! planline - Dependency-aware task scheduling for project plans

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = planline::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
