//! Zamba CLI entry point.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use std::process::ExitCode;
use zamba::RunStatus;

fn main() -> ExitCode {
    match zamba::run() {
        Ok(RunStatus::Success) => ExitCode::SUCCESS,
        Ok(RunStatus::VideosFailed) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
