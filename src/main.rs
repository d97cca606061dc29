// src/main.rs

use std::process::ExitCode;

use tickd::types::EXIT_CODE_ERROR;
use tickd::{cli, run};

fn main() -> ExitCode {
    let args = cli::parse();
    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            tracing::error!("{err}");
            eprintln!("tickd error: {err}");
            ExitCode::from(EXIT_CODE_ERROR)
        }
    }
}
