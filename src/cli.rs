// src/cli.rs

use crate::core::dispatcher::Dispatcher;
use crate::core::output::Output;
use crate::core::router::Router;
use colored::*;
use std::env;
use std::io::{self, Write};
use std::process::ExitCode;

/// Process entry point for applications built on a [`Router`].
///
/// Sets up logging, dispatches `std::env::args()`, prints every output on its
/// own line to stdout and reports a failure on stderr with exit code 1.
pub fn run(dispatcher: &Dispatcher, router: &Router) -> ExitCode {
    // An embedding application may already have installed a logger.
    let _ = env_logger::try_init();

    let argv: Vec<String> = env::args().collect();
    log::debug!("Process arguments: {:?}", argv);

    match dispatcher.dispatch_argv(router, argv) {
        Ok(outputs) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = write_outputs(&mut stdout, &outputs) {
                eprintln!("{}: {}", "Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Writes one output per line.
pub fn write_outputs(out: &mut impl Write, outputs: &[Output]) -> io::Result<()> {
    for output in outputs {
        writeln!(out, "{output}")?;
    }
    out.flush()
}
