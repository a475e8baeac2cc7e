use clap::Parser;
use std::io::BufWriter;
use std::sync::atomic::Ordering;

use bro_awk::args::validate_cli_args;
use bro_awk::config::{format_error_message, BroAwkConfig};
use bro_awk::filters::FilterSet;
use bro_awk::platform::{ExitCode, SafeStderr, SafeStdout, SignalHandler, TERMINATED_BY_SIGNAL};
use bro_awk::runner::run_files;
use bro_awk::Cli;

/// Output buffer in front of stdout; chunk outputs are written whole
const STDOUT_BUFFER_SIZE: usize = 64 * 1024;

fn main() {
    // Initialize signal handling early
    let _signal_handler = match SignalHandler::new() {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!(
                "{}",
                format_error_message(&format!("Failed to initialize signal handling: {}", e))
            );
            ExitCode::GeneralError.exit();
        }
    };

    let mut stderr = SafeStderr::new();

    // clap reports its own parse errors and exits with status 2
    let cli = Cli::parse();

    // Argument shape problems are usage errors
    if let Err(e) = validate_cli_args(&cli) {
        stderr
            .writeln(&format_error_message(&e.to_string()))
            .unwrap_or(());
        ExitCode::InvalidUsage.exit();
    }

    let config = match BroAwkConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            stderr
                .writeln(&format_error_message(&format!("{:#}", e)))
                .unwrap_or(());
            ExitCode::GeneralError.exit();
        }
    };

    // Rules are parsed, and their regexes compiled, before any log is opened
    let filters = match FilterSet::parse(config.filter.rules.as_slice()) {
        Ok(filters) => filters,
        Err(e) => {
            stderr
                .writeln(&config.format_error_message(&format!("{:#}", e)))
                .unwrap_or(());
            ExitCode::InvalidUsage.exit();
        }
    };

    let mut output = BufWriter::with_capacity(STDOUT_BUFFER_SIZE, SafeStdout::new());
    let result = run_files(&config, &filters, &mut output);
    drop(output);

    match result {
        Ok(stats) => {
            if config.output.stats {
                stderr.writeln(&stats.format_stats()).unwrap_or(());
            }
        }
        Err(e) => {
            stderr
                .writeln(&config.format_error_message(&format!("{:#}", e)))
                .unwrap_or(());
            ExitCode::GeneralError.exit();
        }
    }

    if TERMINATED_BY_SIGNAL.load(Ordering::Relaxed) {
        ExitCode::SignalInt.exit();
    }
    ExitCode::Success.exit();
}
