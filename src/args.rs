//! CLI argument processing module
//!
//! Positional arguments carry both the filter rules and the log files. They
//! are told apart by shape before anything is opened.

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cli::Cli;

const FILTER_PATTERN: &str = r"^\S+(?:=|!=|~|!~)\S+$";
const LOG_PATTERN: &str = r".*\.log(?:\.gz)?$";

static FILTER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(FILTER_PATTERN).expect("failed to compile filter argument regex"));
static LOG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(LOG_PATTERN).expect("failed to compile log argument regex"));

/// Positional arguments split into filter rules and log paths, order kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Positionals {
    pub rules: Vec<String>,
    pub files: Vec<String>,
}

/// Classify each positional argument as a filter rule or a log path.
/// Anything else is a usage error.
pub fn classify_positionals(args: &[String]) -> Result<Positionals> {
    let mut positionals = Positionals::default();
    for arg in args {
        if FILTER_REGEX.is_match(arg) {
            positionals.rules.push(arg.clone());
        } else if LOG_REGEX.is_match(arg) {
            positionals.files.push(arg.clone());
        } else {
            return Err(anyhow!(
                "unrecognized argument: {} (expected FIELDS<op>VALUES or a .log/.log.gz file)",
                arg
            ));
        }
    }
    Ok(positionals)
}

/// Validate CLI arguments for early error detection
pub fn validate_cli_args(cli: &Cli) -> Result<()> {
    let positionals = classify_positionals(&cli.args)?;

    if positionals.rules.is_empty() {
        return Err(anyhow!(
            "No filters specified. Use `bro-awk --help` for more info"
        ));
    }
    if positionals.files.is_empty() {
        return Err(anyhow!("No logs specified. Use `bro-awk --help` for more info"));
    }

    if cli.block_size == 0 {
        return Err(anyhow!("Block size must be greater than 0"));
    }
    if cli.queue_size == 0 {
        return Err(anyhow!("Queue size must be greater than 0"));
    }
    if cli.threads > 1000 {
        return Err(anyhow!("Thread count too high (max 1000)"));
    }

    if let Some(fields) = &cli.print_fields {
        if fields.iter().any(String::is_empty) {
            return Err(anyhow!("--print-fields has an empty field name"));
        }
    }

    Ok(())
}
