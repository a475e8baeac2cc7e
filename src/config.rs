use anyhow::Result;
use std::path::PathBuf;

use crate::args::classify_positionals;
use crate::cli::Cli;
use crate::decompression::{self, Decompressor};
use crate::filters::ValueMatch;
use crate::platform::SafeStderr;

/// Default bound of the chunk queue between reader and dispatcher
pub const DEFAULT_QUEUE_SIZE: usize = 10_000;

/// Resolved runtime configuration
#[derive(Debug, Clone, Default)]
pub struct BroAwkConfig {
    pub input: InputConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,
    pub verbose: u8,
}

/// Input configuration
#[derive(Debug, Clone, Default)]
pub struct InputConfig {
    pub files: Vec<String>,
    /// Set when at least one input is compressed
    pub decompressor: Option<Decompressor>,
}

/// Filter configuration
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub rules: Vec<String>,
    pub value_match: ValueMatch,
}

/// Output configuration
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    pub print_fields: Option<Vec<String>>,
    pub stats: bool,
}

/// Performance configuration
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    /// Parser pool size; 0 picks a default from the CPU count
    pub threads: usize,
    pub block_size: usize,
    pub queue_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            block_size: crate::chunker::DEFAULT_BLOCK_SIZE,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

impl BroAwkConfig {
    /// Create configuration from CLI arguments.
    ///
    /// Looks up a decompressor on `PATH` only when a `.gz` log was given and
    /// neither `--unzipper` nor `--builtin-gzip` is set.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let positionals = classify_positionals(&cli.args)?;
        let needs_decompressor = positionals
            .files
            .iter()
            .any(|file| decompression::is_compressed(file));

        let decompressor = if !needs_decompressor {
            None
        } else if cli.builtin_gzip {
            Some(Decompressor::Builtin)
        } else if let Some(program) = &cli.unzipper {
            Some(Decompressor::External(PathBuf::from(program)))
        } else {
            Some(Decompressor::External(decompression::find_decompressor()?))
        };

        Ok(Self {
            input: InputConfig {
                files: positionals.files,
                decompressor,
            },
            filter: FilterConfig {
                rules: positionals.rules,
                value_match: if cli.any_value {
                    ValueMatch::Any
                } else {
                    ValueMatch::All
                },
            },
            output: OutputConfig {
                print_fields: cli.print_fields.clone(),
                stats: cli.stats,
            },
            performance: PerformanceConfig {
                threads: cli.threads,
                block_size: cli.block_size,
                queue_size: cli.queue_size,
            },
            verbose: cli.verbose,
        })
    }

    /// Parser pool size, one less than the CPU count unless overridden
    pub fn effective_threads(&self) -> usize {
        if self.performance.threads == 0 {
            num_cpus::get().saturating_sub(1).max(1)
        } else {
            self.performance.threads
        }
    }

    pub fn format_error_message(&self, message: &str) -> String {
        format_error_message(message)
    }

    /// Print an `[INFO]` line when running with `-v`
    pub fn info(&self, message: &str) {
        if self.verbose >= 1 {
            SafeStderr::new()
                .writeln(&format!("[INFO] {}", message))
                .unwrap_or(());
        }
    }

    /// Print a `[DEBUG]` line when running with `-vv`
    pub fn debug(&self, message: &str) {
        if self.verbose >= 2 {
            SafeStderr::new()
                .writeln(&format!("[DEBUG] {}", message))
                .unwrap_or(());
        }
    }
}

/// Single-line diagnostic as printed on stderr before a failing exit
pub fn format_error_message(message: &str) -> String {
    format!("[ERROR] {}", message)
}
