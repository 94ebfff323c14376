//! Subscriber setup: terminal output on stderr plus an optional log file.
//!
//! Command output echoed under [`OUTPUT_TARGET`] is already on the terminal,
//! so only the file layer records it, whatever the level filter says.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use releasetx_saga::OUTPUT_TARGET;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::{FilterExt, filter_fn};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::error::{CliError, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `verbose` when set. Events are appended to
/// `log_file` when one is given.
pub(crate) fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let terminal = fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_filter(
            level_filter(verbose).and(filter_fn(|meta| meta.target() != OUTPUT_TARGET)),
        );

    let file = log_file
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| CliError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })
        })
        .transpose()?
        .map(|file| {
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_filter(
                    level_filter(verbose).or(filter_fn(|meta| meta.target() == OUTPUT_TARGET)),
                )
        });

    tracing_subscriber::registry()
        .with(terminal)
        .with(file)
        .try_init()?;
    Ok(())
}

fn level_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}
