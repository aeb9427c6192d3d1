//! lintel - language server bridging editors to an ESLint-style linter.
//!
//! Speaks LSP over stdio. stdout carries the protocol, so logs go to stderr
//! or to the file given with `--log-file`.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{stdin, stdout};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lintel_lsp::{CommandLinter, Server};

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "LINTEL_LOG";

#[derive(Parser, Debug)]
#[command(name = "lintel")]
#[command(about = "Language server bridging editors to an ESLint-style linter")]
#[command(version)]
struct Args {
    /// Communicate over stdin/stdout (the only transport; accepted for
    /// editors that always pass it)
    #[arg(long)]
    stdio: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("building log filter")?;

    if let Some(path) = log_file {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;

        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        tracing::info!(path = %path.display(), "logging initialized");
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(io::stderr))
        .with(env_filter)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), stdio = args.stdio, "starting");

    let server = Server::new(Arc::new(CommandLinter::new()));
    server
        .run(stdin(), stdout())
        .await
        .context("language server failed")?;

    tracing::info!("exiting");
    Ok(())
}
