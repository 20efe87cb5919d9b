//! jitbench - driver for the SUM speedup procedures
//!
//! Opens a session, calls `prepare()` then `measure()`, prints the ratio.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

mod cli;

use cli::{get_log_level, Cli, OutputFormat};
use jitbench_db::Session;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = get_log_level(cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                log_level
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
            ),
        )
        .init();

    let config = cli.bench_config().context("loading benchmark config")?;
    let (rows, cols) = config.shape();

    let mut session = Session::open(config)?;
    let status = session
        .execute("SELECT prepare()")
        .context("prepare() failed")?;
    let speedup = session
        .execute("SELECT measure() AS speedup")
        .context("measure() failed")?;
    session.commit()?;
    session.close();

    match cli.format {
        OutputFormat::Json => {
            let report = json!({
                "rows": rows,
                "cols": cols,
                "prepare_status": status,
                "speedup": speedup,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            println!("Grid: {rows} x {cols}");
            println!("prepare() -> {status}");
            println!("Speedup (reference / accelerated): {speedup}");
        }
    }

    Ok(())
}
