pub mod cli;
pub mod coerce;
pub mod data;
pub mod dates;
pub mod error;
pub mod io_utils;
pub mod keys;
pub mod load;
pub mod records;
pub mod rows;
pub mod source;
pub mod statements;
pub mod warehouse;

use std::{env, io, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::Cli,
    load::{LoadOptions, load_sheet},
    warehouse::SnowflakeConnector,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheetload", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let cwd = env::current_dir().context("Resolving working directory")?;
    let options = LoadOptions::from_cli(&cli, &cwd)?;
    debug!("Load options: {options:?}");

    let source = source::open_source(
        &options.sheet_id,
        &options.auth,
        options.input_encoding.as_deref(),
    )
    .with_context(|| format!("Opening sheet {:?}", options.sheet_id))?;
    let connector = SnowflakeConnector::new()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = load_sheet(&options, source.as_ref(), &connector, &mut out)
        .with_context(|| format!("Loading sheet {:?} into {}", options.sheet_id, options.target))?;

    if options.dry_run {
        info!(
            "Dry run: {} statement(s) for {} record(s) from '{}' were not executed",
            summary.statements, summary.records, summary.title
        );
    } else {
        info!(
            "Loaded {} record(s) from '{}' into {} with {} statement(s)",
            summary.records, summary.title, options.target, summary.executed
        );
    }
    Ok(())
}
