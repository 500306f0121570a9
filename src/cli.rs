use std::path::PathBuf;

use clap::Parser;

use crate::statements::DEFAULT_BATCH_SIZE;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load a spreadsheet worksheet into a warehouse table as JSON rows",
    long_about = None
)]
pub struct Cli {
    /// Destination schema
    #[arg(long)]
    pub schema: String,
    /// Destination table (replaced on every run)
    #[arg(long)]
    pub table: String,
    /// Hosted spreadsheet ID, or the path of a local workbook/CSV file
    #[arg(long)]
    pub sheet: String,
    /// Worksheet title (defaults to the first worksheet)
    #[arg(long)]
    pub worksheet: Option<String>,
    /// JSON object mapping column keys to int, float, date or datetime
    #[arg(long)]
    pub coercions: Option<String>,
    /// Warehouse connection config (defaults to ./db.json)
    #[arg(long = "db-config")]
    pub db_config: Option<PathBuf>,
    /// Credentials file for hosted sheets (defaults to ./service-account.json)
    #[arg(long = "service-account-file")]
    pub service_account_file: Option<PathBuf>,
    /// Print each statement before it runs
    #[arg(long)]
    pub verbose: bool,
    /// Build statements without executing them
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Maximum rows per insert statement
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    pub batch_size: usize,
    /// Read ambiguous numeric dates as day/month/year
    #[arg(long = "day-first")]
    pub day_first: bool,
    /// Parse dates with exactly this chrono format instead of guessing
    #[arg(long = "date-format")]
    pub date_format: Option<String>,
    /// Character encoding of local CSV sheets (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_batch_size(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("Batch size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(err) => Err(format!("Invalid batch size '{value}': {err}")),
    }
}
