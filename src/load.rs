//! End-to-end load of one worksheet.
//!
//! [`load_sheet()`] reads the database config, fetches the worksheet, builds
//! records and statements, then prints and/or executes the statements in
//! order. All inputs arrive through [`LoadOptions`]; defaults that depend on
//! the working directory are resolved once when the options are built.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    cli::Cli,
    coerce::CoercionSpec,
    dates::{DateOrder, DateParser, FlexibleDateParser, StrictDateParser},
    error::Result,
    records::build_records,
    source::{DEFAULT_CREDENTIALS_FILE, SheetAuth, SheetSource, WorksheetSelector},
    statements::{DEFAULT_BATCH_SIZE, LoadTarget, StatementPlan, plan_statements},
    warehouse::{Connector, DEFAULT_DB_CONFIG_FILE, DbConfig, Session},
};

/// How date-like cells are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParsing {
    Flexible(DateOrder),
    Strict(String),
}

impl Default for DateParsing {
    fn default() -> Self {
        DateParsing::Flexible(DateOrder::default())
    }
}

impl DateParsing {
    pub fn parser(&self) -> Box<dyn DateParser> {
        match self {
            DateParsing::Flexible(order) => Box::new(FlexibleDateParser::new(*order)),
            DateParsing::Strict(format) => Box::new(StrictDateParser::new(format.clone())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub target: LoadTarget,
    pub sheet_id: String,
    pub worksheet: WorksheetSelector,
    pub coercions: Option<CoercionSpec>,
    pub db_config: PathBuf,
    pub auth: SheetAuth,
    pub verbose: bool,
    pub dry_run: bool,
    pub batch_size: usize,
    pub dates: DateParsing,
    pub input_encoding: Option<String>,
}

impl LoadOptions {
    /// Options with every default resolved against `cwd`.
    pub fn new(target: LoadTarget, sheet_id: impl Into<String>, cwd: &Path) -> Self {
        Self {
            target,
            sheet_id: sheet_id.into(),
            worksheet: WorksheetSelector::default(),
            coercions: None,
            db_config: cwd.join(DEFAULT_DB_CONFIG_FILE),
            auth: SheetAuth::new(cwd.join(DEFAULT_CREDENTIALS_FILE)),
            verbose: false,
            dry_run: false,
            batch_size: DEFAULT_BATCH_SIZE,
            dates: DateParsing::default(),
            input_encoding: None,
        }
    }

    pub fn from_cli(cli: &Cli, cwd: &Path) -> Result<Self> {
        let mut options = Self::new(
            LoadTarget::new(&cli.schema, &cli.table),
            &cli.sheet,
            cwd,
        );
        options.worksheet = WorksheetSelector::from_title(cli.worksheet.as_deref());
        options.coercions = cli
            .coercions
            .as_deref()
            .map(CoercionSpec::from_json)
            .transpose()?;
        if let Some(path) = &cli.db_config {
            options.db_config = cwd.join(path);
        }
        if let Some(path) = &cli.service_account_file {
            options.auth = SheetAuth::new(cwd.join(path));
        }
        options.verbose = cli.verbose;
        options.dry_run = cli.dry_run;
        options.batch_size = cli.batch_size;
        options.dates = match &cli.date_format {
            Some(format) => DateParsing::Strict(format.clone()),
            None if cli.day_first => DateParsing::Flexible(DateOrder::DayFirst),
            None => DateParsing::Flexible(DateOrder::MonthFirst),
        };
        options.input_encoding = cli.input_encoding.clone();
        Ok(options)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub title: String,
    pub records: usize,
    pub statements: usize,
    pub executed: usize,
}

pub fn load_sheet<S, C>(
    options: &LoadOptions,
    source: &S,
    connector: &C,
    out: &mut dyn Write,
) -> Result<LoadSummary>
where
    S: SheetSource + ?Sized,
    C: Connector,
{
    let config = DbConfig::load(&options.db_config)?;
    debug!(
        "Loaded {} connection parameter(s) from {:?}",
        config.params().len(),
        options.db_config
    );
    if let Some(spec) = &options.coercions {
        debug!("Coercions: {spec:?}");
    }

    let payload = source.fetch(&options.sheet_id, &options.worksheet)?;
    let dates = options.dates.parser();
    let records = build_records(payload, options.coercions.as_ref(), dates.as_ref())?;
    let plan = plan_statements(&options.target, &records, options.batch_size)?;
    info!(
        "Prepared {} statement(s) for {} record(s) from '{}' into {}",
        plan.statements().count(),
        records.len(),
        records.title,
        options.target
    );

    let executed = if options.dry_run {
        if options.verbose {
            for statement in plan.statements() {
                writeln!(out, "{statement}")?;
            }
        }
        0
    } else {
        let mut session = connector.connect(&config)?;
        let outcome = execute_plan(&mut session, &plan, options.verbose, out);
        let closed = session.close();
        let executed = outcome?;
        closed?;
        executed
    };

    Ok(LoadSummary {
        title: records.title,
        records: records.data.len(),
        statements: plan.statements().count(),
        executed,
    })
}

fn execute_plan<T: Session>(
    session: &mut T,
    plan: &StatementPlan,
    verbose: bool,
    out: &mut dyn Write,
) -> Result<usize> {
    let mut executed = 0;
    for statement in plan.statements() {
        if verbose {
            writeln!(out, "{statement}")?;
        }
        session.execute(statement)?;
        executed += 1;
        debug!("Executed statement {executed}");
    }
    Ok(executed)
}
