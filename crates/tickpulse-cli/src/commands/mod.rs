mod bars;
mod dividends;
mod quote;
mod report;
mod snapshot;
mod trades;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tickpulse_core::{
    BarWindow, Envelope, EnvelopeError, EnvelopeMeta, PolygonAdapter, PolygonConfig, SourceError,
    Ticker, Timespan, TradeDate, TradingDataService,
};
use tracing::debug;

use crate::cli::{Cli, Command, WindowArgs};
use crate::error::CliError;

use bars::BarsQuery;
use report::ReportQuery;
use trades::TradesQuery;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Metric on success; `null` data plus an envelope error otherwise.
    pub fn from_metric<T: Serialize>(
        ticker: &Ticker,
        result: Result<T, SourceError>,
    ) -> Result<Self, CliError> {
        match result {
            Ok(metric) => Ok(Self::ok(serde_json::to_value(metric)?)),
            Err(error) => Ok(Self::ok(Value::Null)
                .with_errors(vec![EnvelopeError::from(&error).with_context(ticker.as_str())])),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

/// A subcommand whose arguments have been validated; nothing is fetched yet.
enum Invocation {
    Intraday(BarsQuery),
    Momentum(BarsQuery),
    Trades(TradesQuery),
    Spread(Ticker),
    Imbalance(Ticker),
    Snapshot(Ticker),
    Dividends(Ticker),
    Report(ReportQuery),
}

impl Invocation {
    fn from_command(command: &Command) -> Result<Self, CliError> {
        Ok(match command {
            Command::Intraday(args) => Self::Intraday(BarsQuery::from_args(args)?),
            Command::Momentum(args) => Self::Momentum(BarsQuery::from_args(args)?),
            Command::Trades(args) => Self::Trades(TradesQuery::from_args(args)?),
            Command::Spread(args) => Self::Spread(Ticker::parse(&args.ticker)?),
            Command::Imbalance(args) => Self::Imbalance(Ticker::parse(&args.ticker)?),
            Command::Snapshot(args) => Self::Snapshot(Ticker::parse(&args.ticker)?),
            Command::Dividends(args) => Self::Dividends(Ticker::parse(&args.ticker)?),
            Command::Report(args) => Self::Report(ReportQuery::from_args(args)?),
        })
    }

    async fn execute(self, service: &TradingDataService) -> Result<CommandResult, CliError> {
        match self {
            Self::Intraday(query) => bars::intraday(&query, service).await,
            Self::Momentum(query) => bars::momentum(&query, service).await,
            Self::Trades(query) => trades::run(&query, service).await,
            Self::Spread(ticker) => quote::spread(&ticker, service).await,
            Self::Imbalance(ticker) => quote::imbalance(&ticker, service).await,
            Self::Snapshot(ticker) => snapshot::run(&ticker, service).await,
            Self::Dividends(ticker) => dividends::run(&ticker, service).await,
            Self::Report(query) => report::run(query, service).await,
        }
    }
}

/// Arguments are validated before configuration is loaded, so a bad ticker
/// exits as a usage error even when no API key is set.
pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let invocation = Invocation::from_command(&cli.command)?;
    let service = build_service(cli)?;
    let started = Instant::now();

    let command_result = invocation.execute(&service).await?;

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(service.provider_name(), latency_ms);
    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

fn build_service(cli: &Cli) -> Result<TradingDataService, CliError> {
    let mut config = match &cli.env_file {
        Some(path) => PolygonConfig::from_env_file(path)?,
        None => PolygonConfig::from_env()?,
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        if timeout_ms == 0 {
            return Err(CliError::Command(String::from(
                "--timeout-ms must be greater than zero",
            )));
        }
        config = config.with_timeout_ms(timeout_ms);
    }
    debug!(?config, "loaded polygon config");

    Ok(TradingDataService::new(Arc::new(
        PolygonAdapter::from_config(&config),
    )))
}

pub(crate) fn parse_window(args: &WindowArgs) -> Result<BarWindow, CliError> {
    if args.multiplier == 0 {
        return Err(CliError::Command(String::from(
            "--multiplier must be greater than zero",
        )));
    }

    let window = BarWindow::new(
        args.multiplier,
        Timespan::from_str(&args.timespan)?,
        TradeDate::parse(&args.from)?,
        TradeDate::parse(&args.to)?,
    );
    if window.from > window.to {
        return Err(CliError::Command(format!(
            "--from {} must not be after --to {}",
            window.from, window.to
        )));
    }
    Ok(window)
}
