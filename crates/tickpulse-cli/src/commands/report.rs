use tickpulse_core::{
    BarWindow, EnvelopeError, Ticker, TradeDate, TradingDataService, TradingReport,
};
use tracing::warn;

use crate::cli::ReportArgs;
use crate::error::CliError;

use super::{parse_window, CommandResult};

/// Deduplicated tickers sharing one bar window and trade date.
pub struct ReportQuery {
    tickers: Vec<Ticker>,
    window: BarWindow,
    date: TradeDate,
    warnings: Vec<String>,
}

impl ReportQuery {
    pub fn from_args(args: &ReportArgs) -> Result<Self, CliError> {
        let window = parse_window(&args.window)?;
        let date = TradeDate::parse(&args.date)?;

        let mut tickers: Vec<Ticker> = Vec::with_capacity(args.tickers.len());
        let mut warnings = Vec::new();
        for raw in &args.tickers {
            let ticker = Ticker::parse(raw)?;
            if tickers.contains(&ticker) {
                warnings.push(format!("duplicate ticker '{ticker}' reported once"));
                continue;
            }
            tickers.push(ticker);
        }

        Ok(Self {
            tickers,
            window,
            date,
            warnings,
        })
    }
}

pub async fn run(
    query: ReportQuery,
    service: &TradingDataService,
) -> Result<CommandResult, CliError> {
    let ReportQuery {
        tickers,
        window,
        date,
        warnings,
    } = query;

    let handles = tickers
        .into_iter()
        .map(|ticker| {
            let service = service.clone();
            tokio::spawn(async move { service.full_report(&ticker, &window, date).await })
        })
        .collect::<Vec<_>>();

    let mut reports: Vec<TradingReport> = Vec::with_capacity(handles.len());
    for handle in handles {
        let report = handle
            .await
            .map_err(|error| CliError::Command(format!("report task failed: {error}")))?;
        reports.push(report);
    }

    let errors = reports.iter().flat_map(section_errors).collect::<Vec<_>>();
    if !errors.is_empty() {
        warn!(failed_sections = errors.len(), "report finished with failures");
    }

    let mut result = CommandResult::ok(serde_json::to_value(&reports)?).with_errors(errors);
    for warning in warnings {
        result = result.with_warning(warning);
    }
    Ok(result)
}

fn section_errors(report: &TradingReport) -> Vec<EnvelopeError> {
    report
        .failures()
        .into_iter()
        .map(|(section, error)| {
            EnvelopeError::from(error).with_context(format!("{}.{section}", report.ticker))
        })
        .collect()
}
