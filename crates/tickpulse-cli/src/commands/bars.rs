use tickpulse_core::{BarWindow, Ticker, TradingDataService};

use crate::cli::BarsArgs;
use crate::error::CliError;

use super::{parse_window, CommandResult};

pub struct BarsQuery {
    ticker: Ticker,
    window: BarWindow,
}

impl BarsQuery {
    pub fn from_args(args: &BarsArgs) -> Result<Self, CliError> {
        Ok(Self {
            ticker: Ticker::parse(&args.ticker)?,
            window: parse_window(&args.window)?,
        })
    }
}

pub async fn intraday(
    query: &BarsQuery,
    service: &TradingDataService,
) -> Result<CommandResult, CliError> {
    let BarsQuery { ticker, window } = query;
    CommandResult::from_metric(ticker, service.intraday_data(ticker, window).await)
}

pub async fn momentum(
    query: &BarsQuery,
    service: &TradingDataService,
) -> Result<CommandResult, CliError> {
    let BarsQuery { ticker, window } = query;

    let result = service.ohlc_momentum(ticker, window).await;
    let short_window = result
        .as_ref()
        .is_ok_and(|labelled| !labelled.metric.is_computed());

    let command = CommandResult::from_metric(ticker, result)?;
    if short_window {
        return Ok(command.with_warning(format!(
            "fewer than two bars between {} and {}; widen the window for momentum",
            window.from, window.to
        )));
    }
    Ok(command)
}
