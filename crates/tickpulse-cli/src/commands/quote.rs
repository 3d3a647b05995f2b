use tickpulse_core::{Ticker, TradingDataService};

use crate::error::CliError;

use super::CommandResult;

pub async fn spread(
    ticker: &Ticker,
    service: &TradingDataService,
) -> Result<CommandResult, CliError> {
    CommandResult::from_metric(ticker, service.bid_ask_spread(ticker).await)
}

pub async fn imbalance(
    ticker: &Ticker,
    service: &TradingDataService,
) -> Result<CommandResult, CliError> {
    CommandResult::from_metric(ticker, service.order_imbalance(ticker).await)
}
