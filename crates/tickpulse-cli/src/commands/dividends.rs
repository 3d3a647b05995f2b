use tickpulse_core::{Ticker, TradingDataService};

use crate::error::CliError;

use super::CommandResult;

pub async fn run(
    ticker: &Ticker,
    service: &TradingDataService,
) -> Result<CommandResult, CliError> {
    CommandResult::from_metric(ticker, service.corporate_actions(ticker).await)
}
