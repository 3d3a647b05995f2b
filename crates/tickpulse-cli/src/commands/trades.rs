use tickpulse_core::{Ticker, TradeDate, TradingDataService};

use crate::cli::TradesArgs;
use crate::error::CliError;

use super::CommandResult;

pub struct TradesQuery {
    ticker: Ticker,
    date: TradeDate,
}

impl TradesQuery {
    pub fn from_args(args: &TradesArgs) -> Result<Self, CliError> {
        Ok(Self {
            ticker: Ticker::parse(&args.ticker)?,
            date: TradeDate::parse(&args.date)?,
        })
    }
}

pub async fn run(
    query: &TradesQuery,
    service: &TradingDataService,
) -> Result<CommandResult, CliError> {
    let result = service.trade_volume_data(&query.ticker, query.date).await;
    CommandResult::from_metric(&query.ticker, result)
}
