//! Provider-backed metric service.
//!
//! [`TradingDataService`] fetches market data through a
//! [`MarketDataProvider`] and runs the matching engine function, labelling
//! every result with its ticker. Provider failures are returned to the
//! caller unchanged.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use time::macros::date;
use tracing::{debug, info};

use crate::metrics::{
    aggregate_trade_summary, dividend_summary, imbalance_metric, latest_bar_summary,
    momentum_metric, snapshot_mover_summary, spread_metric, BarSummary, DerivedMetric,
    DividendResult, ImbalanceResult, MetricOutcome, MomentumResult, MoverResult, SpreadResult,
    TradeSummary,
};
use crate::provider::{AggregatesRequest, MarketDataProvider, SourceError, TradesRequest};
use crate::{Bar, Ticker, Timespan, TradeDate};

/// Aggregate bar range requested for intraday and momentum metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarWindow {
    pub multiplier: u32,
    pub timespan: Timespan,
    pub from: TradeDate,
    pub to: TradeDate,
}

impl BarWindow {
    pub fn new(multiplier: u32, timespan: Timespan, from: TradeDate, to: TradeDate) -> Self {
        Self {
            multiplier,
            timespan,
            from,
            to,
        }
    }

    pub fn request(&self, ticker: &Ticker) -> Result<AggregatesRequest, SourceError> {
        AggregatesRequest::new(
            ticker.clone(),
            self.multiplier,
            self.timespan,
            self.from,
            self.to,
        )
    }
}

impl Default for BarWindow {
    fn default() -> Self {
        Self::new(
            1,
            Timespan::Minute,
            TradeDate::from(date!(2024 - 12 - 20)),
            TradeDate::from(date!(2024 - 12 - 27)),
        )
    }
}

/// Session date used for trade prints when none is given.
pub fn default_trade_date() -> TradeDate {
    TradeDate::from(date!(2024 - 12 - 27))
}

/// Failure of one report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportError {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&SourceError> for ReportError {
    fn from(error: &SourceError) -> Self {
        Self {
            code: error.code(),
            message: error.message().to_owned(),
            retryable: error.retryable(),
        }
    }
}

/// One section of a [`TradingReport`]: the metric, or why it is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportSection<T> {
    Ready(T),
    Failed { error: ReportError },
}

impl<T> ReportSection<T> {
    fn from_result(result: Result<T, &SourceError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(error) => Self::Failed {
                error: ReportError::from(error),
            },
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ReportError> {
        match self {
            Self::Ready(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// Every metric for one ticker, computed from a single concurrent fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingReport {
    pub ticker: Ticker,
    pub intraday: ReportSection<MetricOutcome<BarSummary>>,
    pub trade_volume: ReportSection<MetricOutcome<TradeSummary>>,
    pub spread: ReportSection<SpreadResult>,
    pub imbalance: ReportSection<ImbalanceResult>,
    pub momentum: ReportSection<MetricOutcome<MomentumResult>>,
    pub mover: ReportSection<MoverResult>,
    pub dividends: ReportSection<DividendResult>,
}

impl TradingReport {
    /// Failed sections by name, in declaration order.
    pub fn failures(&self) -> Vec<(&'static str, &ReportError)> {
        [
            ("intraday", self.intraday.error()),
            ("trade_volume", self.trade_volume.error()),
            ("spread", self.spread.error()),
            ("imbalance", self.imbalance.error()),
            ("momentum", self.momentum.error()),
            ("mover", self.mover.error()),
            ("dividends", self.dividends.error()),
        ]
        .into_iter()
        .filter_map(|(section, error)| error.map(|error| (section, error)))
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failures().is_empty()
    }
}

#[derive(Clone)]
pub struct TradingDataService {
    provider: Arc<dyn MarketDataProvider>,
}

impl TradingDataService {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn intraday_data(
        &self,
        ticker: &Ticker,
        window: &BarWindow,
    ) -> Result<DerivedMetric<MetricOutcome<BarSummary>>, SourceError> {
        let bars = self.fetch_bars(ticker, window).await?;
        Ok(DerivedMetric::new(ticker.clone(), latest_bar_summary(&bars)))
    }

    pub async fn trade_volume_data(
        &self,
        ticker: &Ticker,
        date: TradeDate,
    ) -> Result<DerivedMetric<MetricOutcome<TradeSummary>>, SourceError> {
        let trades = self
            .provider
            .trades(TradesRequest::new(ticker.clone(), date))
            .await?;
        debug!(ticker = %ticker, count = trades.len(), "fetched trades");
        Ok(DerivedMetric::new(
            ticker.clone(),
            aggregate_trade_summary(&trades),
        ))
    }

    pub async fn bid_ask_spread(
        &self,
        ticker: &Ticker,
    ) -> Result<DerivedMetric<SpreadResult>, SourceError> {
        let quote = self.provider.last_quote(ticker.clone()).await?;
        Ok(DerivedMetric::new(ticker.clone(), spread_metric(&quote)))
    }

    pub async fn order_imbalance(
        &self,
        ticker: &Ticker,
    ) -> Result<DerivedMetric<ImbalanceResult>, SourceError> {
        let quote = self.provider.last_quote(ticker.clone()).await?;
        Ok(DerivedMetric::new(ticker.clone(), imbalance_metric(&quote)))
    }

    pub async fn ohlc_momentum(
        &self,
        ticker: &Ticker,
        window: &BarWindow,
    ) -> Result<DerivedMetric<MetricOutcome<MomentumResult>>, SourceError> {
        let bars = self.fetch_bars(ticker, window).await?;
        Ok(DerivedMetric::new(ticker.clone(), momentum_metric(&bars)))
    }

    pub async fn snapshot_mover_data(
        &self,
        ticker: &Ticker,
    ) -> Result<DerivedMetric<MoverResult>, SourceError> {
        let snapshot = self.provider.snapshot(ticker.clone()).await?;
        Ok(DerivedMetric::new(
            ticker.clone(),
            snapshot_mover_summary(&snapshot),
        ))
    }

    pub async fn corporate_actions(
        &self,
        ticker: &Ticker,
    ) -> Result<DerivedMetric<DividendResult>, SourceError> {
        let dividends = self.provider.dividends(ticker.clone()).await?;
        Ok(DerivedMetric::new(ticker.clone(), dividend_summary(&dividends)))
    }

    /// Fetches bars, trades, quote, snapshot and dividends concurrently and
    /// derives every metric. Bars feed both intraday and momentum; the quote
    /// feeds both spread and imbalance.
    pub async fn full_report(
        &self,
        ticker: &Ticker,
        window: &BarWindow,
        date: TradeDate,
    ) -> TradingReport {
        let started = Instant::now();
        let (bars, trades, quote, snapshot, dividends) = tokio::join!(
            self.fetch_bars(ticker, window),
            self.provider.trades(TradesRequest::new(ticker.clone(), date)),
            self.provider.last_quote(ticker.clone()),
            self.provider.snapshot(ticker.clone()),
            self.provider.dividends(ticker.clone()),
        );

        let report = TradingReport {
            ticker: ticker.clone(),
            intraday: ReportSection::from_result(bars.as_deref().map(latest_bar_summary)),
            trade_volume: ReportSection::from_result(
                trades.as_deref().map(aggregate_trade_summary),
            ),
            spread: ReportSection::from_result(quote.as_ref().map(spread_metric)),
            imbalance: ReportSection::from_result(quote.as_ref().map(imbalance_metric)),
            momentum: ReportSection::from_result(bars.as_deref().map(momentum_metric)),
            mover: ReportSection::from_result(snapshot.as_ref().map(snapshot_mover_summary)),
            dividends: ReportSection::from_result(dividends.as_deref().map(dividend_summary)),
        };

        info!(
            ticker = %ticker,
            failed_sections = report.failures().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "report complete"
        );
        report
    }

    async fn fetch_bars(
        &self,
        ticker: &Ticker,
        window: &BarWindow,
    ) -> Result<Vec<Bar>, SourceError> {
        let request = window.request(ticker)?;
        let bars = self.provider.aggregates(request).await?;
        debug!(ticker = %ticker, count = bars.len(), "fetched aggregate bars");
        Ok(bars)
    }
}
