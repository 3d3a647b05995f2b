//! # Market Metrics Engine
//!
//! Pure functions turning already-fetched market snapshots into day-trading
//! signals. Nothing here performs I/O or keeps state between calls.
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`latest_bar_summary`] | `&[Bar]` | [`MetricOutcome<BarSummary>`] |
//! | [`aggregate_trade_summary`] | `&[Trade]` | [`MetricOutcome<TradeSummary>`] |
//! | [`spread_metric`] | `&Quote` | [`SpreadResult`] |
//! | [`imbalance_metric`] | `&Quote` | [`ImbalanceResult`] |
//! | [`momentum_metric`] | `&[Bar]` | [`MetricOutcome<MomentumResult>`] |
//! | [`snapshot_mover_summary`] | `&Snapshot` | [`MoverResult`] |
//! | [`dividend_summary`] | `&[Dividend]` | [`DividendResult`] |
//!
//! ## Degenerate inputs
//!
//! Empty or too-short sequences produce [`MetricOutcome::NoData`] or
//! [`MetricOutcome::InsufficientData`]. Zero denominators produce a
//! [`Ratio`] variant instead of a float fault:
//!
//! | Ratio | Zero denominator |
//! |-------|------------------|
//! | spread percentage (bid = 0) | [`Ratio::Undefined`] |
//! | momentum percentage (previous close = 0) | [`Ratio::Undefined`] |
//! | imbalance ratio (ask size = 0, bid size > 0) | [`Ratio::Unbounded`] |
//! | imbalance ratio (both sizes 0) | [`Ratio::Undefined`] |
//!
//! ```rust
//! use tickpulse_core::metrics::{spread_metric, Ratio};
//! use tickpulse_core::Quote;
//!
//! let quote = Quote::new(0.0, 1.25, 100, 200).expect("valid quote");
//! let spread = spread_metric(&quote);
//! assert_eq!(spread.spread_percentage, Ratio::Undefined);
//! ```

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::{Bar, Dividend, Quote, Snapshot, Ticker, Trade, TradeDate};

/// Bars needed to compare two consecutive closes.
pub const MOMENTUM_MIN_BARS: usize = 2;

/// Dividend records echoed by [`dividend_summary`].
pub const RECENT_DIVIDEND_LIMIT: usize = 5;

/// Result of a metric over a sequence that may be empty or too short.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutcome<T> {
    Computed(T),
    NoData,
    InsufficientData { required: usize, available: usize },
}

impl<T> MetricOutcome<T> {
    pub fn computed(self) -> Option<T> {
        match self {
            Self::Computed(value) => Some(value),
            Self::NoData | Self::InsufficientData { .. } => None,
        }
    }

    pub fn as_computed(&self) -> Option<&T> {
        match self {
            Self::Computed(value) => Some(value),
            Self::NoData | Self::InsufficientData { .. } => None,
        }
    }

    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> MetricOutcome<U> {
        match self {
            Self::Computed(value) => MetricOutcome::Computed(f(value)),
            Self::NoData => MetricOutcome::NoData,
            Self::InsufficientData {
                required,
                available,
            } => MetricOutcome::InsufficientData {
                required,
                available,
            },
        }
    }

    pub const fn status(&self) -> &'static str {
        match self {
            Self::Computed(_) => "computed",
            Self::NoData => "no_data",
            Self::InsufficientData { .. } => "insufficient_data",
        }
    }
}

impl<T: Serialize> Serialize for MetricOutcome<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Computed(value) => value.serialize(serializer),
            Self::NoData => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("status", self.status())?;
                map.end()
            }
            Self::InsufficientData {
                required,
                available,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("status", self.status())?;
                map.serialize_entry("required", required)?;
                map.serialize_entry("available", available)?;
                map.end()
            }
        }
    }
}

/// A quotient whose denominator may legitimately be zero.
///
/// Serializes as a JSON number, the string `"inf"`, or `null`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Finite(f64),
    /// Positive numerator over a zero denominator.
    Unbounded,
    /// No meaningful value (zero base, or 0/0).
    Undefined,
}

impl Ratio {
    /// `change / base * 100`, undefined when `base` is zero.
    pub fn percentage(change: f64, base: f64) -> Self {
        if base == 0.0 {
            return Self::Undefined;
        }
        Self::finite_or_undefined(change / base * 100.0)
    }

    /// `numerator / denominator` for non-negative quantities, unbounded when
    /// only the denominator is zero.
    pub fn of_sizes(numerator: u64, denominator: u64) -> Self {
        match (numerator, denominator) {
            (0, 0) => Self::Undefined,
            (_, 0) => Self::Unbounded,
            (numerator, denominator) => {
                Self::finite_or_undefined(numerator as f64 / denominator as f64)
            }
        }
    }

    /// `Some(f64::INFINITY)` for [`Ratio::Unbounded`], `None` when undefined.
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Self::Finite(value) => Some(value),
            Self::Unbounded => Some(f64::INFINITY),
            Self::Undefined => None,
        }
    }

    pub const fn is_defined(self) -> bool {
        !matches!(self, Self::Undefined)
    }

    fn finite_or_undefined(value: f64) -> Self {
        if value.is_finite() {
            Self::Finite(value)
        } else {
            Self::Undefined
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Finite(value) => serializer.serialize_f64(*value),
            Self::Unbounded => serializer.serialize_str("inf"),
            Self::Undefined => serializer.serialize_none(),
        }
    }
}

/// Direction of the close-to-close move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    /// Exact comparison against zero; no tolerance band is applied.
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Self::Up
        } else if change < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }
}

/// A metric labelled with the ticker it was computed for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetric<T> {
    pub ticker: Ticker,
    #[serde(flatten)]
    pub metric: T,
}

impl<T> DerivedMetric<T> {
    pub fn new(ticker: Ticker, metric: T) -> Self {
        Self { ticker, metric }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarSummary {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: Option<f64>,
    pub timestamp: i64,
}

impl From<&Bar> for BarSummary {
    fn from(bar: &Bar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            vwap: bar.vwap,
            timestamp: bar.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeSummary {
    pub total_volume: u64,
    /// Volume-weighted average trade price.
    pub avg_trade_price: f64,
    pub trade_count: usize,
    /// Price of the last trade in input order.
    pub latest_trade: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadResult {
    pub bid_price: f64,
    pub ask_price: f64,
    pub bid_size: u64,
    pub ask_size: u64,
    pub spread: f64,
    pub spread_percentage: Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImbalanceResult {
    pub bid_volume: u64,
    pub ask_volume: u64,
    pub imbalance: i64,
    pub imbalance_ratio: Ratio,
    pub excess_demand: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MomentumResult {
    pub current_close: f64,
    pub previous_close: f64,
    pub momentum: f64,
    pub momentum_percentage: Ratio,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MoverResult {
    /// Ask price of the snapshot's last quote.
    pub last_quote: Option<f64>,
    pub last_trade: Option<f64>,
    pub min_av: Option<f64>,
    pub prev_day_volume: Option<f64>,
    pub prev_day_change: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DividendEntry {
    pub amount: f64,
    pub date: Option<TradeDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendResult {
    pub dividend_count: usize,
    pub recent_dividends: Vec<DividendEntry>,
}

/// Re-exposes the last bar of a time-ordered (oldest first) sequence.
pub fn latest_bar_summary(bars: &[Bar]) -> MetricOutcome<BarSummary> {
    match bars.last() {
        Some(bar) => MetricOutcome::Computed(BarSummary::from(bar)),
        None => MetricOutcome::NoData,
    }
}

/// Total volume, VWAP, count and last price over a set of trade prints.
pub fn aggregate_trade_summary(trades: &[Trade]) -> MetricOutcome<TradeSummary> {
    let Some(last) = trades.last() else {
        return MetricOutcome::NoData;
    };

    let total_volume = trades
        .iter()
        .fold(0_u64, |acc, trade| acc.saturating_add(trade.size));
    // Zero-size prints can survive the emptiness check above.
    if total_volume == 0 {
        return MetricOutcome::NoData;
    }

    let notional = trades
        .iter()
        .map(|trade| trade.price * trade.size as f64)
        .sum::<f64>();

    MetricOutcome::Computed(TradeSummary {
        total_volume,
        avg_trade_price: notional / total_volume as f64,
        trade_count: trades.len(),
        latest_trade: last.price,
    })
}

pub fn spread_metric(quote: &Quote) -> SpreadResult {
    let spread = quote.ask_price - quote.bid_price;
    SpreadResult {
        bid_price: quote.bid_price,
        ask_price: quote.ask_price,
        bid_size: quote.bid_size,
        ask_size: quote.ask_size,
        spread,
        spread_percentage: Ratio::percentage(spread, quote.bid_price),
    }
}

pub fn imbalance_metric(quote: &Quote) -> ImbalanceResult {
    // Saturates at the i64 bounds without flipping sign.
    let difference = i128::from(quote.bid_size) - i128::from(quote.ask_size);
    let imbalance = i64::try_from(difference)
        .unwrap_or(if difference > 0 { i64::MAX } else { i64::MIN });

    ImbalanceResult {
        bid_volume: quote.bid_size,
        ask_volume: quote.ask_size,
        imbalance,
        imbalance_ratio: Ratio::of_sizes(quote.bid_size, quote.ask_size),
        excess_demand: imbalance > 0,
    }
}

/// Close-to-close change over the last two bars of the sequence.
pub fn momentum_metric(bars: &[Bar]) -> MetricOutcome<MomentumResult> {
    let [.., previous, current] = bars else {
        return MetricOutcome::InsufficientData {
            required: MOMENTUM_MIN_BARS,
            available: bars.len(),
        };
    };

    let momentum = current.close - previous.close;
    MetricOutcome::Computed(MomentumResult {
        current_close: current.close,
        previous_close: previous.close,
        momentum,
        momentum_percentage: Ratio::percentage(momentum, previous.close),
        trend: Trend::from_change(momentum),
    })
}

pub fn snapshot_mover_summary(snapshot: &Snapshot) -> MoverResult {
    MoverResult {
        last_quote: snapshot.last_quote.map(|quote| quote.ask_price),
        last_trade: snapshot.last_trade.map(|trade| trade.price),
        min_av: snapshot.min.map(|min| min.accumulated_volume),
        prev_day_volume: snapshot.prev_day.map(|prev| prev.volume),
        prev_day_change: snapshot.prev_day.map(|prev| prev.change),
    }
}

/// Count plus the first [`RECENT_DIVIDEND_LIMIT`] records in provider order.
///
/// Records are not re-sorted: they are "most recent" only if the provider
/// returned them newest first.
pub fn dividend_summary(dividends: &[Dividend]) -> DividendResult {
    DividendResult {
        dividend_count: dividends.len(),
        recent_dividends: dividends
            .iter()
            .take(RECENT_DIVIDEND_LIMIT)
            .map(|dividend| DividendEntry {
                amount: dividend.cash_amount,
                date: dividend.pay_date,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MinuteStats, PrevDayStats};

    fn bar_with_close(close: f64, timestamp: i64) -> Bar {
        Bar::new(close, close, close, close, 1_000.0, Some(close), timestamp).expect("valid bar")
    }

    #[test]
    fn latest_bar_summary_reports_last_element() {
        let bars = [
            bar_with_close(149.0, 1),
            Bar::new(150.0, 151.0, 149.0, 150.5, 1_000_000.0, Some(150.25), 1_703_123_456_789)
                .expect("valid bar"),
        ];

        let summary = latest_bar_summary(&bars).computed().expect("non-empty");
        assert_eq!(summary.open, 150.0);
        assert_eq!(summary.high, 151.0);
        assert_eq!(summary.low, 149.0);
        assert_eq!(summary.close, 150.5);
        assert_eq!(summary.volume, 1_000_000.0);
        assert_eq!(summary.vwap, Some(150.25));
        assert_eq!(summary.timestamp, 1_703_123_456_789);
    }

    #[test]
    fn latest_bar_summary_on_empty_is_no_data() {
        assert_eq!(latest_bar_summary(&[]), MetricOutcome::NoData);
    }

    #[test]
    fn trade_summary_weights_price_by_size() {
        let trades = [
            Trade::new(10.0, 100).expect("valid"),
            Trade::new(11.0, 300).expect("valid"),
        ];

        let summary = aggregate_trade_summary(&trades).computed().expect("has volume");
        assert_eq!(summary.total_volume, 400);
        assert!((summary.avg_trade_price - 10.75).abs() < 1e-12);
        assert_eq!(summary.trade_count, 2);
        assert_eq!(summary.latest_trade, 11.0);
    }

    #[test]
    fn trade_summary_with_only_zero_sizes_is_no_data() {
        let trades = [Trade::new(10.0, 0).expect("valid")];
        assert_eq!(aggregate_trade_summary(&trades), MetricOutcome::NoData);
    }

    #[test]
    fn spread_percentage_is_relative_to_bid() {
        let quote = Quote::new(100.0, 100.5, 3, 4).expect("valid");
        let spread = spread_metric(&quote);
        assert!((spread.spread - 0.5).abs() < 1e-12);
        let pct = spread.spread_percentage.as_f64().expect("defined");
        assert!((pct - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_bid_spread_percentage_is_undefined() {
        let quote = Quote::new(0.0, 0.5, 0, 4).expect("valid");
        assert_eq!(spread_metric(&quote).spread_percentage, Ratio::Undefined);
    }

    #[test]
    fn imbalance_with_empty_ask_is_unbounded() {
        let quote = Quote::new(10.0, 10.1, 500, 0).expect("valid");
        let result = imbalance_metric(&quote);
        assert_eq!(result.imbalance, 500);
        assert_eq!(result.imbalance_ratio, Ratio::Unbounded);
        assert_eq!(result.imbalance_ratio.as_f64(), Some(f64::INFINITY));
        assert!(result.excess_demand);
    }

    #[test]
    fn imbalance_with_empty_book_is_undefined() {
        let quote = Quote::new(10.0, 10.1, 0, 0).expect("valid");
        let result = imbalance_metric(&quote);
        assert_eq!(result.imbalance, 0);
        assert_eq!(result.imbalance_ratio, Ratio::Undefined);
        assert!(!result.excess_demand);
    }

    #[test]
    fn imbalance_sign_matches_excess_demand_at_size_extremes() {
        let quote = Quote::new(1.0, 1.1, u64::MAX, u64::MAX - 1).expect("valid");
        let nearly_even = imbalance_metric(&quote);
        assert_eq!(nearly_even.imbalance, 1);
        assert!(nearly_even.excess_demand);

        let bid_heavy = imbalance_metric(&Quote::new(1.0, 1.1, u64::MAX, 0).expect("valid"));
        assert_eq!(bid_heavy.imbalance, i64::MAX);
        assert!(bid_heavy.excess_demand);

        let ask_heavy = imbalance_metric(&Quote::new(1.0, 1.1, 0, u64::MAX).expect("valid"));
        assert_eq!(ask_heavy.imbalance, i64::MIN);
        assert!(!ask_heavy.excess_demand);
    }

    #[test]
    fn momentum_compares_last_two_closes() {
        let bars = [
            bar_with_close(90.0, 0),
            bar_with_close(100.0, 1),
            bar_with_close(105.0, 2),
        ];
        let result = momentum_metric(&bars).computed().expect("enough bars");
        assert_eq!(result.previous_close, 100.0);
        assert_eq!(result.current_close, 105.0);
        assert_eq!(result.momentum, 5.0);
        assert_eq!(result.momentum_percentage, Ratio::Finite(5.0));
        assert_eq!(result.trend, Trend::Up);
    }

    #[test]
    fn momentum_from_zero_close_has_undefined_percentage() {
        let bars = [bar_with_close(0.0, 0), bar_with_close(1.0, 1)];
        let result = momentum_metric(&bars).computed().expect("enough bars");
        assert_eq!(result.momentum_percentage, Ratio::Undefined);
        assert_eq!(result.trend, Trend::Up);
    }

    #[test]
    fn momentum_on_single_bar_is_insufficient() {
        let outcome = momentum_metric(&[bar_with_close(100.0, 0)]);
        assert_eq!(
            outcome,
            MetricOutcome::InsufficientData {
                required: 2,
                available: 1
            }
        );
    }

    #[test]
    fn mover_summary_reads_present_sub_objects() {
        let snapshot = Snapshot {
            last_quote: Some(Quote::new(189.9, 190.1, 2, 3).expect("valid")),
            last_trade: Some(Trade::new(190.0, 50).expect("valid")),
            min: Some(MinuteStats {
                accumulated_volume: 12_345.0,
            }),
            prev_day: Some(PrevDayStats {
                volume: 9_000.0,
                change: -1.5,
            }),
        };

        let result = snapshot_mover_summary(&snapshot);
        assert_eq!(result.last_quote, Some(190.1));
        assert_eq!(result.last_trade, Some(190.0));
        assert_eq!(result.min_av, Some(12_345.0));
        assert_eq!(result.prev_day_volume, Some(9_000.0));
        assert_eq!(result.prev_day_change, Some(-1.5));
    }

    #[test]
    fn mover_summary_of_empty_snapshot_is_all_none() {
        assert_eq!(
            snapshot_mover_summary(&Snapshot::default()),
            MoverResult::default()
        );
    }

    #[test]
    fn ratio_serializes_degenerate_variants() {
        let json = serde_json::to_value([Ratio::Finite(1.5), Ratio::Unbounded, Ratio::Undefined])
            .expect("serializable");
        assert_eq!(json, serde_json::json!([1.5, "inf", null]));
    }

    #[test]
    fn outcome_serializes_status_for_missing_data() {
        let no_data: MetricOutcome<BarSummary> = MetricOutcome::NoData;
        let json = serde_json::to_value(&no_data).expect("serializable");
        assert_eq!(json, serde_json::json!({ "status": "no_data" }));

        let short: MetricOutcome<MomentumResult> = MetricOutcome::InsufficientData {
            required: 2,
            available: 1,
        };
        let json = serde_json::to_value(&short).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({ "status": "insufficient_data", "required": 2, "available": 1 })
        );
    }

    #[test]
    fn derived_metric_flattens_fields_beside_ticker() {
        let ticker = Ticker::parse("AAPL").expect("valid");
        let quote = Quote::new(10.0, 10.2, 400, 100).expect("valid");
        let labelled = DerivedMetric::new(ticker, imbalance_metric(&quote));

        let json = serde_json::to_value(&labelled).expect("serializable");
        assert_eq!(json["ticker"], "AAPL");
        assert_eq!(json["imbalance"], 300);
        assert_eq!(json["imbalance_ratio"], 4.0);
        assert_eq!(json["excess_demand"], true);
    }
}
