use serde::{Deserialize, Serialize};

use crate::{TradeDate, ValidationError};

/// One aggregated OHLCV time bucket for one ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: Option<f64>,
    /// Bucket start, epoch milliseconds.
    pub timestamp: i64,
}

impl Bar {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        vwap: Option<f64>,
        timestamp: i64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        validate_non_negative("volume", volume)?;
        validate_optional_non_negative("vwap", vwap)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        Ok(Self {
            open,
            high,
            low,
            close,
            volume,
            vwap,
            timestamp,
        })
    }
}

/// One executed trade print.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub price: f64,
    pub size: u64,
}

impl Trade {
    pub fn new(price: f64, size: u64) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        Ok(Self { price, size })
    }
}

/// Top-of-book (NBBO) quote.
///
/// `bid_price <= ask_price` is expected but not enforced; crossed books are
/// passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid_price: f64,
    pub ask_price: f64,
    pub bid_size: u64,
    pub ask_size: u64,
}

impl Quote {
    pub fn new(
        bid_price: f64,
        ask_price: f64,
        bid_size: u64,
        ask_size: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("bid_price", bid_price)?;
        validate_non_negative("ask_price", ask_price)?;
        Ok(Self {
            bid_price,
            ask_price,
            bid_size,
            ask_size,
        })
    }
}

/// Cash dividend record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub cash_amount: f64,
    pub pay_date: Option<TradeDate>,
}

impl Dividend {
    pub fn new(cash_amount: f64, pay_date: Option<TradeDate>) -> Result<Self, ValidationError> {
        validate_non_negative("cash_amount", cash_amount)?;
        Ok(Self {
            cash_amount,
            pay_date,
        })
    }
}

/// Most recent minute bucket of a ticker snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinuteStats {
    /// Volume accumulated over the session up to this minute (Polygon `min.av`).
    pub accumulated_volume: f64,
}

/// Previous session statistics of a ticker snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrevDayStats {
    pub volume: f64,
    /// Net price move over the previous session (close minus open).
    pub change: f64,
}

/// Composite ticker snapshot; every sub-object may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub last_quote: Option<Quote>,
    pub last_trade: Option<Trade>,
    pub min: Option<MinuteStats>,
    pub prev_day: Option<PrevDayStats>,
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}
