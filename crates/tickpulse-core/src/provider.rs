//! Market data provider contract and request types.
//!
//! [`MarketDataProvider`] is the seam between the metrics service and a
//! concrete vendor adapter. Tests substitute their own implementation.
//!
//! # Endpoints
//!
//! | Method | Request | Response |
//! |--------|---------|----------|
//! | [`aggregates`](MarketDataProvider::aggregates) | [`AggregatesRequest`] | `Vec<Bar>` |
//! | [`trades`](MarketDataProvider::trades) | [`TradesRequest`] | `Vec<Trade>` |
//! | [`last_quote`](MarketDataProvider::last_quote) | [`Ticker`] | [`Quote`] |
//! | [`snapshot`](MarketDataProvider::snapshot) | [`Ticker`] | [`Snapshot`] |
//! | [`dividends`](MarketDataProvider::dividends) | [`Ticker`] | `Vec<Dividend>` |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{Bar, Dividend, Quote, Snapshot, Ticker, Timespan, Trade, TradeDate};

/// Boxed future returned by provider calls.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Provider error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    InvalidRequest,
    Unauthorized,
    NotFound,
    RateLimited,
    Unavailable,
    /// Response body failed to decode or carried out-of-domain values.
    MalformedResponse,
    Internal,
}

/// Structured provider error surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unauthorized,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Unauthorized => "source.unauthorized",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::MalformedResponse => "source.malformed_response",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for the aggregate bars endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatesRequest {
    pub ticker: Ticker,
    pub multiplier: u32,
    pub timespan: Timespan,
    pub from: TradeDate,
    pub to: TradeDate,
}

impl AggregatesRequest {
    pub fn new(
        ticker: Ticker,
        multiplier: u32,
        timespan: Timespan,
        from: TradeDate,
        to: TradeDate,
    ) -> Result<Self, SourceError> {
        if multiplier == 0 {
            return Err(SourceError::invalid_request(
                "aggregates multiplier must be greater than zero",
            ));
        }
        if from > to {
            return Err(SourceError::invalid_request(format!(
                "aggregates range start {from} is after end {to}"
            )));
        }
        Ok(Self {
            ticker,
            multiplier,
            timespan,
            from,
            to,
        })
    }
}

/// Request payload for the trades endpoint: all prints on one session date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradesRequest {
    pub ticker: Ticker,
    pub date: TradeDate,
}

impl TradesRequest {
    pub fn new(ticker: Ticker, date: TradeDate) -> Self {
        Self { ticker, date }
    }
}

/// Market data source contract.
///
/// Implementations must be `Send + Sync`; the service shares one instance
/// across concurrent calls.
pub trait MarketDataProvider: Send + Sync {
    /// Short provider identifier, reported in envelope metadata.
    fn name(&self) -> &'static str;

    /// Time-ordered (oldest first) aggregate bars.
    fn aggregates<'a>(&'a self, req: AggregatesRequest) -> ProviderFuture<'a, Vec<Bar>>;

    fn trades<'a>(&'a self, req: TradesRequest) -> ProviderFuture<'a, Vec<Trade>>;

    /// Latest NBBO quote.
    ///
    /// # Errors
    ///
    /// Returns [`SourceErrorKind::NotFound`] when the provider has no quote
    /// for the ticker.
    fn last_quote<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, Quote>;

    fn snapshot<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, Snapshot>;

    /// Dividend records in provider order.
    fn dividends<'a>(&'a self, ticker: Ticker) -> ProviderFuture<'a, Vec<Dividend>>;
}
