//! Core contracts for tickpulse.
//!
//! This crate contains:
//! - Market data domain models and validation
//! - The pure metrics engine (spread, imbalance, momentum, trade VWAP, ...)
//! - The provider contract and the Polygon.io adapter
//! - The metric service, configuration, and response envelope

pub mod adapters;
pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod metrics;
pub mod provider;
pub mod service;

pub use adapters::PolygonAdapter;
pub use config::{ConfigError, PolygonConfig};
pub use domain::{
    Bar, Dividend, MinuteStats, PrevDayStats, Quote, Snapshot, Ticker, Timespan, Trade,
    TradeDate, UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::ValidationError;
pub use http_client::{
    BearerToken, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
};
pub use metrics::{DerivedMetric, MetricOutcome, Ratio, Trend};
pub use provider::{
    AggregatesRequest, MarketDataProvider, ProviderFuture, SourceError, SourceErrorKind,
    TradesRequest,
};
pub use service::{BarWindow, ReportError, ReportSection, TradingDataService, TradingReport};
