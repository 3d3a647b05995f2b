//! # Domain Models
//!
//! Caller-supplied market snapshots consumed by the metrics engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bar`] | OHLCV aggregate bucket with epoch-millisecond timestamp |
//! | [`Trade`] | Executed trade print (price, size) |
//! | [`Quote`] | NBBO top-of-book quote |
//! | [`Dividend`] | Cash dividend record |
//! | [`Snapshot`] | Composite ticker snapshot with optional sub-objects |
//! | [`Ticker`] | Validated Polygon ticker |
//! | [`TradeDate`] | `YYYY-MM-DD` calendar date |
//! | [`Timespan`] | Aggregate bar size unit |
//! | [`UtcDateTime`] | UTC envelope timestamp |
//!
//! Values are plain data: constructors validate finiteness and sign, but
//! every field stays public and the engine never mutates or retains them.

mod date;
mod models;
mod ticker;
mod timespan;
mod timestamp;

pub use date::TradeDate;
pub use models::{Bar, Dividend, MinuteStats, PrevDayStats, Quote, Snapshot, Trade};
pub use ticker::Ticker;
pub use timespan::Timespan;
pub use timestamp::UtcDateTime;
