//! CLI argument definitions for tickpulse.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `intraday` | Latest aggregate bar in a window |
//! | `momentum` | Close-to-close momentum over the last two bars |
//! | `trades` | Trade volume and VWAP for one session |
//! | `spread` | Bid/ask spread from the latest NBBO quote |
//! | `imbalance` | Order book imbalance from the latest NBBO quote |
//! | `snapshot` | Mover fields from the ticker snapshot |
//! | `dividends` | Dividend count and first five records |
//! | `report` | Every metric for one or more tickers |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings and errors as failures |
//! | `--timeout-ms` | from config | Request timeout in ms |
//! | `--env-file` | `.env` | Read settings from this file |
//! | `-v` | warn | Raise log verbosity (repeatable) |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Day-trading metrics from Polygon.io market data.
#[derive(Debug, Parser)]
#[command(
    name = "tickpulse",
    author,
    version,
    about = "Day-trading metrics from Polygon.io market data"
)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Request timeout in milliseconds; overrides POLYGON_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Load settings from this env file instead of ./.env.
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Increase log verbosity on stderr (-v info, -vv debug). RUST_LOG wins.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    Table,
    /// Single JSON object.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Latest aggregate bar for a ticker.
    ///
    ///   tickpulse intraday AAPL
    ///   tickpulse intraday AAPL --timespan hour --from 2024-12-02 --to 2024-12-06
    Intraday(BarsArgs),

    /// Momentum between the last two aggregate bars.
    Momentum(BarsArgs),

    /// Trade volume, VWAP and count for one session.
    ///
    ///   tickpulse trades AAPL --date 2024-12-27
    Trades(TradesArgs),

    /// Bid/ask spread from the latest NBBO quote.
    Spread(TickerArgs),

    /// Order imbalance from the latest NBBO quote.
    Imbalance(TickerArgs),

    /// Last quote, last trade and previous-day move from the snapshot.
    Snapshot(TickerArgs),

    /// Dividend history summary.
    Dividends(TickerArgs),

    /// Every metric for one or more tickers, fetched concurrently.
    ///
    ///   tickpulse report AAPL MSFT --pretty
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct TickerArgs {
    /// Polygon ticker (e.g. AAPL, BRK.B, X:BTCUSD).
    pub ticker: String,
}

/// Aggregate bar window shared by bar-based commands.
#[derive(Debug, Args)]
pub struct WindowArgs {
    /// Bars per bucket.
    #[arg(long, default_value_t = 1)]
    pub multiplier: u32,

    /// Bucket unit: second, minute, hour, day, week, month, quarter, year.
    #[arg(long, default_value = "minute")]
    pub timespan: String,

    /// First date of the window (YYYY-MM-DD).
    #[arg(long, default_value = "2024-12-20")]
    pub from: String,

    /// Last date of the window (YYYY-MM-DD).
    #[arg(long, default_value = "2024-12-27")]
    pub to: String,
}

#[derive(Debug, Args)]
pub struct BarsArgs {
    pub ticker: String,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Args)]
pub struct TradesArgs {
    pub ticker: String,

    /// Session date (YYYY-MM-DD).
    #[arg(long, default_value = "2024-12-27")]
    pub date: String,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    /// Session date for the trade summary (YYYY-MM-DD).
    #[arg(long, default_value = "2024-12-27")]
    pub date: String,
}
