//! Collaborator capabilities consumed by the ledger: trade history queries and
//! live trade streams.

use crate::domain::{sort_trades, Symbol, TimeMs, Trade, TradeId};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

pub mod csv_file;
pub mod mock;

pub use csv_file::CsvTradeHistory;
pub use mock::{MockTradeHistory, MockTradeStream};

/// Options for a trade history query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeQueryOptions {
    /// Inclusive lower bound on trade time.
    pub start_time: Option<TimeMs>,
    /// Inclusive upper bound on trade time.
    pub end_time: Option<TimeMs>,
    /// Only trades with an id greater than this one.
    pub last_trade_id: Option<TradeId>,
    /// Maximum number of trades returned.
    pub limit: Option<usize>,
}

impl TradeQueryOptions {
    pub fn since(start_time: TimeMs) -> Self {
        Self {
            start_time: Some(start_time),
            ..Default::default()
        }
    }

    /// Reject windows whose start lies after their end.
    pub fn validate(&self) -> Result<(), QueryError> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if start > end => Err(QueryError::InvalidRequest(format!(
                "start time {} is after end time {}",
                start, end
            ))),
            _ => Ok(()),
        }
    }

    /// Whether a trade falls inside this query's window and cursor.
    pub fn matches(&self, trade: &Trade) -> bool {
        self.start_time.map_or(true, |start| trade.time >= start)
            && self.end_time.map_or(true, |end| trade.time <= end)
            && self.last_trade_id.map_or(true, |last| trade.id > last)
    }
}

/// Apply symbol filter, query window, deterministic ordering, key dedup and
/// limit to a raw set of trades. Shared by the in-process history sources.
pub(crate) fn select_trades(
    trades: impl IntoIterator<Item = Trade>,
    symbol: &Symbol,
    options: &TradeQueryOptions,
) -> Vec<Trade> {
    let mut selected: Vec<Trade> = trades
        .into_iter()
        .filter(|t| &t.symbol == symbol && options.matches(t))
        .collect();
    sort_trades(&mut selected);

    let mut seen = HashSet::new();
    selected.retain(|t| seen.insert(t.key()));

    if let Some(limit) = options.limit {
        selected.truncate(limit);
    }
    selected
}

/// Trade history query capability.
///
/// Implementations handle pagination internally and return a complete,
/// time-ordered, deduplicated sequence, or fail as a whole.
#[async_trait]
pub trait TradeHistoryService: Send + Sync + fmt::Debug {
    async fn query_trades(
        &self,
        symbol: &Symbol,
        options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, QueryError>;
}

/// Handler invoked once per incoming trade event.
pub type TradeHandler = Arc<dyn Fn(Trade) -> BoxFuture<'static, ()> + Send + Sync>;

/// Stream subscription capability.
pub trait TradeStream: Send + Sync {
    /// Register a handler for every subsequent trade update.
    fn on_trade_update(&self, handler: TradeHandler);
}

/// Error type for collaborator queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (malformed response or record)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// The request itself is malformed (e.g., inverted time window)
    InvalidRequest(String),
    /// Other error
    Other(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            QueryError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            QueryError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            QueryError::RateLimited => write!(f, "Rate limited"),
            QueryError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            QueryError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {}
