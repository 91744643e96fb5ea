use crate::domain::{Symbol, TimeMs, TradeKey};
use thiserror::Error;

/// Failures of the offline accounting engine.
///
/// Live trade processing never fails; these only surface from report
/// generation over a supplied history.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountingError {
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: TimeMs, end: TimeMs },
    #[error("invalid trade {key}: {reason}")]
    InvalidTrade { key: TradeKey, reason: String },
    #[error("trade {key} belongs to {actual}, expected {expected}")]
    SymbolMismatch {
        key: TradeKey,
        expected: Symbol,
        actual: Symbol,
    },
    /// A logic fault in the ledger, not a recoverable condition.
    #[error("accounting invariant violated: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("trade queue closed")]
    QueueClosed,
    #[error("trade queue full")]
    QueueFull,
}
