//! Stable trade ordering for deterministic replay.

use crate::domain::Trade;

/// Ordering: time -> trade id -> symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeOrderingKey {
    pub time_ms: i64,
    pub id: u64,
    pub symbol: String,
}

impl TradeOrderingKey {
    pub fn from_trade(trade: &Trade) -> Self {
        TradeOrderingKey {
            time_ms: trade.time.as_i64(),
            id: trade.id.0,
            symbol: trade.symbol.as_str().to_string(),
        }
    }
}

/// Sort trades deterministically (stable for equal keys).
pub fn sort_trades(trades: &mut [Trade]) {
    trades.sort_by_cached_key(TradeOrderingKey::from_trade);
}
