//! Staging buffer for trades whose order is not known yet.

use crate::domain::{Symbol, Trade, TradeKey};
use std::collections::BTreeMap;
use tracing::debug;

/// Pending trades of one symbol, keyed by trade key.
///
/// Owned by the collector's processing loop, so it needs no locking.
#[derive(Debug, Clone)]
pub struct TradeStore {
    symbol: Symbol,
    trades: BTreeMap<TradeKey, Trade>,
}

impl TradeStore {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            trades: BTreeMap::new(),
        }
    }

    /// Insert or overwrite by key. Trades of other symbols are ignored.
    pub fn add(&mut self, trade: Trade) {
        if trade.symbol != self.symbol {
            debug!(
                trade = %trade.key(),
                store_symbol = %self.symbol,
                "ignoring trade for another symbol"
            );
            return;
        }
        self.trades.insert(trade.key(), trade);
    }

    /// Single pass over all buffered trades; every trade for which `predicate`
    /// returns true is removed. Visits trades in key order.
    pub fn filter<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&Trade) -> bool,
    {
        self.trades.retain(|_, trade| !predicate(trade));
    }

    pub fn exists(&self, key: &TradeKey) -> bool {
        self.trades.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.trades.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.trades.clear();
    }
}
