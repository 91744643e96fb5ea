//! In-memory collaborators for testing without an exchange.

use super::{select_trades, QueryError, TradeHandler, TradeHistoryService, TradeQueryOptions, TradeStream};
use crate::domain::{Symbol, Trade};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Trade history that serves a predefined set of trades.
#[derive(Debug, Default)]
pub struct MockTradeHistory {
    trades: Vec<Trade>,
    failure: Option<QueryError>,
    queries: AtomicUsize,
}

impl MockTradeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trade(mut self, trade: Trade) -> Self {
        self.trades.push(trade);
        self
    }

    pub fn with_trades(mut self, trades: Vec<Trade>) -> Self {
        self.trades.extend(trades);
        self
    }

    /// Make every query fail with `error`.
    pub fn with_failure(mut self, error: QueryError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of queries served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeHistoryService for MockTradeHistory {
    async fn query_trades(
        &self,
        symbol: &Symbol,
        options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, QueryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        options.validate()?;
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(select_trades(self.trades.iter().cloned(), symbol, options))
    }
}

/// Trade stream whose updates are pushed by the test.
#[derive(Default)]
pub struct MockTradeStream {
    handlers: Mutex<Vec<TradeHandler>>,
}

impl MockTradeStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one trade to every registered handler, in registration order.
    pub async fn push(&self, trade: Trade) {
        let handlers: Vec<TradeHandler> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler(trade.clone()).await;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl TradeStream for MockTradeStream {
    fn on_trade_update(&self, handler: TradeHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}
