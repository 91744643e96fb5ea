//! Offline replay of a complete trade history with round-trip checkpoints.

use super::fee::ExchangeRateLookup;
use super::position::Position;
use crate::domain::{Decimal, Market, Side, TimeMs, Trade, TradeId};
use crate::error::AccountingError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A trade index at which net inventory returned exactly to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub index: usize,
    pub trade_id: TradeId,
    pub time: TimeMs,
}

/// Replays one symbol's trade history through the position ledger.
///
/// Built per report and discarded afterwards.
#[derive(Debug, Clone)]
pub struct StockDistribution {
    position: Position,
    trades: Vec<Trade>,
    checkpoints: Vec<Checkpoint>,
    /// Independent running sum of signed quantities, checked against the ledger.
    running_quantity: Decimal,
    buy_volume: Decimal,
    sell_volume: Decimal,
}

impl StockDistribution {
    pub fn new(market: &Market) -> Self {
        Self {
            position: Position::new(market),
            trades: Vec::new(),
            checkpoints: Vec::new(),
            running_quantity: Decimal::zero(),
            buy_volume: Decimal::zero(),
            sell_volume: Decimal::zero(),
        }
    }

    pub fn with_exchange_rates(mut self, rates: Arc<dyn ExchangeRateLookup>) -> Self {
        self.position = self.position.with_exchange_rates(rates);
        self
    }

    /// Append time-ordered trades; returns the checkpoints they produced.
    ///
    /// The whole batch is validated before any trade is applied, so a
    /// rejected batch leaves the distribution untouched.
    pub fn add_trades(
        &mut self,
        trades: impl IntoIterator<Item = Trade>,
    ) -> Result<Vec<Checkpoint>, AccountingError> {
        let batch: Vec<Trade> = trades.into_iter().collect();
        self.validate(&batch)?;

        let mut found = Vec::new();
        for trade in batch {
            self.position.add_trade(&trade);
            self.running_quantity += trade.signed_quantity();
            if self.position.base != self.running_quantity {
                return Err(AccountingError::InvariantViolation(format!(
                    "ledger quantity {} diverged from replayed quantity {} at trade {}",
                    self.position.base,
                    self.running_quantity,
                    trade.key()
                )));
            }

            match trade.side {
                Side::Buy => self.buy_volume += trade.quantity,
                Side::Sell => self.sell_volume += trade.quantity,
            }

            let index = self.trades.len();
            if self.running_quantity.is_zero() {
                found.push(Checkpoint {
                    index,
                    trade_id: trade.id,
                    time: trade.time,
                });
            }
            self.trades.push(trade);
        }

        self.checkpoints.extend(found.iter().cloned());
        Ok(found)
    }

    fn validate(&self, batch: &[Trade]) -> Result<(), AccountingError> {
        let mut last_time = self.trades.last().map(|t| t.time);
        for trade in batch {
            if trade.symbol != self.position.symbol {
                return Err(AccountingError::SymbolMismatch {
                    key: trade.key(),
                    expected: self.position.symbol.clone(),
                    actual: trade.symbol.clone(),
                });
            }
            let reason = if !trade.quantity.is_positive() {
                Some("quantity must be positive")
            } else if trade.price.is_negative() {
                Some("price must not be negative")
            } else if trade.fee.is_negative() {
                Some("fee must not be negative")
            } else if last_time.map_or(false, |last| trade.time < last) {
                Some("trade is out of chronological order")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(AccountingError::InvalidTrade {
                    key: trade.key(),
                    reason: reason.to_string(),
                });
            }
            last_time = Some(trade.time);
        }
        Ok(())
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Net inventory still open.
    pub fn stock(&self) -> Decimal {
        self.position.base
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn buy_volume(&self) -> Decimal {
        self.buy_volume
    }

    pub fn sell_volume(&self) -> Decimal {
        self.sell_volume
    }
}
