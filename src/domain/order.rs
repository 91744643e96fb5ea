//! Locally-known order record.

use crate::domain::{Decimal, OrderId, Side, Symbol};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    /// Closed without (further) fills.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Rejected)
    }
}

/// An order submitted by (or learned about by) the trading desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub status: OrderStatus,
}

impl Order {
    pub fn new(id: OrderId, symbol: Symbol, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Order {
            id,
            symbol,
            side,
            quantity,
            price,
            status: OrderStatus::New,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }
}
