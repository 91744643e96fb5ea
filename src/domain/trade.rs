//! Trade type representing a single exchange execution (fill).

use crate::domain::{Currency, Decimal, OrderId, Side, Symbol, TimeMs, TradeId};
use serde::{Deserialize, Serialize};

/// Deduplication key for a trade: exchange trade id scoped by symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeKey {
    pub id: TradeId,
    pub symbol: Symbol,
}

impl std::fmt::Display for TradeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.symbol, self.id)
    }
}

/// A single trade fill. Created once at the exchange boundary and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Exchange trade id.
    pub id: TradeId,
    pub symbol: Symbol,
    /// Order this trade fulfills.
    pub order_id: OrderId,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    /// price * quantity.
    pub quote_quantity: Decimal,
    pub fee: Decimal,
    pub fee_currency: Currency,
    pub time: TimeMs,
    #[serde(default)]
    pub is_maker: bool,
}

impl Trade {
    /// Create a new Trade; the quote quantity is derived from price and quantity.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TradeId,
        symbol: Symbol,
        order_id: OrderId,
        side: Side,
        price: Decimal,
        quantity: Decimal,
        fee: Decimal,
        fee_currency: Currency,
        time: TimeMs,
    ) -> Self {
        Trade {
            id,
            symbol,
            order_id,
            side,
            price,
            quantity,
            quote_quantity: price * quantity,
            fee,
            fee_currency,
            time,
            is_maker: false,
        }
    }

    pub fn with_maker(mut self, is_maker: bool) -> Self {
        self.is_maker = is_maker;
        self
    }

    pub fn key(&self) -> TradeKey {
        TradeKey {
            id: self.id,
            symbol: self.symbol.clone(),
        }
    }

    /// Quantity signed by side: Buy = +quantity, Sell = -quantity.
    pub fn signed_quantity(&self) -> Decimal {
        match self.side {
            Side::Buy => self.quantity,
            Side::Sell => -self.quantity,
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "trade {} {} {} {} @ {} fee {} {} order {} at {}",
            self.id,
            self.symbol,
            self.side,
            self.quantity,
            self.price,
            self.fee,
            self.fee_currency,
            self.order_id,
            self.time
        )
    }
}
