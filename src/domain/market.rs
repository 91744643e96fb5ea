//! Market configuration: currencies and price/quantity precision of a symbol.

use crate::domain::{Currency, Symbol};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: Symbol,
    pub base_currency: Currency,
    pub quote_currency: Currency,
    /// Decimal places of a price.
    pub price_precision: u32,
    /// Decimal places of a quantity.
    pub volume_precision: u32,
}

impl Market {
    pub fn new(
        symbol: Symbol,
        base_currency: Currency,
        quote_currency: Currency,
        price_precision: u32,
        volume_precision: u32,
    ) -> Self {
        Market {
            symbol,
            base_currency,
            quote_currency,
            price_precision,
            volume_precision,
        }
    }

    /// Scale used to quantize average cost: a cost basis is a ratio of
    /// notional (price * quantity) to quantity, so it carries both precisions.
    pub fn average_cost_scale(&self) -> u32 {
        self.price_precision.saturating_add(self.volume_precision)
    }
}
