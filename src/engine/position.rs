//! Average-cost position ledger for one symbol.

use super::fee::{ExchangeRateLookup, FeeConverter};
use crate::domain::{Currency, Decimal, Market, Symbol, TimeMs, Trade};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Decimal places kept for the share of a basis released by a partial close.
/// Fixed so that the remainder left in the basis is exact.
const BASIS_SCALE: u32 = 16;

/// Result of applying one trade to a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TradeOutcome {
    /// Gross profit realized on the closed portion.
    pub profit: Decimal,
    /// Profit after the fees attributable to the closed portion.
    pub net_profit: Decimal,
    /// True when the trade reduced, closed, or reversed exposure.
    pub realized: bool,
}

/// Immutable copy of a position's state, handed to event subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub symbol: Symbol,
    pub base: Decimal,
    pub quote: Decimal,
    pub average_cost: Decimal,
    pub approximate_average_cost: Decimal,
    pub accumulated_profit: Decimal,
    pub accumulated_net_profit: Decimal,
    pub accumulated_fee: Decimal,
    pub fees: BTreeMap<Currency, Decimal>,
    pub trade_count: u64,
    pub updated_at: Option<TimeMs>,
}

/// Cost-basis ledger: signed base quantity (positive = long, negative =
/// short) with its quantity-weighted average entry price.
///
/// `approximate_average_cost` additionally folds opening fees into the cost
/// basis, so net profit charges them when the exposure is closed.
#[derive(Debug, Clone)]
pub struct Position {
    pub symbol: Symbol,
    pub base_currency: Currency,
    pub quote_currency: Currency,
    /// Signed quantity.
    pub base: Decimal,
    /// Signed quote cash flow: sells add, buys subtract.
    pub quote: Decimal,
    pub average_cost: Decimal,
    pub approximate_average_cost: Decimal,
    pub accumulated_profit: Decimal,
    pub accumulated_net_profit: Decimal,
    /// Quote-equivalent fees of every applied trade.
    pub accumulated_fee: Decimal,
    /// Raw fee totals per fee currency.
    pub fees: BTreeMap<Currency, Decimal>,
    pub trade_count: u64,
    pub updated_at: Option<TimeMs>,
    /// Unrounded quote cost of the open exposure (entry proceeds for a short).
    cost_basis: Decimal,
    /// `cost_basis` with opening fees folded in.
    fee_cost_basis: Decimal,
    average_cost_scale: u32,
    fee_converter: FeeConverter,
}

impl Position {
    pub fn new(market: &Market) -> Self {
        Self {
            symbol: market.symbol.clone(),
            base_currency: market.base_currency.clone(),
            quote_currency: market.quote_currency.clone(),
            base: Decimal::zero(),
            quote: Decimal::zero(),
            average_cost: Decimal::zero(),
            approximate_average_cost: Decimal::zero(),
            accumulated_profit: Decimal::zero(),
            accumulated_net_profit: Decimal::zero(),
            accumulated_fee: Decimal::zero(),
            fees: BTreeMap::new(),
            trade_count: 0,
            updated_at: None,
            cost_basis: Decimal::zero(),
            fee_cost_basis: Decimal::zero(),
            average_cost_scale: market.average_cost_scale(),
            fee_converter: FeeConverter::new(market),
        }
    }

    /// Use `rates` to value fees paid in neither the base nor the quote currency.
    pub fn with_exchange_rates(mut self, rates: Arc<dyn ExchangeRateLookup>) -> Self {
        self.fee_converter = self.fee_converter.with_rates(rates);
        self
    }

    pub fn is_flat(&self) -> bool {
        self.base.is_zero()
    }

    pub fn is_long(&self) -> bool {
        self.base.is_positive()
    }

    pub fn is_short(&self) -> bool {
        self.base.is_negative()
    }

    /// Mark-to-market profit of the open exposure at `price`.
    pub fn unrealized_profit(&self, price: Decimal) -> Decimal {
        (price * self.base.abs() - self.cost_basis) * side_direction(self.base)
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            symbol: self.symbol.clone(),
            base: self.base,
            quote: self.quote,
            average_cost: self.average_cost,
            approximate_average_cost: self.approximate_average_cost,
            accumulated_profit: self.accumulated_profit,
            accumulated_net_profit: self.accumulated_net_profit,
            accumulated_fee: self.accumulated_fee,
            fees: self.fees.clone(),
            trade_count: self.trade_count,
            updated_at: self.updated_at,
        }
    }

    /// Apply one trade.
    ///
    /// Extending exposure re-averages the cost basis and realizes nothing.
    /// Reducing exposure realizes profit on the closed quantity against the
    /// pre-trade cost basis. A reversal closes the old exposure and opens
    /// the remainder at the trade price within the same call. Trades with a
    /// non-positive quantity carry no exposure and leave the position as is.
    pub fn add_trade(&mut self, trade: &Trade) -> TradeOutcome {
        if !trade.quantity.is_positive() {
            return TradeOutcome::default();
        }

        let fee_in_quote = self.fee_converter.fee_in_quote(trade);
        self.record_fee(trade, fee_in_quote);
        self.quote -= trade.signed_quantity() * trade.price;
        self.trade_count += 1;
        self.updated_at = Some(trade.time);

        let signed_qty = trade.signed_quantity();
        let extends = self.base.is_zero() || self.base.is_positive() == signed_qty.is_positive();
        let outcome = if extends {
            self.extend(trade, fee_in_quote);
            TradeOutcome::default()
        } else {
            self.reduce(trade, fee_in_quote)
        };
        self.refresh_average_costs();
        outcome
    }

    fn record_fee(&mut self, trade: &Trade, fee_in_quote: Decimal) {
        if !trade.fee.is_zero() {
            *self
                .fees
                .entry(trade.fee_currency.clone())
                .or_insert_with(Decimal::zero) += trade.fee;
        }
        self.accumulated_fee += fee_in_quote;
    }

    /// Open from flat or add to the current direction.
    fn extend(&mut self, trade: &Trade, fee_in_quote: Decimal) {
        let direction = side_direction(trade.signed_quantity());
        let notional = trade.price * trade.quantity;

        // Fees raise the cost of a long and lower the entry of a short.
        self.cost_basis += notional;
        self.fee_cost_basis += notional + direction * fee_in_quote;
        self.base += trade.signed_quantity();
    }

    /// Reduce, close, or reverse the current exposure.
    fn reduce(&mut self, trade: &Trade, fee_in_quote: Decimal) -> TradeOutcome {
        let direction = side_direction(self.base);
        let open_abs = self.base.abs();
        let closed = trade.quantity.min(open_abs);
        let opened = trade.quantity - closed;

        let close_fee = if opened.is_zero() {
            fee_in_quote
        } else {
            (fee_in_quote * closed / trade.quantity).round_dp(BASIS_SCALE)
        };
        let open_fee = fee_in_quote - close_fee;

        // A full close releases the whole basis so nothing is lost to division.
        let (closed_cost, closed_fee_cost) = if closed == open_abs {
            (self.cost_basis, self.fee_cost_basis)
        } else {
            (
                (self.cost_basis * closed / open_abs).round_dp(BASIS_SCALE),
                (self.fee_cost_basis * closed / open_abs).round_dp(BASIS_SCALE),
            )
        };
        let proceeds = trade.price * closed;
        let profit = (proceeds - closed_cost) * direction;
        let net_profit = (proceeds - closed_fee_cost) * direction - close_fee;

        self.cost_basis -= closed_cost;
        self.fee_cost_basis -= closed_fee_cost;
        self.base += trade.signed_quantity();
        if opened.is_positive() {
            // Reversed: the remainder is new exposure in the trade's direction.
            let new_direction = -direction;
            self.cost_basis = trade.price * opened;
            self.fee_cost_basis = trade.price * opened + new_direction * open_fee;
        }

        self.accumulated_profit += profit;
        self.accumulated_net_profit += net_profit;

        TradeOutcome {
            profit,
            net_profit,
            realized: true,
        }
    }

    /// Derive the exposed per-unit costs from the unrounded basis.
    fn refresh_average_costs(&mut self) {
        let open_abs = self.base.abs();
        match (
            self.cost_basis.checked_div(open_abs),
            self.fee_cost_basis.checked_div(open_abs),
        ) {
            (Some(cost), Some(fee_cost)) => {
                self.average_cost = cost.round_dp(self.average_cost_scale);
                self.approximate_average_cost = fee_cost.round_dp(self.average_cost_scale);
            }
            _ => {
                self.cost_basis = Decimal::zero();
                self.fee_cost_basis = Decimal::zero();
                self.average_cost = Decimal::zero();
                self.approximate_average_cost = Decimal::zero();
            }
        }
    }
}

/// +1 for long exposure, -1 for short.
fn side_direction(signed: Decimal) -> Decimal {
    if signed.is_negative() {
        -Decimal::one()
    } else {
        Decimal::one()
    }
}
