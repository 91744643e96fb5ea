//! Conversion of trade fees into the quote currency of a market.
//!
//! Fees paid in the quote currency are used as-is, fees paid in the base
//! currency are valued at the trade's own price, and fees paid in any other
//! currency (e.g. a platform token) go through an [`ExchangeRateLookup`].

use crate::domain::{Currency, Decimal, Market, Trade};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Source of exchange rates for fees paid in a third currency.
pub trait ExchangeRateLookup: Send + Sync + fmt::Debug {
    /// Units of `to` per one unit of `from`, if known.
    fn rate(&self, from: &Currency, to: &Currency) -> Option<Decimal>;
}

/// Lookup that knows no rates. Third-currency fees count as zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExchangeRates;

impl ExchangeRateLookup for NoExchangeRates {
    fn rate(&self, _from: &Currency, _to: &Currency) -> Option<Decimal> {
        None
    }
}

/// Fixed table of rates. Inverse pairs are derived when only one direction is set.
#[derive(Debug, Default, Clone)]
pub struct StaticExchangeRates {
    rates: HashMap<(Currency, Currency), Decimal>,
}

impl StaticExchangeRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rate(mut self, from: Currency, to: Currency, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

impl ExchangeRateLookup for StaticExchangeRates {
    fn rate(&self, from: &Currency, to: &Currency) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::one());
        }
        if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            return Some(*rate);
        }
        self.rates
            .get(&(to.clone(), from.clone()))
            .and_then(|inverse| Decimal::one().checked_div(*inverse))
    }
}

/// Values trade fees in a market's quote currency.
#[derive(Debug, Clone)]
pub struct FeeConverter {
    base_currency: Currency,
    quote_currency: Currency,
    rates: Arc<dyn ExchangeRateLookup>,
}

impl FeeConverter {
    pub fn new(market: &Market) -> Self {
        Self {
            base_currency: market.base_currency.clone(),
            quote_currency: market.quote_currency.clone(),
            rates: Arc::new(NoExchangeRates),
        }
    }

    pub fn with_rates(mut self, rates: Arc<dyn ExchangeRateLookup>) -> Self {
        self.rates = rates;
        self
    }

    /// Quote-currency value of the trade's fee.
    pub fn fee_in_quote(&self, trade: &Trade) -> Decimal {
        if trade.fee.is_zero() {
            return Decimal::zero();
        }
        if trade.fee_currency == self.quote_currency {
            return trade.fee;
        }
        if trade.fee_currency == self.base_currency {
            return trade.fee * trade.price;
        }
        match self.rates.rate(&trade.fee_currency, &self.quote_currency) {
            Some(rate) => trade.fee * rate,
            None => {
                warn!(
                    trade = %trade.key(),
                    fee = %trade.fee,
                    fee_currency = %trade.fee_currency,
                    quote_currency = %self.quote_currency,
                    "no exchange rate for fee currency, fee not charged to profit"
                );
                Decimal::zero()
            }
        }
    }
}
