//! Retrospective profit and loss report over a full trade history.

use super::fee::{ExchangeRateLookup, NoExchangeRates};
use super::stock_distribution::StockDistribution;
use crate::domain::{sort_trades, Currency, Decimal, Market, Symbol, TimeMs, Trade};
use crate::error::AccountingError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Finalized profit report for one symbol and time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAndLossReport {
    pub symbol: Symbol,
    pub trading_fee_currency: Currency,
    pub start_time: Option<TimeMs>,
    pub end_time: Option<TimeMs>,
    pub current_price: Decimal,
    pub num_trades: usize,
    pub num_checkpoints: usize,
    pub buy_volume: Decimal,
    pub sell_volume: Decimal,
    /// Realized profit before fees.
    pub profit: Decimal,
    /// Realized profit after fees.
    pub net_profit: Decimal,
    /// Quote-equivalent fees over the window.
    pub fee_in_quote: Decimal,
    /// Cost basis of the inventory still open.
    pub average_cost: Decimal,
    /// Signed inventory still open.
    pub stock: Decimal,
    /// Mark-to-market profit of `stock` at `current_price`.
    pub unrealized_profit: Decimal,
    pub currency_fees: BTreeMap<Currency, Decimal>,
}

impl ProfitAndLossReport {
    /// Emit the report through the log.
    pub fn log(&self) {
        for line in self.to_string().lines() {
            info!("{}", line);
        }
    }
}

impl fmt::Display for ProfitAndLossReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let since = self
            .start_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| "beginning".to_string());
        let until = self
            .end_time
            .map(|t| t.to_string())
            .unwrap_or_else(|| "now".to_string());

        writeln!(
            f,
            "profit report for {} (trading fee currency {})",
            self.symbol, self.trading_fee_currency
        )?;
        writeln!(f, "  window:            {} -> {}", since, until)?;
        writeln!(
            f,
            "  trades:            {} ({} round-trips)",
            self.num_trades, self.num_checkpoints
        )?;
        writeln!(f, "  buy volume:        {}", self.buy_volume)?;
        writeln!(f, "  sell volume:       {}", self.sell_volume)?;
        writeln!(f, "  stock:             {}", self.stock)?;
        writeln!(f, "  average cost:      {}", self.average_cost)?;
        writeln!(f, "  current price:     {}", self.current_price)?;
        writeln!(f, "  profit:            {}", self.profit)?;
        writeln!(f, "  net profit:        {}", self.net_profit)?;
        writeln!(f, "  fees (quote):      {}", self.fee_in_quote)?;
        writeln!(f, "  unrealized profit: {}", self.unrealized_profit)?;
        write!(f, "  currency fees:")?;
        if self.currency_fees.is_empty() {
            write!(f, " none")?;
        }
        for (currency, fee) in &self.currency_fees {
            write!(f, "\n    {}: {}", currency, fee)?;
        }
        Ok(())
    }
}

/// Builds a [`ProfitAndLossReport`] from a symbol's trade history.
///
/// Trades must already be in the market's accounting frame: trades of other
/// symbols (such as the fee token's own market) are rejected, not converted.
#[derive(Debug, Clone)]
pub struct ProfitAndLossCalculator {
    market: Market,
    trading_fee_currency: Currency,
    start_time: Option<TimeMs>,
    end_time: Option<TimeMs>,
    current_price: Decimal,
    trades: Vec<Trade>,
    exchange_rates: Arc<dyn ExchangeRateLookup>,
}

impl ProfitAndLossCalculator {
    pub fn new(market: Market, trading_fee_currency: Currency, current_price: Decimal) -> Self {
        Self {
            market,
            trading_fee_currency,
            start_time: None,
            end_time: None,
            current_price,
            trades: Vec::new(),
            exchange_rates: Arc::new(NoExchangeRates),
        }
    }

    pub fn with_start_time(mut self, start_time: TimeMs) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_end_time(mut self, end_time: TimeMs) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_trades(mut self, trades: Vec<Trade>) -> Self {
        self.trades = trades;
        self
    }

    pub fn with_exchange_rates(mut self, rates: Arc<dyn ExchangeRateLookup>) -> Self {
        self.exchange_rates = rates;
        self
    }

    pub fn set_current_price(&mut self, price: Decimal) {
        self.current_price = price;
    }

    pub fn calculate(&self) -> Result<ProfitAndLossReport, AccountingError> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start > end {
                return Err(AccountingError::InvalidTimeRange { start, end });
            }
        }

        let mut trades: Vec<Trade> = self
            .trades
            .iter()
            .filter(|t| self.start_time.map_or(true, |start| t.time >= start))
            .filter(|t| self.end_time.map_or(true, |end| t.time <= end))
            .cloned()
            .collect();
        sort_trades(&mut trades);

        let mut distribution =
            StockDistribution::new(&self.market).with_exchange_rates(self.exchange_rates.clone());
        distribution.add_trades(trades)?;

        let position = distribution.position();
        Ok(ProfitAndLossReport {
            symbol: self.market.symbol.clone(),
            trading_fee_currency: self.trading_fee_currency.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            current_price: self.current_price,
            num_trades: distribution.trades().len(),
            num_checkpoints: distribution.checkpoints().len(),
            buy_volume: distribution.buy_volume(),
            sell_volume: distribution.sell_volume(),
            profit: position.accumulated_profit,
            net_profit: position.accumulated_net_profit,
            fee_in_quote: position.accumulated_fee,
            average_cost: position.average_cost,
            stock: position.base,
            unrealized_profit: position.unrealized_profit(self.current_price),
            currency_fees: position.fees.clone(),
        })
    }
}
