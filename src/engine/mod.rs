//! Pure accounting engine shared by the live collector and offline reports.

pub mod fee;
pub mod pnl;
pub mod position;
pub mod stock_distribution;

pub use fee::{ExchangeRateLookup, FeeConverter, NoExchangeRates, StaticExchangeRates};
pub use pnl::{ProfitAndLossCalculator, ProfitAndLossReport};
pub use position::{Position, PositionSnapshot, TradeOutcome};
pub use stock_distribution::{Checkpoint, StockDistribution};
