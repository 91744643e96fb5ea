pub mod collector;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;

pub use collector::{CollectorConfig, CollectorEvent, CollectorHandle, OrderStore, TradeCollector};
pub use config::Config;
pub use datasource::{CsvTradeHistory, QueryError, TradeHistoryService, TradeQueryOptions};
pub use domain::{
    Currency, Decimal, Market, Order, OrderId, OrderStatus, Side, Symbol, TimeMs, Trade, TradeId,
    TradeKey,
};
pub use engine::{Position, PositionSnapshot, ProfitAndLossCalculator, ProfitAndLossReport};
pub use error::{AccountingError, CollectorError};
