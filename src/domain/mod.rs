//! Domain types for the trade ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeMs, Symbol, Currency, Side, OrderId, TradeId
//! - Trade, Order and Market types
//! - Stable trade ordering helper for deterministic replay

pub mod decimal;
pub mod market;
pub mod order;
pub mod ordering;
pub mod primitives;
pub mod trade;

pub use decimal::Decimal;
pub use market::Market;
pub use order::{Order, OrderStatus};
pub use ordering::{sort_trades, TradeOrderingKey};
pub use primitives::{Currency, OrderId, Side, Symbol, TimeMs, TradeId};
pub use trade::{Trade, TradeKey};
