//! Live trade collection: order matching, exactly-once application to the
//! position, and event fan-out.

pub mod events;
pub mod order_store;
pub mod trade_collector;
pub mod trade_store;

pub use events::{CollectorEvent, EventHandler, EventKind, EventRegistry};
pub use order_store::{OrderExistence, OrderStore};
pub use trade_collector::{CollectorConfig, CollectorHandle, TradeCollector};
pub use trade_store::TradeStore;
