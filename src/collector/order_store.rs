//! Thread-safe registry of locally-known orders.

use crate::domain::{Order, OrderId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Existence predicate the collector uses to match trades to orders.
pub trait OrderExistence: Send + Sync {
    fn exists(&self, order_id: OrderId) -> bool;
}

/// Orders known to the desk, written by order-submission code and read by
/// the collector concurrently. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    remove_cancelled: bool,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop canceled and rejected orders when their update arrives.
    pub fn with_remove_cancelled(mut self, remove_cancelled: bool) -> Self {
        self.remove_cancelled = remove_cancelled;
        self
    }

    pub fn add(&self, order: Order) {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order.id, order);
    }

    pub fn add_many(&self, orders: impl IntoIterator<Item = Order>) {
        let mut guard = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        for order in orders {
            guard.insert(order.id, order);
        }
    }

    pub fn remove(&self, order_id: OrderId) -> Option<Order> {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&order_id)
    }

    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&order_id)
            .cloned()
    }

    pub fn exists(&self, order_id: OrderId) -> bool {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&order_id)
    }

    /// Apply an order update from an order stream or query.
    pub fn update(&self, order: Order) {
        if self.remove_cancelled && order.status.is_cancelled() {
            self.remove(order.id);
        } else {
            self.add(order);
        }
    }

    pub fn len(&self) -> usize {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every known order, sorted by id.
    pub fn all(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);
        orders
    }
}

impl OrderExistence for OrderStore {
    fn exists(&self, order_id: OrderId) -> bool {
        OrderStore::exists(self, order_id)
    }
}
