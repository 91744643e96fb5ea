//! Subscriber registry for collector events.

use crate::domain::{Decimal, Trade};
use crate::engine::PositionSnapshot;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Trade,
    Recover,
    Profit,
    PositionUpdate,
}

/// Events delivered synchronously on the collector's processing thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorEvent {
    /// A live trade was applied to the position.
    Trade(Trade),
    /// A trade was applied while recovering from history.
    Recover(Trade),
    /// A trade realized profit.
    Profit {
        trade: Trade,
        profit: Decimal,
        net_profit: Decimal,
    },
    /// The position changed.
    PositionUpdate(PositionSnapshot),
}

impl CollectorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CollectorEvent::Trade(_) => EventKind::Trade,
            CollectorEvent::Recover(_) => EventKind::Recover,
            CollectorEvent::Profit { .. } => EventKind::Profit,
            CollectorEvent::PositionUpdate(_) => EventKind::PositionUpdate,
        }
    }
}

pub type EventHandler = Box<dyn FnMut(&CollectorEvent) + Send>;

/// Ordered handler lists per event kind. No replay for late subscribers.
#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<EventKind, Vec<EventHandler>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Invoke every handler of the event's kind, in registration order.
    pub fn emit(&mut self, event: &CollectorEvent) {
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for handler in handlers.iter_mut() {
                handler(event);
            }
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(EventKind, usize)> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (*kind, handlers.len()))
            .collect();
        counts.sort_by_key(|(kind, _)| *kind as u8);
        f.debug_struct("EventRegistry")
            .field("handlers", &counts)
            .finish()
    }
}
