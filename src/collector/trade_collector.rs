//! Matches incoming trades to known orders and drives the position ledger.

use super::events::{CollectorEvent, EventHandler, EventKind, EventRegistry};
use super::order_store::OrderExistence;
use super::trade_store::TradeStore;
use crate::datasource::{QueryError, TradeHandler, TradeHistoryService, TradeQueryOptions, TradeStream};
use crate::domain::{Decimal, Symbol, TimeMs, Trade, TradeKey};
use crate::engine::{Position, PositionSnapshot};
use crate::error::CollectorError;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_RECHECK_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Capacity of the inbound trade queue; producers block when it is full.
    pub queue_capacity: usize,
    /// Period of the safety-net re-scan of pending trades.
    pub recheck_interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            recheck_interval: DEFAULT_RECHECK_INTERVAL,
        }
    }
}

/// Where an applied trade came from; decides which event announces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Live,
    Recovered,
}

/// Producer side of a running collector. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CollectorHandle {
    trades: mpsc::Sender<Trade>,
    signal: mpsc::Sender<()>,
}

impl CollectorHandle {
    /// Hand a trade to the processing loop, waiting while the queue is full.
    pub async fn queue_trade(&self, trade: Trade) -> Result<(), CollectorError> {
        self.trades
            .send(trade)
            .await
            .map_err(|_| CollectorError::QueueClosed)
    }

    /// Non-blocking variant for producers outside an async context.
    pub fn try_queue_trade(&self, trade: Trade) -> Result<(), CollectorError> {
        self.trades.try_send(trade).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CollectorError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => CollectorError::QueueClosed,
        })
    }

    /// Ask for a re-check of pending trades. Signals raised before the loop
    /// drains collapse into one; never blocks.
    pub fn emit(&self) {
        let _ = self.signal.try_send(());
    }
}

/// Reconciles a stream of trades for one symbol against known orders.
///
/// The collector is the single writer of its position, dedup set, and
/// pending buffer. Other tasks reach it only through a [`CollectorHandle`].
pub struct TradeCollector {
    symbol: Symbol,
    position: Position,
    orders: Arc<dyn OrderExistence>,
    trade_store: TradeStore,
    done_trades: HashSet<TradeKey>,
    events: EventRegistry,
    config: CollectorConfig,
    trade_tx: mpsc::Sender<Trade>,
    trade_rx: Option<mpsc::Receiver<Trade>>,
    signal_tx: mpsc::Sender<()>,
    signal_rx: Option<mpsc::Receiver<()>>,
}

impl TradeCollector {
    pub fn new(symbol: Symbol, position: Position, orders: Arc<dyn OrderExistence>) -> Self {
        Self::with_config(symbol, position, orders, CollectorConfig::default())
    }

    pub fn with_config(
        symbol: Symbol,
        position: Position,
        orders: Arc<dyn OrderExistence>,
        config: CollectorConfig,
    ) -> Self {
        let (trade_tx, trade_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (signal_tx, signal_rx) = mpsc::channel(1);
        Self {
            trade_store: TradeStore::new(symbol.clone()),
            symbol,
            position,
            orders,
            done_trades: HashSet::new(),
            events: EventRegistry::new(),
            config,
            trade_tx,
            trade_rx: Some(trade_rx),
            signal_tx,
            signal_rx: Some(signal_rx),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn handle(&self) -> CollectorHandle {
        CollectorHandle {
            trades: self.trade_tx.clone(),
            signal: self.signal_tx.clone(),
        }
    }

    /// Trades buffered until their order becomes known.
    pub fn pending_len(&self) -> usize {
        self.trade_store.len()
    }

    /// Trades applied to the position so far.
    pub fn applied_len(&self) -> usize {
        self.done_trades.len()
    }

    pub fn is_applied(&self, key: &TradeKey) -> bool {
        self.done_trades.contains(key)
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) {
        self.events.subscribe(kind, handler);
    }

    pub fn on_trade<F>(&mut self, mut handler: F)
    where
        F: FnMut(&Trade) + Send + 'static,
    {
        self.subscribe(
            EventKind::Trade,
            Box::new(move |event: &CollectorEvent| {
                if let CollectorEvent::Trade(trade) = event {
                    handler(trade);
                }
            }),
        );
    }

    pub fn on_recover<F>(&mut self, mut handler: F)
    where
        F: FnMut(&Trade) + Send + 'static,
    {
        self.subscribe(
            EventKind::Recover,
            Box::new(move |event: &CollectorEvent| {
                if let CollectorEvent::Recover(trade) = event {
                    handler(trade);
                }
            }),
        );
    }

    pub fn on_profit<F>(&mut self, mut handler: F)
    where
        F: FnMut(&Trade, Decimal, Decimal) + Send + 'static,
    {
        self.subscribe(
            EventKind::Profit,
            Box::new(move |event: &CollectorEvent| {
                if let CollectorEvent::Profit {
                    trade,
                    profit,
                    net_profit,
                } = event
                {
                    handler(trade, *profit, *net_profit);
                }
            }),
        );
    }

    pub fn on_position_update<F>(&mut self, mut handler: F)
    where
        F: FnMut(&PositionSnapshot) + Send + 'static,
    {
        self.subscribe(
            EventKind::PositionUpdate,
            Box::new(move |event: &CollectorEvent| {
                if let CollectorEvent::PositionUpdate(snapshot) = event {
                    handler(snapshot);
                }
            }),
        );
    }

    /// Apply `trade` if its order is known, otherwise buffer it.
    ///
    /// Returns true only when the trade was applied by this call; already
    /// applied trades are ignored.
    pub fn process_trade(&mut self, trade: Trade) -> bool {
        self.process_trade_from(trade, Origin::Live)
    }

    fn process_trade_from(&mut self, trade: Trade, origin: Origin) -> bool {
        let key = trade.key();
        if self.done_trades.contains(&key) {
            debug!(trade = %key, "trade already applied, skipping");
            return false;
        }
        if trade.symbol != self.symbol {
            debug!(trade = %key, collector_symbol = %self.symbol, "ignoring trade for another symbol");
            return false;
        }
        if !trade.quantity.is_positive() || trade.price.is_negative() {
            warn!(
                trade = %key,
                quantity = %trade.quantity,
                price = %trade.price,
                "dropping malformed trade"
            );
            return false;
        }

        if self.orders.exists(trade.order_id) {
            self.apply(trade, origin);
            let snapshot = self.position.snapshot();
            self.events.emit(&CollectorEvent::PositionUpdate(snapshot));
            return true;
        }

        debug!(trade = %key, order_id = %trade.order_id, "order not known yet, buffering trade");
        self.trade_store.add(trade);
        false
    }

    /// Apply every buffered trade whose order has become known. Emits at
    /// most one position update per call.
    pub fn process(&mut self) -> bool {
        let done_trades = &self.done_trades;
        let orders = &self.orders;
        let mut ready = Vec::new();
        self.trade_store.filter(|trade| {
            if done_trades.contains(&trade.key()) {
                return true;
            }
            if orders.exists(trade.order_id) {
                ready.push(trade.clone());
                return true;
            }
            false
        });

        if ready.is_empty() {
            return false;
        }

        debug!(count = ready.len(), pending = self.trade_store.len(), "applying matched trades");
        for trade in ready {
            self.apply(trade, Origin::Live);
        }
        let snapshot = self.position.snapshot();
        self.events.emit(&CollectorEvent::PositionUpdate(snapshot));
        true
    }

    fn apply(&mut self, trade: Trade, origin: Origin) {
        self.done_trades.insert(trade.key());
        let outcome = self.position.add_trade(&trade);

        let applied_event = match origin {
            Origin::Live => CollectorEvent::Trade(trade.clone()),
            Origin::Recovered => CollectorEvent::Recover(trade.clone()),
        };
        self.events.emit(&applied_event);

        if outcome.realized {
            debug!(
                trade = %trade.key(),
                profit = %outcome.profit,
                net_profit = %outcome.net_profit,
                "profit realized"
            );
            self.events.emit(&CollectorEvent::Profit {
                trade,
                profit: outcome.profit,
                net_profit: outcome.net_profit,
            });
        }
    }

    /// Replay trades since `since` from a history service.
    ///
    /// Newly applied trades are announced as recovered rather than as live
    /// trades. Any query error aborts the whole recovery and is returned as-is.
    pub async fn recover(
        &mut self,
        history: &dyn TradeHistoryService,
        symbol: &Symbol,
        since: TimeMs,
    ) -> Result<usize, QueryError> {
        let trades = history
            .query_trades(symbol, &TradeQueryOptions::since(since))
            .await
            .map_err(|e| {
                warn!(symbol = %symbol, since = %since, error = %e, "trade recovery query failed");
                e
            })?;

        let mut recovered = 0;
        for trade in trades {
            debug!(trade = %trade, "processing trade");
            let key = trade.key();
            if self.process_trade_from(trade, Origin::Recovered) {
                info!(trade = %key, "recovered trade");
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Register this collector's queue as the stream's trade handler.
    pub fn bind_stream_for_background(&self, stream: &dyn TradeStream) {
        let handle = self.handle();
        let handler: TradeHandler = Arc::new(move |trade: Trade| {
            let handle = handle.clone();
            async move {
                if let Err(e) = handle.queue_trade(trade).await {
                    warn!(error = %e, "dropping streamed trade");
                }
            }
            .boxed()
        });
        stream.on_trade_update(handler);
    }

    /// Process streamed trades directly under the lock, without the
    /// background loop. Intended for sequential replays such as backtests.
    pub fn bind_stream(collector: Arc<Mutex<TradeCollector>>, stream: &dyn TradeStream) {
        let handler: TradeHandler = Arc::new(move |trade: Trade| {
            let collector = collector.clone();
            async move {
                collector.lock().await.process_trade(trade);
            }
            .boxed()
        });
        stream.on_trade_update(handler);
    }

    /// Background processing loop; the only place that mutates state while
    /// producers use a [`CollectorHandle`].
    ///
    /// Wakes on the periodic re-check, the coalescing signal, or an inbound
    /// trade, and handles exactly one of them per iteration. Returns once
    /// `shutdown` is cancelled; queued but undelivered trades stay in the
    /// queue for a later `run`.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        let (mut trade_rx, mut signal_rx) = match (self.trade_rx.take(), self.signal_rx.take()) {
            (Some(trade_rx), Some(signal_rx)) => (trade_rx, signal_rx),
            (trade_rx, signal_rx) => {
                warn!(symbol = %self.symbol, "collector loop already running");
                self.trade_rx = trade_rx;
                self.signal_rx = signal_rx;
                return;
            }
        };

        let mut ticker =
            tokio::time::interval(self.config.recheck_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        debug!(symbol = %self.symbol, "collector loop started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.process();
                }
                Some(()) = signal_rx.recv() => {
                    self.process();
                }
                Some(trade) = trade_rx.recv() => {
                    self.process_trade(trade);
                }
            }
        }
        debug!(symbol = %self.symbol, "collector loop stopped");

        self.trade_rx = Some(trade_rx);
        self.signal_rx = Some(signal_rx);
    }
}

impl std::fmt::Debug for TradeCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradeCollector")
            .field("symbol", &self.symbol)
            .field("position", &self.position.snapshot())
            .field("pending", &self.trade_store.len())
            .field("applied", &self.done_trades.len())
            .field("events", &self.events)
            .finish()
    }
}
