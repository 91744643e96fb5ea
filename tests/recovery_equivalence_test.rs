//! A cold start that recovers history must end in the same state as a
//! collector that saw the same trades live.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tradeledger::datasource::MockTradeHistory;
use tradeledger::{
    Currency, Decimal, Market, Order, OrderId, OrderStore, Position, Side, Symbol, TimeMs, Trade,
    TradeCollector, TradeId,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn symbol() -> Symbol {
    Symbol::new("ETHUSDT")
}

fn market() -> Market {
    Market::new(symbol(), Currency::new("ETH"), Currency::new("USDT"), 2, 4)
}

fn trade(id: u64, order_id: u64, side: Side, qty: &str, px: &str, fee: &str, fee_ccy: &str) -> Trade {
    Trade::new(
        TradeId(id),
        symbol(),
        OrderId(order_id),
        side,
        d(px),
        d(qty),
        d(fee),
        Currency::new(fee_ccy),
        TimeMs::new(1_700_000_000_000 + id as i64 * 60_000),
    )
}

fn history() -> Vec<Trade> {
    vec![
        trade(1, 10, Side::Buy, "2", "1800", "0.002", "ETH"),
        trade(2, 10, Side::Buy, "1", "1830", "0.001", "ETH"),
        trade(3, 11, Side::Sell, "2.5", "1850", "4.625", "USDT"),
        trade(4, 12, Side::Sell, "1", "1840", "1.84", "USDT"),
        trade(5, 13, Side::Buy, "0.5", "1820", "0.91", "USDT"),
    ]
}

fn orders() -> OrderStore {
    let store = OrderStore::new();
    for id in 10..=13 {
        store.add(Order::new(OrderId(id), symbol(), Side::Buy, d("5"), d("1800")));
    }
    store
}

type ProfitLog = Arc<Mutex<Vec<(TradeId, Decimal, Decimal)>>>;

fn record_profits(collector: &mut TradeCollector) -> ProfitLog {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    collector.on_profit(move |trade, profit, net| sink.lock().unwrap().push((trade.id, profit, net)));
    log
}

#[tokio::test]
async fn test_cold_recovery_matches_warm_live_run() {
    let store = orders();

    let mut cold = TradeCollector::new(symbol(), Position::new(&market()), Arc::new(store.clone()));
    let cold_profits = record_profits(&mut cold);
    let source = MockTradeHistory::new().with_trades(history());
    let recovered = cold.recover(&source, &symbol(), TimeMs::new(0)).await.unwrap();
    assert_eq!(recovered, 5);

    let mut warm = TradeCollector::new(symbol(), Position::new(&market()), Arc::new(store));
    let warm_profits = record_profits(&mut warm);
    let (tx, mut applied) = tokio::sync::mpsc::unbounded_channel();
    warm.on_trade(move |trade| {
        let _ = tx.send(trade.id);
    });
    let handle = warm.handle();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            warm.run(shutdown).await;
            warm
        }
    });
    for t in history() {
        handle.queue_trade(t).await.unwrap();
    }
    for _ in 0..5 {
        applied.recv().await.unwrap();
    }
    shutdown.cancel();
    let warm = task.await.unwrap();

    assert_eq!(cold.position().snapshot(), warm.position().snapshot());
    assert_eq!(*cold_profits.lock().unwrap(), *warm_profits.lock().unwrap());
    assert_eq!(cold_profits.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_recovery_after_partial_live_run_completes_the_ledger() {
    let store = orders();
    let trades = history();

    let mut reference = TradeCollector::new(symbol(), Position::new(&market()), Arc::new(store.clone()));
    for t in trades.iter().cloned() {
        reference.process_trade(t);
    }

    // Live feed dropped trades 3 and 4; recovery fills the gap and skips the rest.
    let mut collector = TradeCollector::new(symbol(), Position::new(&market()), Arc::new(store));
    collector.process_trade(trades[0].clone());
    collector.process_trade(trades[1].clone());
    let source = MockTradeHistory::new().with_trades(trades.clone());
    let recovered = collector
        .recover(&source, &symbol(), trades[0].time)
        .await
        .unwrap();
    assert_eq!(recovered, 3);

    assert_eq!(collector.applied_len(), 5);
    assert_eq!(collector.position().snapshot(), reference.position().snapshot());
}
