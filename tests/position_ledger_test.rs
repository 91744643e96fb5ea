use tradeledger::engine::{Position, StockDistribution};
use tradeledger::{Currency, Decimal, Market, OrderId, Side, Symbol, TimeMs, Trade, TradeId};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn market() -> Market {
    Market::new(
        Symbol::new("BTCUSDT"),
        Currency::new("BTC"),
        Currency::new("USDT"),
        2,
        6,
    )
}

fn trade(id: u64, side: Side, qty: &str, px: &str, fee: &str) -> Trade {
    Trade::new(
        TradeId(id),
        Symbol::new("BTCUSDT"),
        OrderId(1),
        side,
        d(px),
        d(qty),
        d(fee),
        Currency::new("USDT"),
        TimeMs::new(id as i64 * 1000),
    )
}

fn buy(id: u64, qty: &str, px: &str) -> Trade {
    trade(id, Side::Buy, qty, px, "0")
}

fn sell(id: u64, qty: &str, px: &str) -> Trade {
    trade(id, Side::Sell, qty, px, "0")
}

#[test]
fn test_scenario_a_averaging_then_partial_close() {
    let mut position = Position::new(&market());

    let first = position.add_trade(&buy(1, "1.0", "100"));
    let second = position.add_trade(&buy(2, "1.0", "110"));
    assert!(!first.realized);
    assert!(!second.realized);
    assert_eq!(position.average_cost, d("105"));
    assert_eq!(position.accumulated_profit, Decimal::zero());

    let close = position.add_trade(&sell(3, "1.5", "120"));
    assert!(close.realized);
    assert_eq!(close.profit, d("22.5"));
    assert_eq!(close.net_profit, d("22.5"));
    assert_eq!(position.base, d("0.5"));
    assert_eq!(position.average_cost, d("105"));
}

#[test]
fn test_scenario_b_reversal() {
    let mut position = Position::new(&market());
    position.add_trade(&buy(1, "2.0", "100"));

    let reversal = position.add_trade(&sell(2, "3.0", "120"));
    assert!(reversal.realized);
    assert_eq!(reversal.profit, d("40"));
    assert_eq!(position.base, d("-1"));
    assert_eq!(position.average_cost, d("120"));

    let cover = position.add_trade(&buy(3, "1.0", "110"));
    assert!(cover.realized);
    assert_eq!(cover.profit, d("10"));
    assert!(position.is_flat());
    assert_eq!(position.accumulated_profit, d("50"));
}

#[test]
fn test_exact_close_realizes_and_flattens() {
    let mut position = Position::new(&market());
    position.add_trade(&buy(1, "0.3", "100"));
    let close = position.add_trade(&sell(2, "0.3", "90"));

    assert!(close.realized);
    assert_eq!(close.profit, d("-3"));
    assert!(position.is_flat());
    assert_eq!(position.average_cost, Decimal::zero());
}

/// Net profit over a closed sequence equals proceeds minus cost minus fees.
fn assert_conserved(trades: &[Trade]) {
    let mut position = Position::new(&market());
    let mut net_total = Decimal::zero();
    let mut gross_total = Decimal::zero();
    for t in trades {
        let outcome = position.add_trade(t);
        net_total += outcome.net_profit;
        gross_total += outcome.profit;
    }
    assert!(position.is_flat(), "sequence must close");

    let proceeds: Decimal = trades
        .iter()
        .filter(|t| t.side == Side::Sell)
        .map(|t| t.price * t.quantity)
        .sum();
    let cost: Decimal = trades
        .iter()
        .filter(|t| t.side == Side::Buy)
        .map(|t| t.price * t.quantity)
        .sum();
    let fees: Decimal = trades.iter().map(|t| t.fee).sum();

    assert_eq!(gross_total, proceeds - cost);
    assert_eq!(net_total, proceeds - cost - fees);
    assert_eq!(position.accumulated_net_profit, net_total);
    assert_eq!(position.accumulated_fee, fees);
}

#[test]
fn test_conservation_long_round_trip() {
    assert_conserved(&[
        trade(1, Side::Buy, "1", "100", "0.1"),
        trade(2, Side::Buy, "1", "110", "0.3"),
        trade(3, Side::Sell, "0.5", "120", "0.1"),
        trade(4, Side::Sell, "1.5", "100", "0.2"),
    ]);
}

#[test]
fn test_conservation_short_round_trip() {
    assert_conserved(&[
        trade(1, Side::Sell, "2", "50", "0.1"),
        trade(2, Side::Buy, "1", "40", "0.1"),
        trade(3, Side::Buy, "1", "45", "0.2"),
    ]);
}

#[test]
fn test_conservation_across_reversal() {
    assert_conserved(&[
        trade(1, Side::Buy, "1", "100", "1"),
        trade(2, Side::Sell, "3", "110", "3"),
        trade(3, Side::Buy, "2", "105", "2"),
    ]);
}

#[test]
fn test_conservation_when_average_exceeds_market_scale() {
    // Average cost 100.00666... does not fit the 8 places the market keeps.
    let trades = [
        buy(1, "1", "100"),
        buy(2, "2", "100.01"),
        sell(3, "3", "101"),
    ];
    let mut position = Position::new(&market());
    let total: Decimal = trades.iter().map(|t| position.add_trade(t).profit).sum();
    assert!(position.is_flat());
    assert_eq!(total, d("2.98"));

    assert_conserved(&trades);
}

#[test]
fn test_conservation_across_partial_closes_with_repeating_average() {
    assert_conserved(&[
        trade(1, Side::Buy, "1", "100", "0.07"),
        trade(2, Side::Buy, "2", "100.01", "0.11"),
        trade(3, Side::Sell, "1", "101", "0.05"),
        trade(4, Side::Sell, "0.7", "99.99", "0.03"),
        trade(5, Side::Sell, "1.3", "100.5", "0.06"),
    ]);
}

#[test]
fn test_checkpoints_for_repeated_round_trips() {
    for n in 1..=5u64 {
        let mut trades = Vec::new();
        let mut id = 0;
        for _ in 0..n {
            id += 1;
            trades.push(buy(id, "1", "100"));
            id += 1;
            trades.push(buy(id, "2", "101"));
            id += 1;
            trades.push(sell(id, "3", "102"));
        }

        let mut distribution = StockDistribution::new(&market());
        let checkpoints = distribution.add_trades(trades).unwrap();

        assert_eq!(checkpoints.len() as u64, n);
        for (i, checkpoint) in checkpoints.iter().enumerate() {
            assert_eq!(checkpoint.index, i * 3 + 2);
        }
        assert_eq!(distribution.stock(), Decimal::zero());
    }
}

#[test]
fn test_offline_replay_matches_live_ledger() {
    let trades = vec![
        buy(1, "2", "100"),
        sell(2, "3", "120"),
        buy(3, "1", "110"),
        buy(4, "0.5", "90"),
    ];

    let mut live = Position::new(&market());
    for t in &trades {
        live.add_trade(t);
    }

    let mut distribution = StockDistribution::new(&market());
    distribution.add_trades(trades).unwrap();

    assert_eq!(distribution.position().snapshot(), live.snapshot());
}
