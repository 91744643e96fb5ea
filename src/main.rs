use anyhow::Context;
use tradeledger::datasource::{CsvTradeHistory, TradeHistoryService, TradeQueryOptions};
use tradeledger::config::ReportFormat;
use tradeledger::{Config, ProfitAndLossCalculator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let market = config.market();

    let history = CsvTradeHistory::new(config.trades_csv_path.clone());
    let options = TradeQueryOptions {
        start_time: config.pnl_since,
        ..Default::default()
    };
    let trades = history
        .query_trades(&config.symbol, &options)
        .await
        .with_context(|| format!("failed to load trades from {}", history.path().display()))?;

    tracing::info!(symbol = %config.symbol, count = trades.len(), "trades loaded");

    let mut calculator = ProfitAndLossCalculator::new(
        market,
        config.trading_fee_currency.clone(),
        config.current_price,
    )
    .with_trades(trades);
    if let Some(since) = config.pnl_since {
        calculator = calculator.with_start_time(since);
    }

    let report = calculator.calculate().context("failed to calculate profit report")?;
    match config.report_format {
        ReportFormat::Text => report.log(),
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;
            println!("{}", json);
        }
    }

    Ok(())
}
