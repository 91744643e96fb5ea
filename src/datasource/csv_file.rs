//! Trade history backed by a CSV export.

use super::{select_trades, QueryError, TradeHistoryService, TradeQueryOptions};
use crate::domain::{Currency, Decimal, OrderId, Side, Symbol, TimeMs, Trade, TradeId};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads trades from a CSV file with header
/// `id,symbol,order_id,side,price,quantity,fee,fee_currency,time_ms[,is_maker]`.
///
/// The file is re-read on every query so appended exports are picked up.
#[derive(Debug, Clone)]
pub struct CsvTradeHistory {
    path: PathBuf,
}

impl CsvTradeHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parse_csv(csv_bytes: &[u8]) -> Result<Vec<Trade>, QueryError> {
        #[derive(Debug, serde::Deserialize)]
        struct Row {
            id: u64,
            symbol: String,
            order_id: u64,
            side: String,
            price: String,
            quantity: String,
            fee: String,
            fee_currency: String,
            time_ms: i64,
            #[serde(default)]
            is_maker: Option<bool>,
        }

        fn parse_decimal(field: &str, value: &str, line: u64) -> Result<Decimal, QueryError> {
            Decimal::from_str_canonical(value).map_err(|e| {
                QueryError::ParseError(format!("line {}: invalid {}: {}", line, field, e))
            })
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_bytes);

        let mut trades = Vec::new();
        for record in reader.deserialize::<Row>() {
            let row = record.map_err(|e| QueryError::ParseError(e.to_string()))?;
            let line = trades.len() as u64 + 2;
            let side = Side::parse(&row.side).ok_or_else(|| {
                QueryError::ParseError(format!("line {}: invalid side: {}", line, row.side))
            })?;

            let trade = Trade::new(
                TradeId(row.id),
                Symbol::new(row.symbol),
                OrderId(row.order_id),
                side,
                parse_decimal("price", &row.price, line)?,
                parse_decimal("quantity", &row.quantity, line)?,
                parse_decimal("fee", &row.fee, line)?,
                Currency::new(row.fee_currency),
                TimeMs::new(row.time_ms),
            )
            .with_maker(row.is_maker.unwrap_or(false));
            trades.push(trade);
        }

        Ok(trades)
    }
}

#[async_trait]
impl TradeHistoryService for CsvTradeHistory {
    async fn query_trades(
        &self,
        symbol: &Symbol,
        options: &TradeQueryOptions,
    ) -> Result<Vec<Trade>, QueryError> {
        options.validate()?;

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            QueryError::Other(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let trades = Self::parse_csv(&bytes)?;
        let total = trades.len();
        let selected = select_trades(trades, symbol, options);

        debug!(
            path = %self.path.display(),
            symbol = %symbol,
            total,
            selected = selected.len(),
            "loaded trades from csv"
        );
        Ok(selected)
    }
}
