use crate::domain::{Currency, Decimal, Market, Symbol, TimeMs};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Quote currencies recognized when splitting a symbol, longest first.
const KNOWN_QUOTE_CURRENCIES: &[&str] = &["USDT", "USDC", "BUSD", "TWD", "USD", "BTC", "ETH", "BNB"];

#[derive(Debug, Clone)]
pub struct Config {
    pub symbol: Symbol,
    pub trades_csv_path: PathBuf,
    pub current_price: Decimal,
    pub trading_fee_currency: Currency,
    pub base_currency: Currency,
    pub quote_currency: Currency,
    pub price_precision: u32,
    pub volume_precision: u32,
    pub pnl_since: Option<TimeMs>,
    pub report_format: ReportFormat,
}

/// How the binary renders the finished report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Human-readable lines through the log.
    #[default]
    Text,
    /// One JSON document on stdout.
    Json,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let symbol = env_map
            .get("SYMBOL")
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("SYMBOL".to_string()))?;

        let trades_csv_path = env_map
            .get("TRADES_CSV_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingEnv("TRADES_CSV_PATH".to_string()))?;

        let current_price = env_map
            .get("CURRENT_PRICE")
            .ok_or_else(|| ConfigError::MissingEnv("CURRENT_PRICE".to_string()))
            .and_then(|s| {
                Decimal::from_str_canonical(s).map_err(|_| {
                    ConfigError::InvalidValue(
                        "CURRENT_PRICE".to_string(),
                        "must be a decimal number".to_string(),
                    )
                })
            })?;

        let trading_fee_currency = Currency::new(
            env_map
                .get("TRADING_FEE_CURRENCY")
                .map(|s| s.as_str())
                .unwrap_or("BNB")
                .to_ascii_uppercase(),
        );

        let (base_currency, quote_currency) = match (
            env_map.get("BASE_CURRENCY"),
            env_map.get("QUOTE_CURRENCY"),
        ) {
            (Some(base), Some(quote)) => (
                Currency::new(base.to_ascii_uppercase()),
                Currency::new(quote.to_ascii_uppercase()),
            ),
            _ => split_symbol(&symbol).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SYMBOL".to_string(),
                    format!(
                        "cannot derive currencies from {}, set BASE_CURRENCY and QUOTE_CURRENCY",
                        symbol
                    ),
                )
            })?,
        };

        let price_precision = parse_u32(&env_map, "PRICE_PRECISION", 2)?;
        let volume_precision = parse_u32(&env_map, "VOLUME_PRECISION", 8)?;
        if price_precision
            .checked_add(volume_precision)
            .map_or(true, |total| total > 28)
        {
            return Err(ConfigError::InvalidValue(
                "VOLUME_PRECISION".to_string(),
                "price and volume precision together must not exceed 28".to_string(),
            ));
        }

        let pnl_since = env_map
            .get("PNL_SINCE_MS")
            .map(|s| {
                s.parse::<i64>().map(TimeMs::new).map_err(|_| {
                    ConfigError::InvalidValue(
                        "PNL_SINCE_MS".to_string(),
                        "must be a valid i64".to_string(),
                    )
                })
            })
            .transpose()?;

        let report_format = match env_map
            .get("REPORT_FORMAT")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
        {
            None | Some("text") => ReportFormat::Text,
            Some("json") => ReportFormat::Json,
            Some(_) => {
                return Err(ConfigError::InvalidValue(
                    "REPORT_FORMAT".to_string(),
                    "must be text or json".to_string(),
                ))
            }
        };

        Ok(Config {
            symbol: Symbol::new(symbol),
            trades_csv_path,
            current_price,
            trading_fee_currency,
            base_currency,
            quote_currency,
            price_precision,
            volume_precision,
            pnl_since,
            report_format,
        })
    }

    pub fn market(&self) -> Market {
        Market::new(
            self.symbol.clone(),
            self.base_currency.clone(),
            self.quote_currency.clone(),
            self.price_precision,
            self.volume_precision,
        )
    }
}

fn parse_u32(env_map: &HashMap<String, String>, key: &str, default: u32) -> Result<u32, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(s) => s.parse::<u32>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid u32".to_string())
        }),
    }
}

/// Split e.g. "BTCUSDT" into ("BTC", "USDT").
fn split_symbol(symbol: &str) -> Option<(Currency, Currency)> {
    KNOWN_QUOTE_CURRENCIES.iter().find_map(|quote| {
        symbol
            .strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (Currency::new(base), Currency::new(*quote)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("SYMBOL".to_string(), "btcusdt".to_string());
        map.insert("TRADES_CSV_PATH".to_string(), "/tmp/trades.csv".to_string());
        map.insert("CURRENT_PRICE".to_string(), "27000.5".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.symbol, Symbol::new("BTCUSDT"));
        assert_eq!(config.base_currency, Currency::new("BTC"));
        assert_eq!(config.quote_currency, Currency::new("USDT"));
        assert_eq!(config.trading_fee_currency, Currency::new("BNB"));
        assert_eq!(config.price_precision, 2);
        assert_eq!(config.volume_precision, 8);
        assert_eq!(config.pnl_since, None);
        assert_eq!(config.report_format, ReportFormat::Text);
        assert_eq!(config.market().average_cost_scale(), 10);
    }

    #[test]
    fn test_missing_symbol() {
        let mut env_map = setup_required_env();
        env_map.remove("SYMBOL");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "SYMBOL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_trades_csv_path() {
        let mut env_map = setup_required_env();
        env_map.remove("TRADES_CSV_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "TRADES_CSV_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_current_price() {
        let mut env_map = setup_required_env();
        env_map.insert("CURRENT_PRICE".to_string(), "cheap".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CURRENT_PRICE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_unsplittable_symbol_needs_explicit_currencies() {
        let mut env_map = setup_required_env();
        env_map.insert("SYMBOL".to_string(), "XYZABC".to_string());
        assert!(matches!(
            Config::from_env_map(env_map.clone()),
            Err(ConfigError::InvalidValue(k, _)) if k == "SYMBOL"
        ));

        env_map.insert("BASE_CURRENCY".to_string(), "xyz".to_string());
        env_map.insert("QUOTE_CURRENCY".to_string(), "abc".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.base_currency, Currency::new("XYZ"));
        assert_eq!(config.quote_currency, Currency::new("ABC"));
    }

    #[test]
    fn test_pnl_since() {
        let mut env_map = setup_required_env();
        env_map.insert("PNL_SINCE_MS".to_string(), "1700000000000".to_string());
        let config = Config::from_env_map(env_map.clone()).unwrap();
        assert_eq!(config.pnl_since, Some(TimeMs::new(1_700_000_000_000)));

        env_map.insert("PNL_SINCE_MS".to_string(), "yesterday".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PNL_SINCE_MS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_report_format() {
        let mut env_map = setup_required_env();
        env_map.insert("REPORT_FORMAT".to_string(), "JSON".to_string());
        assert_eq!(
            Config::from_env_map(env_map.clone()).unwrap().report_format,
            ReportFormat::Json
        );

        env_map.insert("REPORT_FORMAT".to_string(), "yaml".to_string());
        assert!(matches!(
            Config::from_env_map(env_map),
            Err(ConfigError::InvalidValue(k, _)) if k == "REPORT_FORMAT"
        ));
    }

    #[test]
    fn test_huge_precision_does_not_overflow() {
        let mut env_map = setup_required_env();
        env_map.insert("PRICE_PRECISION".to_string(), u32::MAX.to_string());
        env_map.insert("VOLUME_PRECISION".to_string(), "8".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "VOLUME_PRECISION"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_precision_overflow_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("PRICE_PRECISION".to_string(), "20".to_string());
        env_map.insert("VOLUME_PRECISION".to_string(), "10".to_string());
        assert!(matches!(
            Config::from_env_map(env_map),
            Err(ConfigError::InvalidValue(_, _))
        ));
    }
}
