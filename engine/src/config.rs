use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dotenv::dotenv;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::utils::time_series::Period;

pub const DEFAULT_TOP_N: usize = 15;
pub const DEFAULT_PARETO_TARGET_PCT: f64 = 80.0;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Candidate column names for the order fields, in standardized form and
/// ranked: the first one present in a source wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub transaction_id: Vec<String>,
    pub date: Vec<String>,
    pub price: Vec<String>,
    pub quantity: Vec<String>,
    pub product_category: Vec<String>,
    pub product_name: Vec<String>,
    pub payment_status: Vec<String>,
    /// Orders-side column carrying a per-record return flag or reference.
    pub direct_return: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            transaction_id: names(&["transaction_id", "transactionid", "order_id", "orderid"]),
            date: names(&["date", "order_date", "transaction_date"]),
            price: names(&["price", "unit_price"]),
            quantity: names(&["quantity", "qty"]),
            product_category: names(&["product_category", "category"]),
            product_name: names(&["product_name", "product"]),
            payment_status: names(&["payment_status", "payment"]),
            direct_return: names(&[
                "has_return",
                "returned",
                "is_returned",
                "return_id",
                "return_reference",
                "return_ref",
            ]),
        }
    }
}

/// Foreign-side join key candidates for the cross-source linker. The
/// orders side always joins on the `transaction_id` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub returns: Vec<String>,
    pub tickets: Vec<String>,
    pub topic: Vec<String>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig {
            returns: names(&[
                "original_tx_id",
                "original_transaction_id",
                "transaction_id",
                "transactionid",
                "order_id",
                "orderid",
            ]),
            tickets: names(&["transaction_id", "transactionid", "order_id", "orderid"]),
            topic: names(&["topic", "ticket_topic", "issue_topic"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub orders_path: PathBuf,
    pub returns_path: Option<PathBuf>,
    pub tickets_path: Option<PathBuf>,
    pub period: Period,
    pub top_n: usize,
    pub pareto_target_pct: f64,
    pub columns: ColumnConfig,
    pub keys: KeyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            orders_path: PathBuf::from("orders_raw.csv"),
            returns_path: None,
            tickets_path: None,
            period: Period::Weekly,
            top_n: DEFAULT_TOP_N,
            pareto_target_pct: DEFAULT_PARETO_TARGET_PCT,
            columns: ColumnConfig::default(),
            keys: KeyConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text).map_err(|e| {
            EngineError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `.env` if present, then layers `SIGNALS_*` variables over the
    /// defaults (or over the JSON file named by `SIGNALS_CONFIG`).
    pub fn from_env() -> Result<Self, EngineError> {
        dotenv().ok();

        let base = match env::var("SIGNALS_CONFIG") {
            Ok(path) => EngineConfig::from_json_file(path)?,
            Err(_) => EngineConfig::default(),
        };
        base.with_overrides(env::vars())
    }

    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "SIGNALS_ORDERS" => self.orders_path = PathBuf::from(value),
                "SIGNALS_RETURNS" => self.returns_path = non_empty_path(value),
                "SIGNALS_TICKETS" => self.tickets_path = non_empty_path(value),
                "SIGNALS_PERIOD" => {
                    self.period = value.parse().map_err(EngineError::Configuration)?;
                }
                "SIGNALS_TOP_N" => {
                    self.top_n = value.parse().map_err(|e| {
                        EngineError::Configuration(format!("SIGNALS_TOP_N '{}': {}", value, e))
                    })?;
                }
                "SIGNALS_PARETO_TARGET" => {
                    self.pareto_target_pct = value.parse().map_err(|e| {
                        EngineError::Configuration(format!(
                            "SIGNALS_PARETO_TARGET '{}': {}",
                            value, e
                        ))
                    })?;
                }
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.top_n == 0 {
            return Err(EngineError::Configuration(
                "top_n must be at least 1".to_string(),
            ));
        }
        if !(self.pareto_target_pct > 0.0 && self.pareto_target_pct <= 100.0) {
            return Err(EngineError::Configuration(format!(
                "pareto_target_pct must be in (0, 100], got {}",
                self.pareto_target_pct
            )));
        }
        if self.columns.transaction_id.is_empty() || self.columns.date.is_empty() {
            return Err(EngineError::Configuration(
                "identifier and date candidates cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;

    #[test]
    fn test_overrides_apply() {
        let config = EngineConfig::default()
            .with_overrides(vec![
                ("SIGNALS_ORDERS", "data/orders.csv"),
                ("SIGNALS_RETURNS", "data/returns.csv"),
                ("SIGNALS_TICKETS", ""),
                ("SIGNALS_PERIOD", "monthly"),
                ("SIGNALS_TOP_N", "5"),
                ("UNRELATED", "ignored"),
            ])
            .unwrap();

        assert_eq!(config.orders_path, PathBuf::from("data/orders.csv"));
        assert_eq!(config.returns_path, Some(PathBuf::from("data/returns.csv")));
        assert_eq!(config.tickets_path, None);
        assert_eq!(config.period, Period::Monthly);
        assert_eq!(config.top_n, 5);
    }

    #[test]
    fn test_bad_values_are_configuration_errors() {
        let bad_top_n = EngineConfig::default().with_overrides(vec![("SIGNALS_TOP_N", "many")]);
        assert!(matches!(bad_top_n, Err(EngineError::Configuration(_))));

        let zero = EngineConfig::default().with_overrides(vec![("SIGNALS_TOP_N", "0")]);
        assert!(matches!(zero, Err(EngineError::Configuration(_))));

        let target = EngineConfig::default().with_overrides(vec![("SIGNALS_PARETO_TARGET", "120")]);
        assert!(matches!(target, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_json_file_fills_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            indoc! {r#"
                {
                    "orders_path": "orders.csv",
                    "period": "monthly",
                    "keys": { "returns": ["ref"] }
                }
            "#}
            .as_bytes(),
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.period, Period::Monthly);
        assert_eq!(config.keys.returns, vec!["ref".to_string()]);
        assert_eq!(config.keys.tickets, KeyConfig::default().tickets);
        assert_eq!(config.columns, ColumnConfig::default());
        assert_eq!(config.top_n, DEFAULT_TOP_N);
    }
}
