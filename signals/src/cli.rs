use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use signals_engine::config::EngineConfig;
use signals_engine::filter::{DateRange, Selection};

#[derive(Parser, Debug)]
#[command(
    name = "signals",
    version,
    about = "Reconcile orders, returns and support tickets into return-risk views"
)]
pub struct Args {
    /// JSON config file (defaults to SIGNALS_* variables and .env)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Orders file (.csv, .tsv, .json, .jsonl, .xlsx)
    #[arg(long = "orders")]
    pub orders: Option<PathBuf>,

    /// Returns file
    #[arg(long = "returns")]
    pub returns: Option<PathBuf>,

    /// Support tickets file
    #[arg(long = "tickets")]
    pub tickets: Option<PathBuf>,

    /// weekly or monthly
    #[arg(long = "period")]
    pub period: Option<String>,

    #[arg(long = "top-n")]
    pub top_n: Option<usize>,

    /// Keep only these categories (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Keep only these products (repeatable)
    #[arg(long = "product")]
    pub products: Vec<String>,

    /// Keep only these payment statuses (repeatable)
    #[arg(long = "payment")]
    pub payments: Vec<String>,

    /// First day to include, YYYY-MM-DD
    #[arg(long = "from")]
    pub from: Option<NaiveDate>,

    /// Last day to include, YYYY-MM-DD
    #[arg(long = "to")]
    pub to: Option<NaiveDate>,

    /// Directory for the CSV exports
    #[arg(short = 'o', long = "out-dir", default_value = "out")]
    pub out_dir: PathBuf,
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

impl Args {
    /// A flag that was never given leaves its dimension unfiltered.
    pub fn selection(&self) -> Selection {
        let mut selection = Selection::all();
        if let Some(categories) = non_empty(&self.categories) {
            selection = selection.with_categories(categories);
        }
        if let Some(products) = non_empty(&self.products) {
            selection = selection.with_products(products);
        }
        if let Some(payments) = non_empty(&self.payments) {
            selection = selection.with_payment_statuses(payments);
        }
        if self.from.is_some() || self.to.is_some() {
            selection = selection.with_date_range(DateRange::from_dates(self.from, self.to));
        }
        selection
    }

    /// Layers the flags that were given over `config`.
    pub fn apply(&self, mut config: EngineConfig) -> Result<EngineConfig, String> {
        if let Some(orders) = &self.orders {
            config.orders_path = orders.clone();
        }
        if let Some(returns) = &self.returns {
            config.returns_path = Some(returns.clone());
        }
        if let Some(tickets) = &self.tickets {
            config.tickets_path = Some(tickets.clone());
        }
        if let Some(period) = &self.period {
            config.period = period.parse()?;
        }
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}
