use chrono::NaiveDateTime;
use serde::Serialize;

/// Categorical value for a missing column or an empty cell.
pub const UNKNOWN: &str = "unknown";
/// `top_topic` of an order nobody opened a ticket for.
pub const NO_TICKETS: &str = "no_tickets";
/// `top_topic` of an order whose tickets carry no topic.
pub const NO_TOPIC: &str = "n/a";

/// One order row after canonicalization, before any derived signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub transaction_id: String,
    pub date: Option<NaiveDateTime>,
    pub product_category: String,
    pub product_name: String,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub payment_status: String,
    /// Raw cell of the orders-side return column, if the source has one.
    pub direct_return: Option<String>,
}

/// An order augmented with the reconciled return and ticket signals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    pub transaction_id: String,
    pub date: Option<NaiveDateTime>,
    pub product_category: String,
    pub product_name: String,
    pub price: Option<f64>,
    pub quantity: Option<f64>,
    pub payment_status: String,
    pub revenue: f64,
    pub has_return: bool,
    pub ticket_count: u32,
    pub top_topic: String,
}

/// `returns / orders * 100`, or 0 for an empty group.
pub fn return_rate(returns: usize, orders: usize) -> f64 {
    if orders == 0 {
        0.0
    } else {
        returns as f64 / orders as f64 * 100.0
    }
}
