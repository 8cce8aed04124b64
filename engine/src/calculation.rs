use crate::linker::TicketSummary;
use crate::record::{EnrichedRecord, OrderRecord};

/// `price * quantity`; a missing operand makes the product 0 rather than null.
pub fn revenue(price: Option<f64>, quantity: Option<f64>) -> f64 {
    match (price, quantity) {
        (Some(p), Some(q)) => p * q,
        _ => 0.0,
    }
}

/// Reads an orders-side return cell. Boolean words give that answer, any
/// other non-empty reference means the order was returned, an empty cell
/// has no opinion.
pub fn return_opinion(cell: Option<&str>) -> Option<bool> {
    let value = cell.map(str::trim).filter(|s| !s.is_empty())?;
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => Some(true),
    }
}

/// Derives revenue and the return/ticket signals for a batch of orders.
/// `linked_returns` and `tickets` are aligned with the orders' rows.
pub struct Calculation<'a> {
    linked_returns: &'a [bool],
    tickets: &'a [TicketSummary],
}

impl<'a> Calculation<'a> {
    pub fn new(linked_returns: &'a [bool], tickets: &'a [TicketSummary]) -> Self {
        Calculation {
            linked_returns,
            tickets,
        }
    }

    pub fn calculate(&self, orders: Vec<OrderRecord>) -> Vec<EnrichedRecord> {
        orders
            .into_iter()
            .enumerate()
            .map(|(row, order)| {
                let linked = self.linked_returns.get(row).copied().unwrap_or(false);
                // the record's own column is authoritative when it has a value
                let has_return = return_opinion(order.direct_return.as_deref()).unwrap_or(linked);
                let tickets = self.tickets.get(row).cloned().unwrap_or_default();

                EnrichedRecord {
                    revenue: revenue(order.price, order.quantity),
                    has_return,
                    ticket_count: tickets.ticket_count,
                    top_topic: tickets.top_topic,
                    transaction_id: order.transaction_id,
                    date: order.date,
                    product_category: order.product_category,
                    product_name: order.product_name,
                    price: order.price,
                    quantity: order.quantity,
                    payment_status: order.payment_status,
                }
            })
            .collect()
    }
}
