pub mod frame;
pub mod kpi;
pub mod pareto;
pub mod ranking;
pub mod segments;
pub mod time_series;

use crate::record::{return_rate, EnrichedRecord};

/// Running sums shared by the grouped rollups.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct GroupTotals {
    pub orders: usize,
    pub returns: usize,
    pub revenue: f64,
    pub tickets: u64,
}

impl GroupTotals {
    pub fn add(&mut self, record: &EnrichedRecord) {
        self.orders += 1;
        if record.has_return {
            self.returns += 1;
        }
        self.revenue += record.revenue;
        self.tickets += u64::from(record.ticket_count);
    }

    pub fn return_rate(&self) -> f64 {
        return_rate(self.returns, self.orders)
    }

    pub fn avg_tickets(&self) -> f64 {
        if self.orders == 0 {
            0.0
        } else {
            self.tickets as f64 / self.orders as f64
        }
    }
}
