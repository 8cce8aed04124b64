use serde::Serialize;

use super::GroupTotals;
use crate::record::EnrichedRecord;

/// Headline figures for a filtered view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub orders: usize,
    pub returns: usize,
    pub return_rate: f64,
    pub tickets: u64,
}

pub fn kpis_over_data(records: &[&EnrichedRecord]) -> Kpis {
    let mut totals = GroupTotals::default();
    for record in records {
        totals.add(record);
    }

    Kpis {
        total_revenue: totals.revenue,
        orders: totals.orders,
        returns: totals.returns,
        return_rate: totals.return_rate(),
        tickets: totals.tickets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fixtures::{refs, RecordBuilder};

    #[test]
    fn test_kpis() {
        let records = vec![
            RecordBuilder::new("T1", "Audio", "Headphones")
                .revenue(20.0)
                .returned()
                .tickets(2, "refund")
                .build(),
            RecordBuilder::new("T2", "Audio", "Headphones").revenue(5.0).build(),
            RecordBuilder::new("T3", "Audio", "Speaker").revenue(-3.0).build(),
            RecordBuilder::new("T4", "Audio", "Speaker").build(),
        ];

        let kpis = kpis_over_data(&refs(&records));
        assert_eq!(kpis.total_revenue, 22.0);
        assert_eq!(kpis.orders, 4);
        assert_eq!(kpis.returns, 1);
        assert_eq!(kpis.return_rate, 25.0);
        assert_eq!(kpis.tickets, 2);
    }

    #[test]
    fn test_empty_view_has_zero_rate() {
        let kpis = kpis_over_data(&[]);
        assert_eq!(kpis, Kpis::default());
    }
}
