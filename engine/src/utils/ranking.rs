use std::collections::BTreeMap;

use serde::Serialize;

use super::GroupTotals;
use crate::linker::modal_value;
use crate::record::{EnrichedRecord, NO_TICKETS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCase {
    pub category: String,
    pub product: String,
    pub orders: usize,
    pub returns: usize,
    pub return_rate: f64,
    pub revenue: f64,
    pub tickets: u64,
    pub top_topic: String,
}

/// The `n` (category, product) pairs with the most returns, then the
/// highest return rate. Equal pairs stay in key order.
pub fn top_cases_over_data(records: &[&EnrichedRecord], n: usize) -> Vec<TopCase> {
    let mut groups: BTreeMap<(&str, &str), (GroupTotals, Vec<&str>)> = BTreeMap::new();
    for record in records {
        let (totals, topics) = groups
            .entry((record.product_category.as_str(), record.product_name.as_str()))
            .or_default();
        totals.add(record);
        topics.push(record.top_topic.as_str());
    }

    let mut cases: Vec<TopCase> = groups
        .into_iter()
        .map(|((category, product), (totals, topics))| TopCase {
            category: category.to_string(),
            product: product.to_string(),
            orders: totals.orders,
            returns: totals.returns,
            return_rate: totals.return_rate(),
            revenue: totals.revenue,
            tickets: totals.tickets,
            top_topic: modal_value(topics).unwrap_or(NO_TICKETS).to_string(),
        })
        .collect();

    cases.sort_by(|a, b| {
        b.returns
            .cmp(&a.returns)
            .then_with(|| b.return_rate.total_cmp(&a.return_rate))
    });
    cases.truncate(n);
    cases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fixtures::{refs, RecordBuilder};

    #[test]
    fn test_ranked_by_returns_then_rate() {
        let records = vec![
            RecordBuilder::new("T1", "Audio", "Speaker").returned().build(),
            RecordBuilder::new("T2", "Audio", "Speaker").build(),
            RecordBuilder::new("T3", "Audio", "Speaker").build(),
            RecordBuilder::new("T4", "Cameras", "Dashcam").returned().build(),
            RecordBuilder::new("T5", "Smart Home", "Hub").returned().build(),
            RecordBuilder::new("T6", "Smart Home", "Hub").returned().build(),
            RecordBuilder::new("T7", "Wearables", "Band").build(),
        ];

        let cases = top_cases_over_data(&refs(&records), 15);
        let products: Vec<&str> = cases.iter().map(|c| c.product.as_str()).collect();
        assert_eq!(products, vec!["Hub", "Dashcam", "Speaker", "Band"]);
        assert_eq!(cases[0].returns, 2);
        assert_eq!(cases[1].return_rate, 100.0);
    }

    #[test]
    fn test_equal_keys_keep_group_order() {
        // every pair has one order and no returns
        let records = vec![
            RecordBuilder::new("T1", "Wearables", "Band").build(),
            RecordBuilder::new("T2", "Audio", "Speaker").build(),
            RecordBuilder::new("T3", "Audio", "Headphones").build(),
        ];

        let first = top_cases_over_data(&refs(&records), 2);
        let reversed: Vec<_> = records.iter().rev().collect();
        let second = top_cases_over_data(&reversed, 2);

        assert_eq!(first, second);
        assert_eq!(first[0].product, "Headphones");
        assert_eq!(first[1].product, "Speaker");
    }

    #[test]
    fn test_top_topic_is_modal() {
        let records = vec![
            RecordBuilder::new("T1", "Audio", "Speaker")
                .tickets(1, "sound")
                .build(),
            RecordBuilder::new("T2", "Audio", "Speaker")
                .tickets(2, "delivery")
                .build(),
            RecordBuilder::new("T3", "Audio", "Speaker").build(),
            RecordBuilder::new("T4", "Audio", "Speaker").build(),
        ];

        let cases = top_cases_over_data(&refs(&records), 5);
        assert_eq!(cases[0].tickets, 3);
        assert_eq!(cases[0].top_topic, NO_TICKETS);
    }
}
