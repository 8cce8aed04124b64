use std::collections::BTreeMap;

use serde::Serialize;

use super::GroupTotals;
use crate::record::EnrichedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    CategoryProduct,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub category: String,
    /// Only set when grouping by `Dimension::CategoryProduct`.
    pub product: Option<String>,
    pub orders: usize,
    pub returns: usize,
    pub revenue: f64,
    pub avg_tickets: f64,
    pub return_rate: f64,
}

/// Groups records along `dimension`, highest return rate first. Ties keep
/// the key order of the groups.
pub fn segments_over_data(records: &[&EnrichedRecord], dimension: Dimension) -> Vec<Segment> {
    let mut groups: BTreeMap<(&str, Option<&str>), GroupTotals> = BTreeMap::new();
    for record in records {
        let product = match dimension {
            Dimension::Category => None,
            Dimension::CategoryProduct => Some(record.product_name.as_str()),
        };
        groups
            .entry((record.product_category.as_str(), product))
            .or_default()
            .add(record);
    }

    let mut segments: Vec<Segment> = groups
        .into_iter()
        .map(|((category, product), totals)| Segment {
            category: category.to_string(),
            product: product.map(str::to_string),
            orders: totals.orders,
            returns: totals.returns,
            revenue: totals.revenue,
            avg_tickets: totals.avg_tickets(),
            return_rate: totals.return_rate(),
        })
        .collect();

    segments.sort_by(|a, b| b.return_rate.total_cmp(&a.return_rate));
    segments
}
