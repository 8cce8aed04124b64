use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::EnrichedRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoRow {
    pub product: String,
    pub returns: usize,
    pub cum_returns: usize,
    pub cum_returns_pct: f64,
    pub cum_products: usize,
    pub cum_products_pct: f64,
    pub vital_few: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Pareto {
    NotApplicable {
        reason: String,
    },
    Curve {
        rows: Vec<ParetoRow>,
        /// Length of the shortest prefix reaching `target_pct` of returns.
        vital_few: usize,
        target_pct: f64,
        total_returns: usize,
        total_products: usize,
    },
}

impl Pareto {
    pub fn rows(&self) -> &[ParetoRow] {
        match self {
            Pareto::Curve { rows, .. } => rows,
            Pareto::NotApplicable { .. } => &[],
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Pareto::Curve { .. })
    }
}

fn share(part: usize, total: usize) -> f64 {
    if part == total {
        // exact at the tail, no rounding drift
        100.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Return concentration by product: products ranked by returns with the
/// cumulative share of returns and of the product catalogue.
pub fn pareto_over_data(records: &[&EnrichedRecord], target_pct: f64) -> Pareto {
    let mut returns: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        let count = returns.entry(record.product_name.as_str()).or_insert(0);
        if record.has_return {
            *count += 1;
        }
    }

    let total_returns: usize = returns.values().sum();
    let total_products = returns.len();
    if total_returns == 0 {
        let reason = if records.is_empty() {
            "no records in view".to_string()
        } else {
            format!("no returns across {} products", total_products)
        };
        log::info!("Pareto not applicable: {}", reason);
        return Pareto::NotApplicable { reason };
    }

    let mut ranked: Vec<(&str, usize)> = returns.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut rows = Vec::with_capacity(ranked.len());
    let mut cum_returns = 0;
    let mut vital_few = 0;
    for (index, (product, count)) in ranked.into_iter().enumerate() {
        // a row belongs to the vital few while the share before it is short
        // of the target
        let in_vital_few = (cum_returns as f64) * 100.0 < target_pct * total_returns as f64;
        cum_returns += count;
        if in_vital_few {
            vital_few += 1;
        }
        rows.push(ParetoRow {
            product: product.to_string(),
            returns: count,
            cum_returns,
            cum_returns_pct: share(cum_returns, total_returns),
            cum_products: index + 1,
            cum_products_pct: share(index + 1, total_products),
            vital_few: in_vital_few,
        });
    }

    Pareto::Curve {
        rows,
        vital_few,
        target_pct,
        total_returns,
        total_products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fixtures::{refs, RecordBuilder};

    fn returns(product: &str, returned: usize, kept: usize) -> Vec<EnrichedRecord> {
        let mut out = Vec::new();
        for i in 0..returned {
            out.push(
                RecordBuilder::new(&format!("{}-r{}", product, i), "Audio", product)
                    .returned()
                    .build(),
            );
        }
        for i in 0..kept {
            out.push(RecordBuilder::new(&format!("{}-k{}", product, i), "Audio", product).build());
        }
        out
    }

    #[test]
    fn test_curve_is_monotone_and_ends_at_100() {
        let mut records = returns("Speaker", 6, 1);
        records.extend(returns("Headphones", 3, 0));
        records.extend(returns("Hub", 1, 4));
        records.extend(returns("Band", 0, 2));

        let pareto = pareto_over_data(&refs(&records), 80.0);
        let rows = pareto.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].product, "Speaker");

        for pair in rows.windows(2) {
            assert!(pair[0].cum_returns_pct <= pair[1].cum_returns_pct);
            assert!(pair[0].cum_products_pct < pair[1].cum_products_pct);
        }
        let last = rows.last().unwrap();
        assert_eq!(last.cum_returns_pct, 100.0);
        assert_eq!(last.cum_products_pct, 100.0);
        assert_eq!(last.cum_returns, 10);

        // 6/10 < 80%, 9/10 >= 80%
        match &pareto {
            Pareto::Curve { vital_few, total_returns, total_products, .. } => {
                assert_eq!(*vital_few, 2);
                assert_eq!(*total_returns, 10);
                assert_eq!(*total_products, 4);
            }
            other => panic!("expected a curve, got {:?}", other),
        }
        assert!(rows[1].vital_few);
        assert!(!rows[2].vital_few);
    }

    #[test]
    fn test_exact_target_stops_the_vital_few() {
        let mut records = returns("A", 4, 0);
        records.extend(returns("B", 1, 0));

        let pareto = pareto_over_data(&refs(&records), 80.0);
        let flags: Vec<bool> = pareto.rows().iter().map(|r| r.vital_few).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn test_zero_returns_is_not_applicable() {
        let records = returns("Speaker", 0, 3);
        let pareto = pareto_over_data(&refs(&records), 80.0);
        assert!(!pareto.is_applicable());
        assert!(pareto.rows().is_empty());

        assert!(matches!(
            pareto_over_data(&[], 80.0),
            Pareto::NotApplicable { .. }
        ));
    }
}
