use std::path::Path;

use serde::Serialize;

use crate::calculation::Calculation;
use crate::config::EngineConfig;
use crate::controllers::sources::RawTable;
use crate::error::EngineError;
use crate::linker::{aggregate_tickets, link, LinkStatus, Linkage, TicketLinkage};
use crate::normalizer::{canonicalize, resolve_identifier, NormalizeStats};
use crate::record::EnrichedRecord;

/// A returns or tickets source. Failing to read one degrades the batch
/// instead of stopping it.
#[derive(Debug, Clone)]
pub enum OptionalSource {
    NotConfigured,
    Unavailable(String),
    Loaded(RawTable),
}

impl OptionalSource {
    pub fn load(name: &str, path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("No {} source configured", name);
            return OptionalSource::NotConfigured;
        };

        match RawTable::load(name, path) {
            Ok(table) => OptionalSource::Loaded(table),
            Err(e) => {
                log::warn!(
                    "{} source {} unavailable, continuing without it: {}",
                    name,
                    path.display(),
                    e
                );
                OptionalSource::Unavailable(e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sources {
    pub orders: RawTable,
    pub returns: OptionalSource,
    pub tickets: OptionalSource,
}

impl Sources {
    /// The orders file must load; the optional sources only warn.
    pub fn load(config: &EngineConfig) -> Result<Self, EngineError> {
        Ok(Sources {
            orders: RawTable::load("orders", &config.orders_path)?,
            returns: OptionalSource::load("returns", config.returns_path.as_deref()),
            tickets: OptionalSource::load("tickets", config.tickets_path.as_deref()),
        })
    }
}

/// What the batch had to tolerate on its way to the enriched records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub orders: NormalizeStats,
    pub returns: LinkStatus,
    pub tickets: LinkStatus,
}

/// The enriched record set of one batch, before any selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub records: Vec<EnrichedRecord>,
    pub report: ReconcileReport,
}

pub fn reconcile(sources: &Sources, config: &EngineConfig) -> Result<Dataset, EngineError> {
    let orders = &sources.orders;
    let (canonical, stats) = canonicalize(orders, &config.columns)?;
    let order_key = resolve_identifier(orders, &config.columns)?;

    let returns = match &sources.returns {
        OptionalSource::Loaded(table) => {
            link(orders, order_key, table, &config.keys.returns)
        }
        OptionalSource::NotConfigured => {
            Linkage::unlinked(LinkStatus::NotConfigured, orders.height())
        }
        OptionalSource::Unavailable(reason) => Linkage::unlinked(
            LinkStatus::SourceMissing {
                reason: reason.clone(),
            },
            orders.height(),
        ),
    };

    let tickets = match &sources.tickets {
        OptionalSource::Loaded(table) => aggregate_tickets(
            orders,
            order_key,
            table,
            &config.keys.tickets,
            &config.keys.topic,
        ),
        OptionalSource::NotConfigured => {
            TicketLinkage::unlinked(LinkStatus::NotConfigured, orders.height())
        }
        OptionalSource::Unavailable(reason) => TicketLinkage::unlinked(
            LinkStatus::SourceMissing {
                reason: reason.clone(),
            },
            orders.height(),
        ),
    };

    let records = Calculation::new(&returns.flags, &tickets.summaries).calculate(canonical);
    let returned = records.iter().filter(|r| r.has_return).count();
    log::info!(
        "Reconciled {} orders: {} returned, {} with tickets",
        records.len(),
        returned,
        records.iter().filter(|r| r.ticket_count > 0).count()
    );

    Ok(Dataset {
        records,
        report: ReconcileReport {
            orders: stats,
            returns: returns.status,
            tickets: tickets.status,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NO_TICKETS;
    use polars::prelude::*;

    fn orders() -> RawTable {
        RawTable::from_frame(
            "orders",
            &df!(
                "Transaction ID" => ["T1", "T2"],
                "Date" => ["2024-01-05", "2024-01-06"],
                "Product Category" => ["Audio", "Audio"],
                "Product Name" => ["Headphones", "Headphones"],
                "Price" => ["10", "5"],
                "Quantity" => ["2", "1"],
                "Payment Status" => ["Paid", "Paid"],
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn loaded(name: &str, df: DataFrame) -> OptionalSource {
        OptionalSource::Loaded(RawTable::from_frame(name, &df).unwrap())
    }

    #[test]
    fn test_linked_returns_and_tickets() {
        let sources = Sources {
            orders: orders(),
            returns: loaded("returns", df!("Original_Tx_ID" => ["T1"]).unwrap()),
            tickets: loaded(
                "tickets",
                df!("order_id" => ["T1", "T1"], "topic" => ["refund", "refund"]).unwrap(),
            ),
        };

        let dataset = reconcile(&sources, &EngineConfig::default()).unwrap();
        let records = &dataset.records;

        assert_eq!(records[0].revenue, 20.0);
        assert!(records[0].has_return);
        assert_eq!(records[0].ticket_count, 2);
        assert_eq!(records[0].top_topic, "refund");
        assert_eq!(records[1].revenue, 5.0);
        assert!(!records[1].has_return);
        assert_eq!(records[1].top_topic, NO_TICKETS);
        assert!(dataset.report.returns.is_linked());
    }

    #[test]
    fn test_absent_returns_source() {
        let sources = Sources {
            orders: orders(),
            returns: OptionalSource::load("returns", Some(Path::new("/nonexistent/returns.csv"))),
            tickets: OptionalSource::NotConfigured,
        };

        let dataset = reconcile(&sources, &EngineConfig::default()).unwrap();
        assert!(dataset.records.iter().all(|r| !r.has_return));
        assert!(dataset.records.iter().all(|r| r.ticket_count == 0));
        assert!(matches!(
            dataset.report.returns,
            LinkStatus::SourceMissing { .. }
        ));
        assert_eq!(dataset.report.tickets, LinkStatus::NotConfigured);
    }

    #[test]
    fn test_unsupported_returns_format_degrades() {
        let source = OptionalSource::load("returns", Some(Path::new("returns.parquet")));
        assert!(matches!(source, OptionalSource::Unavailable(_)));
    }

    #[test]
    fn test_missing_identifier_is_schema_drift() {
        let sources = Sources {
            orders: RawTable::from_frame(
                "orders",
                &df!("Date" => ["2024-01-05"], "Price" => ["1"]).unwrap(),
            )
            .unwrap(),
            returns: OptionalSource::NotConfigured,
            tickets: OptionalSource::NotConfigured,
        };

        let err = reconcile(&sources, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::SchemaDrift { .. }));
    }

    #[test]
    fn test_links_on_configured_identifier_column() {
        let sources = Sources {
            orders: RawTable::from_frame(
                "orders",
                &df!(
                    "Invoice No" => ["INV-1", "INV-2"],
                    "Transaction ID" => ["INV-2", "INV-1"],
                    "Date" => ["2024-01-05", "2024-01-06"],
                )
                .unwrap(),
            )
            .unwrap(),
            returns: loaded("returns", df!("Original_Tx_ID" => ["INV-1"]).unwrap()),
            tickets: loaded("tickets", df!("order_id" => ["INV-1"]).unwrap()),
        };
        let mut config = EngineConfig::default();
        config.columns.transaction_id = vec!["Invoice No".to_string()];

        let dataset = reconcile(&sources, &config).unwrap();
        let records = &dataset.records;

        assert_eq!(records[0].transaction_id, "INV-1");
        assert!(records[0].has_return);
        assert_eq!(records[0].ticket_count, 1);
        assert!(!records[1].has_return);
        assert_eq!(records[1].ticket_count, 0);
        assert!(matches!(
            &dataset.report.returns,
            LinkStatus::Linked { order_key, .. } if order_key == "invoice_no"
        ));
    }

    #[test]
    fn test_returns_key_in_source_spelling() {
        let sources = Sources {
            orders: orders(),
            returns: loaded("returns", df!("Ref Order" => ["T2"]).unwrap()),
            tickets: OptionalSource::NotConfigured,
        };
        let mut config = EngineConfig::default();
        config.keys.returns = vec!["Ref Order".to_string()];

        let dataset = reconcile(&sources, &config).unwrap();
        assert!(!dataset.records[0].has_return);
        assert!(dataset.records[1].has_return);
        assert!(dataset.report.returns.is_linked());
    }

    #[test]
    fn test_null_tokens_do_not_count_as_returns() {
        let orders = RawTable::from_frame(
            "orders",
            &df!(
                "Transaction ID" => ["T1", "T2", "T3", "T4"],
                "Date" => ["2024-01-05", "2024-01-06", "2024-01-07", "2024-01-08"],
                "Product Category" => ["NA", "Audio", "nan", "Audio"],
                "Return_ID" => ["nan", "NA", "", "R-9"],
            )
            .unwrap(),
        )
        .unwrap();
        let sources = Sources {
            orders,
            returns: OptionalSource::NotConfigured,
            tickets: OptionalSource::NotConfigured,
        };

        let dataset = reconcile(&sources, &EngineConfig::default()).unwrap();
        let flags: Vec<bool> = dataset.records.iter().map(|r| r.has_return).collect();
        assert_eq!(flags, vec![false, false, false, true]);
        assert_eq!(dataset.records[0].product_category, "unknown");
        assert_eq!(dataset.records[2].product_category, "unknown");
        assert_eq!(dataset.records[1].product_category, "Audio");
    }
}
