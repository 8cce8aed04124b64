use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::controllers::sources::RawTable;
use crate::normalizer::cell_text;
use crate::record::{NO_TICKETS, NO_TOPIC};

/// Outcome of reconciling one optional source against the orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    /// No path was configured for the source.
    NotConfigured,
    /// A path was configured but the file could not be used.
    SourceMissing { reason: String },
    /// None of the ranked candidates names a column of the foreign source.
    KeyMissing { order_key: String },
    Linked {
        order_key: String,
        foreign_key: String,
        matched: usize,
    },
}

impl LinkStatus {
    pub fn is_linked(&self) -> bool {
        matches!(self, LinkStatus::Linked { .. })
    }
}

/// Per-order membership flags, aligned with the orders' rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Linkage {
    pub status: LinkStatus,
    pub flags: Vec<bool>,
}

impl Linkage {
    pub fn unlinked(status: LinkStatus, orders: usize) -> Self {
        Linkage {
            status,
            flags: vec![false; orders],
        }
    }
}

fn resolve_foreign_key<'t>(
    foreign: &'t RawTable,
    order_key: &str,
    candidates: &[String],
) -> Result<&'t str, LinkStatus> {
    foreign.resolve(candidates).ok_or_else(|| {
        log::warn!(
            "{}: none of {:?} is a column, linkage on {} skipped",
            foreign.name(),
            candidates,
            order_key
        );
        LinkStatus::KeyMissing {
            order_key: order_key.to_string(),
        }
    })
}

/// Set of trimmed, non-empty key values in a column.
pub fn key_set(column: &[Option<String>]) -> HashSet<&str> {
    column.iter().filter_map(cell_text).collect()
}

/// Marks each order whose trimmed key appears in the foreign key column.
/// A set-membership test, so duplicate foreign rows never multiply orders.
/// `order_key` is the orders' identifier column.
pub fn link(
    orders: &RawTable,
    order_key: &str,
    foreign: &RawTable,
    foreign_candidates: &[String],
) -> Linkage {
    let foreign_key = match resolve_foreign_key(foreign, order_key, foreign_candidates) {
        Ok(key) => key,
        Err(status) => return Linkage::unlinked(status, orders.height()),
    };

    let (Some(order_column), Some(foreign_column)) =
        (orders.column(order_key), foreign.column(foreign_key))
    else {
        return Linkage::unlinked(
            LinkStatus::KeyMissing {
                order_key: order_key.to_string(),
            },
            orders.height(),
        );
    };

    let referenced = key_set(foreign_column);
    let flags: Vec<bool> = order_column
        .iter()
        .map(|cell| cell_text(cell).is_some_and(|id| referenced.contains(id)))
        .collect();
    let matched = flags.iter().filter(|f| **f).count();

    log::info!(
        "{}: linked {} of {} orders on {} = {} ({} distinct references)",
        foreign.name(),
        matched,
        orders.height(),
        order_key,
        foreign_key,
        referenced.len()
    );

    Linkage {
        status: LinkStatus::Linked {
            order_key: order_key.to_string(),
            foreign_key: foreign_key.to_string(),
            matched,
        },
        flags,
    }
}

/// Most frequent value; ties go to the lexicographically smallest value so
/// the result never depends on input order.
pub fn modal_value<'a, I>(values: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: BTreeMap<&'a str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }

    // BTreeMap iterates in ascending key order and max_by_key keeps the
    // last maximum, so walk it reversed.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(value, _)| value)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketSummary {
    pub ticket_count: u32,
    pub top_topic: String,
}

impl Default for TicketSummary {
    fn default() -> Self {
        TicketSummary {
            ticket_count: 0,
            top_topic: NO_TICKETS.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketLinkage {
    pub status: LinkStatus,
    pub summaries: Vec<TicketSummary>,
}

impl TicketLinkage {
    pub fn unlinked(status: LinkStatus, orders: usize) -> Self {
        TicketLinkage {
            status,
            summaries: vec![TicketSummary::default(); orders],
        }
    }
}

/// Rolls tickets up per order key into a count and the modal topic.
pub fn aggregate_tickets(
    orders: &RawTable,
    order_key: &str,
    tickets: &RawTable,
    ticket_candidates: &[String],
    topic_candidates: &[String],
) -> TicketLinkage {
    let ticket_key = match resolve_foreign_key(tickets, order_key, ticket_candidates) {
        Ok(key) => key,
        Err(status) => return TicketLinkage::unlinked(status, orders.height()),
    };

    let (Some(order_column), Some(ticket_column)) =
        (orders.column(order_key), tickets.column(ticket_key))
    else {
        return TicketLinkage::unlinked(
            LinkStatus::KeyMissing {
                order_key: order_key.to_string(),
            },
            orders.height(),
        );
    };

    let topics = tickets
        .resolve(topic_candidates)
        .and_then(|key| tickets.column(key));
    if topics.is_none() {
        log::warn!("{}: no topic column, top_topic will be '{}'", tickets.name(), NO_TOPIC);
    }

    // key -> (ticket rows, topics seen)
    let mut groups: HashMap<&str, (u32, Vec<&str>)> = HashMap::new();
    for (row, cell) in ticket_column.iter().enumerate() {
        let Some(key) = cell_text(cell) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((0, Vec::new()));
        entry.0 += 1;
        if let Some(topic) = topics.and_then(|t| cell_text(&t[row])) {
            entry.1.push(topic);
        }
    }

    let summaries: Vec<TicketSummary> = order_column
        .iter()
        .map(|cell| {
            match cell_text(cell).and_then(|id| groups.get(id)) {
                Some((count, seen)) => TicketSummary {
                    ticket_count: *count,
                    top_topic: modal_value(seen.iter().copied())
                        .unwrap_or(NO_TOPIC)
                        .to_string(),
                },
                None => TicketSummary::default(),
            }
        })
        .collect();
    let matched = summaries.iter().filter(|s| s.ticket_count > 0).count();

    log::info!(
        "{}: {} of {} orders have tickets ({} ticket keys) on {} = {}",
        tickets.name(),
        matched,
        orders.height(),
        groups.len(),
        order_key,
        ticket_key
    );

    TicketLinkage {
        status: LinkStatus::Linked {
            order_key: order_key.to_string(),
            foreign_key: ticket_key.to_string(),
            matched,
        },
        summaries,
    }
}
