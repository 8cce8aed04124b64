use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::ColumnConfig;
use crate::controllers::sources::RawTable;
use crate::error::EngineError;
use crate::record::{OrderRecord, UNKNOWN};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z"];

// Month-first for slashed day/month/year, dotted is day-first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];

/// Parses a timestamp or a calendar date (midnight). Offsets are dropped and
/// the wall-clock time kept.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Boundary-trimmed, non-empty cell text.
pub fn cell_text(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_column<'t>(table: &'t RawTable, candidates: &[String]) -> Option<&'t [Option<String>]> {
    table.resolve(candidates).and_then(|key| table.column(key))
}

/// The orders' identifier column. Records take their `transaction_id` from
/// it and the linker joins on it.
pub fn resolve_identifier<'t>(
    table: &'t RawTable,
    columns: &ColumnConfig,
) -> Result<&'t str, EngineError> {
    table.resolve(&columns.transaction_id).ok_or_else(|| {
        EngineError::schema_drift(
            table.name(),
            format!(
                "no identifier column (looked for: {})",
                columns.transaction_id.join(", ")
            ),
        )
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeStats {
    pub rows: usize,
    pub malformed_dates: usize,
    pub malformed_numbers: usize,
    pub missing_ids: usize,
    pub duplicate_ids: usize,
}

/// Single canonicalization step for the orders source: resolves every
/// field once, types the cells, and supplies defaults for absent optional
/// columns. Emits exactly one record per input row.
pub fn canonicalize(
    table: &RawTable,
    columns: &ColumnConfig,
) -> Result<(Vec<OrderRecord>, NormalizeStats), EngineError> {
    let source = table.name();

    let id_key = resolve_identifier(table, columns)?;
    let ids = table
        .column(id_key)
        .ok_or_else(|| EngineError::schema_drift(source, format!("column '{}' vanished", id_key)))?;
    let dates = resolve_column(table, &columns.date).ok_or_else(|| {
        EngineError::schema_drift(
            source,
            format!("no date column (looked for: {})", columns.date.join(", ")),
        )
    })?;

    let prices = resolve_column(table, &columns.price);
    let quantities = resolve_column(table, &columns.quantity);
    let categories = resolve_column(table, &columns.product_category);
    let products = resolve_column(table, &columns.product_name);
    let payments = resolve_column(table, &columns.payment_status);
    let direct = resolve_column(table, &columns.direct_return);

    for (field, present) in [
        ("price", prices.is_some()),
        ("quantity", quantities.is_some()),
        ("product_category", categories.is_some()),
        ("product_name", products.is_some()),
        ("payment_status", payments.is_some()),
    ] {
        if !present {
            log::warn!("{}: no {} column, using defaults", source, field);
        }
    }

    let mut stats = NormalizeStats {
        rows: table.height(),
        ..NormalizeStats::default()
    };
    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut records = Vec::with_capacity(table.height());

    for row in 0..table.height() {
        let transaction_id = match cell_text(&ids[row]) {
            Some(id) => {
                if !seen_ids.insert(id) {
                    stats.duplicate_ids += 1;
                }
                id.to_string()
            }
            None => {
                stats.missing_ids += 1;
                String::new()
            }
        };

        let date = cell_text(&dates[row]).and_then(|s| {
            let parsed = parse_date(s);
            if parsed.is_none() {
                stats.malformed_dates += 1;
            }
            parsed
        });

        let mut number = |column: Option<&[Option<String>]>| {
            column
                .and_then(|c| cell_text(&c[row]))
                .and_then(|s| {
                    let parsed = parse_number(s);
                    if parsed.is_none() {
                        stats.malformed_numbers += 1;
                    }
                    parsed
                })
        };
        let price = number(prices);
        let quantity = number(quantities);

        let category = |column: Option<&[Option<String>]>| {
            column
                .and_then(|c| cell_text(&c[row]))
                .unwrap_or(UNKNOWN)
                .to_string()
        };

        records.push(OrderRecord {
            transaction_id,
            date,
            product_category: category(categories),
            product_name: category(products),
            price,
            quantity,
            payment_status: category(payments),
            direct_return: direct.and_then(|c| cell_text(&c[row])).map(str::to_string),
        });
    }

    if stats.rows > 0 && records.iter().all(|r| r.date.is_none()) {
        return Err(EngineError::schema_drift(
            source,
            "date column holds no parseable value",
        ));
    }

    if stats.malformed_dates > 0 || stats.malformed_numbers > 0 {
        log::warn!(
            "{}: {} unparseable dates and {} unparseable numbers coerced to null",
            source,
            stats.malformed_dates,
            stats.malformed_numbers
        );
    }
    if stats.missing_ids > 0 {
        log::warn!("{}: {} rows without an identifier", source, stats.missing_ids);
    }
    if stats.duplicate_ids > 0 {
        log::warn!("{}: {} repeated identifiers", source, stats.duplicate_ids);
    }

    Ok((records, stats))
}
