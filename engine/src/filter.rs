use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::record::EnrichedRecord;

/// Inclusive timestamp interval; either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        DateRange { start, end }
    }

    /// Calendar-day range: starts at 00:00:00 of `start` and runs through
    /// 23:59:59 of `end`.
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange {
            start: start.and_then(|d| d.and_hms_opt(0, 0, 0)),
            end: end.and_then(|d| d.and_hms_opt(23, 59, 59)),
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }
}

/// Caller-supplied selection state. `None` leaves a dimension unfiltered;
/// `Some` of an empty set excludes every record on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub categories: Option<BTreeSet<String>>,
    pub products: Option<BTreeSet<String>>,
    pub date_range: Option<DateRange>,
    pub payment_statuses: Option<BTreeSet<String>>,
}

fn to_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Into::into).collect()
}

impl Selection {
    pub fn all() -> Self {
        Selection::default()
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(to_set(categories));
        self
    }

    pub fn with_products<I, S>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products = Some(to_set(products));
        self
    }

    pub fn with_payment_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.payment_statuses = Some(to_set(statuses));
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn matches(&self, record: &EnrichedRecord) -> bool {
        fn in_set(set: &Option<BTreeSet<String>>, value: &str) -> bool {
            set.as_ref().map_or(true, |s| s.contains(value))
        }

        in_set(&self.categories, &record.product_category)
            && in_set(&self.products, &record.product_name)
            && in_set(&self.payment_statuses, &record.payment_status)
            && self
                .date_range
                .map_or(true, |range| record.date.is_some_and(|d| range.contains(d)))
    }
}

/// Borrowed subset of the enriched records, in their original order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    records: Vec<&'a EnrichedRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn records(&self) -> &[&'a EnrichedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn filter<'a>(records: &'a [EnrichedRecord], selection: &Selection) -> FilteredView<'a> {
    let view = FilteredView {
        records: records.iter().filter(|r| selection.matches(r)).collect(),
    };
    log::debug!("Filter kept {} of {} records", view.len(), records.len());
    view
}

/// Products offered for a category selection (all products when `None`).
pub fn available_products(
    records: &[EnrichedRecord],
    categories: Option<&BTreeSet<String>>,
) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| categories.map_or(true, |c| c.contains(&r.product_category)))
        .map(|r| r.product_name.clone())
        .collect()
}

pub fn all_categories(records: &[EnrichedRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.product_category.clone()).collect()
}

pub fn all_payment_statuses(records: &[EnrichedRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.payment_status.clone()).collect()
}

/// Earliest and latest dated record.
pub fn date_bounds(records: &[EnrichedRecord]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut dates = records.iter().filter_map(|r| r.date);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}
