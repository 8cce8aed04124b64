use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::GroupTotals;
use crate::record::EnrichedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Monday through Sunday.
    #[default]
    Weekly,
    /// Calendar month.
    Monthly,
}

impl Period {
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Weekly => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Period::Monthly => date - Days::new(u64::from(date.day0())),
        }
    }

    fn next_start(&self, start: NaiveDate) -> NaiveDate {
        match self {
            Period::Weekly => start + Days::new(7),
            Period::Monthly => start + Months::new(1),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" | "w" => Ok(Period::Weekly),
            "monthly" | "month" | "m" => Ok(Period::Monthly),
            other => Err(format!("unknown period '{}' (expected weekly or monthly)", other)),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Weekly => write!(f, "weekly"),
            Period::Monthly => write!(f, "monthly"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeBucket {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub revenue: f64,
    pub orders: usize,
    pub returns: usize,
    pub tickets: u64,
    pub return_rate: f64,
    /// Monthly series only; `None` against an absent or zero prior month.
    pub revenue_change_pct: Option<f64>,
    pub return_rate_change_pct: Option<f64>,
}

/// Change from `previous` to `current` in percent. Undefined (not infinite,
/// not zero) when there is no prior value or it is zero.
pub fn percent_change(previous: Option<f64>, current: f64) -> Option<f64> {
    let previous = previous.filter(|p| *p != 0.0)?;
    Some((current - previous) / previous * 100.0)
}

/// Buckets dated records by `period`. Buckets run contiguously from the
/// first to the last populated period; gaps appear as zero rows.
pub fn time_series_over_data(records: &[&EnrichedRecord], period: Period) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<NaiveDate, GroupTotals> = BTreeMap::new();
    for record in records {
        let Some(date) = record.date else {
            continue;
        };
        buckets
            .entry(period.bucket_start(date.date()))
            .or_default()
            .add(record);
    }

    let (Some(first), Some(last)) = (
        buckets.keys().next().copied(),
        buckets.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let mut rows: Vec<TimeBucket> = Vec::new();
    let mut start = first;
    while start <= last {
        let next = period.next_start(start);
        let totals = buckets.remove(&start).unwrap_or_default();

        let return_rate = totals.return_rate();
        let (revenue_change_pct, return_rate_change_pct) = match (period, rows.last()) {
            (Period::Monthly, prev) => (
                percent_change(prev.map(|p| p.revenue), totals.revenue),
                percent_change(prev.map(|p| p.return_rate), return_rate),
            ),
            (Period::Weekly, _) => (None, None),
        };

        rows.push(TimeBucket {
            period_start: start,
            period_end: next - Days::new(1),
            revenue: totals.revenue,
            orders: totals.orders,
            returns: totals.returns,
            tickets: totals.tickets,
            return_rate,
            revenue_change_pct,
            return_rate_change_pct,
        });
        start = next;
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fixtures::{refs, RecordBuilder};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bucket_start() {
        // 2024-01-10 is a Wednesday
        assert_eq!(Period::Weekly.bucket_start(date(2024, 1, 10)), date(2024, 1, 8));
        assert_eq!(Period::Weekly.bucket_start(date(2024, 1, 7)), date(2024, 1, 1));
        assert_eq!(Period::Monthly.bucket_start(date(2024, 2, 29)), date(2024, 2, 1));
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("Monthly".parse::<Period>().unwrap(), Period::Monthly);
        assert_eq!("w".parse::<Period>().unwrap(), Period::Weekly);
        assert!("daily".parse::<Period>().is_err());
    }

    #[test]
    fn test_weekly_series_fills_gaps() {
        let records = vec![
            RecordBuilder::new("T1", "Audio", "Headphones")
                .date("2024-01-02")
                .revenue(20.0)
                .returned()
                .tickets(2, "refund")
                .build(),
            RecordBuilder::new("T2", "Audio", "Headphones")
                .date("2024-01-03 18:00:00")
                .revenue(5.0)
                .build(),
            RecordBuilder::new("T3", "Audio", "Speaker")
                .date("2024-01-17")
                .revenue(7.5)
                .build(),
            RecordBuilder::new("T4", "Audio", "Speaker").revenue(100.0).build(),
        ];

        let rows = time_series_over_data(&refs(&records), Period::Weekly);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].period_start, date(2024, 1, 1));
        assert_eq!(rows[0].period_end, date(2024, 1, 7));
        assert_eq!(rows[0].orders, 2);
        assert_eq!(rows[0].returns, 1);
        assert_eq!(rows[0].tickets, 2);
        assert_eq!(rows[0].revenue, 25.0);
        assert_eq!(rows[0].return_rate, 50.0);

        // empty middle week: zero orders, zero rate, no division fault
        assert_eq!(rows[1].orders, 0);
        assert_eq!(rows[1].return_rate, 0.0);
        assert_eq!(rows[1].revenue_change_pct, None);

        assert_eq!(rows[2].revenue, 7.5);
    }

    #[test]
    fn test_monthly_change_is_undefined_after_zero() {
        let records = vec![
            RecordBuilder::new("T1", "Audio", "A")
                .date("2024-01-15")
                .revenue(100.0)
                .returned()
                .build(),
            RecordBuilder::new("T2", "Audio", "A")
                .date("2024-01-20")
                .revenue(100.0)
                .build(),
            RecordBuilder::new("T3", "Audio", "A")
                .date("2024-02-01")
                .revenue(300.0)
                .build(),
            RecordBuilder::new("T4", "Audio", "A")
                .date("2024-04-30")
                .revenue(50.0)
                .returned()
                .build(),
        ];

        let rows = time_series_over_data(&refs(&records), Period::Monthly);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].period_end, date(2024, 1, 31));
        assert_eq!(rows[0].revenue_change_pct, None);

        assert_eq!(rows[1].revenue_change_pct, Some(50.0));
        assert_eq!(rows[1].return_rate_change_pct, Some(-100.0));

        // March is empty; change into April is against a zero month
        assert_eq!(rows[2].revenue, 0.0);
        assert_eq!(rows[2].revenue_change_pct, Some(-100.0));
        assert_eq!(rows[2].return_rate_change_pct, None);
        assert_eq!(rows[3].revenue_change_pct, None);
        assert_eq!(rows[3].return_rate, 100.0);
    }

    #[test]
    fn test_undated_input_gives_empty_series() {
        let records = vec![RecordBuilder::new("T1", "Audio", "A").build()];
        assert!(time_series_over_data(&refs(&records), Period::Monthly).is_empty());
    }
}
