use std::io::Write;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use super::kpi::Kpis;
use super::pareto::Pareto;
use super::ranking::TopCase;
use super::segments::{Dimension, Segment};
use super::time_series::TimeBucket;
use crate::error::EngineError;
use crate::record::EnrichedRecord;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

fn timestamp(value: Option<NaiveDateTime>) -> Option<String> {
    value.map(|v| v.format(TIMESTAMP_FORMAT).to_string())
}

fn date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

fn count(value: usize) -> u64 {
    value as u64
}

pub fn records_frame(records: &[&EnrichedRecord]) -> Result<DataFrame, EngineError> {
    let ids: Vec<&str> = records.iter().map(|r| r.transaction_id.as_str()).collect();
    let dates: Vec<Option<String>> = records.iter().map(|r| timestamp(r.date)).collect();
    let categories: Vec<&str> = records.iter().map(|r| r.product_category.as_str()).collect();
    let products: Vec<&str> = records.iter().map(|r| r.product_name.as_str()).collect();
    let prices: Vec<Option<f64>> = records.iter().map(|r| r.price).collect();
    let quantities: Vec<Option<f64>> = records.iter().map(|r| r.quantity).collect();
    let payments: Vec<&str> = records.iter().map(|r| r.payment_status.as_str()).collect();
    let revenue: Vec<f64> = records.iter().map(|r| r.revenue).collect();
    let returned: Vec<bool> = records.iter().map(|r| r.has_return).collect();
    let tickets: Vec<u32> = records.iter().map(|r| r.ticket_count).collect();
    let topics: Vec<&str> = records.iter().map(|r| r.top_topic.as_str()).collect();

    let df = df!(
        "transaction_id" => ids,
        "date" => dates,
        "product_category" => categories,
        "product_name" => products,
        "price" => prices,
        "quantity" => quantities,
        "payment_status" => payments,
        "revenue" => revenue,
        "has_return" => returned,
        "ticket_count" => tickets,
        "top_topic" => topics,
    )?;
    Ok(df)
}

pub fn time_series_frame(rows: &[TimeBucket]) -> Result<DataFrame, EngineError> {
    let df = df!(
        "period_start" => rows.iter().map(|r| date(r.period_start)).collect::<Vec<_>>(),
        "period_end" => rows.iter().map(|r| date(r.period_end)).collect::<Vec<_>>(),
        "revenue" => rows.iter().map(|r| r.revenue).collect::<Vec<_>>(),
        "orders" => rows.iter().map(|r| count(r.orders)).collect::<Vec<_>>(),
        "returns" => rows.iter().map(|r| count(r.returns)).collect::<Vec<_>>(),
        "tickets" => rows.iter().map(|r| r.tickets).collect::<Vec<_>>(),
        "return_rate" => rows.iter().map(|r| r.return_rate).collect::<Vec<_>>(),
        "revenue_change_pct" => rows.iter().map(|r| r.revenue_change_pct).collect::<Vec<_>>(),
        "return_rate_change_pct" => rows.iter().map(|r| r.return_rate_change_pct).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

pub fn segments_frame(rows: &[Segment], dimension: Dimension) -> Result<DataFrame, EngineError> {
    let df = df!(
        "product_category" => rows.iter().map(|r| r.category.clone()).collect::<Vec<_>>(),
        "product_name" => rows.iter().map(|r| r.product.clone()).collect::<Vec<_>>(),
        "orders" => rows.iter().map(|r| count(r.orders)).collect::<Vec<_>>(),
        "returns" => rows.iter().map(|r| count(r.returns)).collect::<Vec<_>>(),
        "revenue" => rows.iter().map(|r| r.revenue).collect::<Vec<_>>(),
        "avg_tickets" => rows.iter().map(|r| r.avg_tickets).collect::<Vec<_>>(),
        "return_rate" => rows.iter().map(|r| r.return_rate).collect::<Vec<_>>(),
    )?;

    if dimension == Dimension::Category {
        return Ok(df.drop("product_name")?);
    }
    Ok(df)
}

pub fn top_cases_frame(rows: &[TopCase]) -> Result<DataFrame, EngineError> {
    let df = df!(
        "product_category" => rows.iter().map(|r| r.category.clone()).collect::<Vec<_>>(),
        "product_name" => rows.iter().map(|r| r.product.clone()).collect::<Vec<_>>(),
        "orders" => rows.iter().map(|r| count(r.orders)).collect::<Vec<_>>(),
        "returns" => rows.iter().map(|r| count(r.returns)).collect::<Vec<_>>(),
        "return_rate" => rows.iter().map(|r| r.return_rate).collect::<Vec<_>>(),
        "revenue" => rows.iter().map(|r| r.revenue).collect::<Vec<_>>(),
        "tickets" => rows.iter().map(|r| r.tickets).collect::<Vec<_>>(),
        "top_topic" => rows.iter().map(|r| r.top_topic.clone()).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

/// An inapplicable curve becomes a frame with the headers and no rows.
pub fn pareto_frame(pareto: &Pareto) -> Result<DataFrame, EngineError> {
    let rows = pareto.rows();
    let df = df!(
        "product_name" => rows.iter().map(|r| r.product.clone()).collect::<Vec<_>>(),
        "returns" => rows.iter().map(|r| count(r.returns)).collect::<Vec<_>>(),
        "cum_returns" => rows.iter().map(|r| count(r.cum_returns)).collect::<Vec<_>>(),
        "cum_returns_pct" => rows.iter().map(|r| r.cum_returns_pct).collect::<Vec<_>>(),
        "cum_products" => rows.iter().map(|r| count(r.cum_products)).collect::<Vec<_>>(),
        "cum_products_pct" => rows.iter().map(|r| r.cum_products_pct).collect::<Vec<_>>(),
        "vital_few" => rows.iter().map(|r| r.vital_few).collect::<Vec<_>>(),
    )?;
    Ok(df)
}

pub fn kpis_frame(kpis: &Kpis) -> Result<DataFrame, EngineError> {
    let df = df!(
        "total_revenue" => [kpis.total_revenue],
        "orders" => [count(kpis.orders)],
        "returns" => [count(kpis.returns)],
        "return_rate" => [kpis.return_rate],
        "tickets" => [kpis.tickets],
    )?;
    Ok(df)
}

/// Writes `df` as comma-separated text with a header row.
pub fn write_csv<W: Write>(df: &mut DataFrame, writer: W) -> Result<(), EngineError> {
    CsvWriter::new(writer).include_header(true).finish(df)?;
    Ok(())
}
