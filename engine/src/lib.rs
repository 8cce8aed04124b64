pub mod cache;
mod calculation;
pub mod config;
pub mod controllers;
pub mod error;
pub mod filter;
pub mod linker;
pub mod normalizer;
pub mod record;
pub mod utils;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use polars::frame::DataFrame;

use crate::cache::SourceCache;
use crate::controllers::reconcile::{reconcile, Dataset, Sources};
use crate::utils::frame;
use crate::utils::segments::Dimension;

pub use crate::config::EngineConfig;
pub use crate::controllers::Output;
pub use crate::error::EngineError;
pub use crate::filter::{DateRange, Selection};
pub use crate::record::EnrichedRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineStatus {
    Running,
    Stopped,
    Error(String),
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    status: EngineStatus,
    cache: SourceCache,
    output: Output,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Engine {
            config,
            status: EngineStatus::Stopped,
            cache: SourceCache::new(),
            output: Output::None,
        })
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// Output of the last `run`.
    pub fn get_output(&self) -> &Output {
        &self.output
    }

    /// The reconciled, unfiltered records. Reads the sources only when
    /// they changed since the last call.
    pub fn dataset(&mut self) -> Result<Arc<Dataset>, EngineError> {
        let config = &self.config;
        self.cache.get_or_load(config, || {
            let sources = Sources::load(config)?;
            reconcile(&sources, config)
        })
    }

    pub fn run(&mut self, selection: &Selection) -> Result<Output, EngineError> {
        self.status = EngineStatus::Running;

        match self.dataset() {
            Ok(dataset) => {
                let view = filter::filter(&dataset.records, selection);
                let output = analyze(view.records(), &self.config);
                self.output = output.clone();
                self.status = EngineStatus::Stopped;
                Ok(output)
            }
            Err(e) => {
                log::error!("Batch failed: {}", e);
                self.status = EngineStatus::Error(e.to_string());
                self.output = Output::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Writes the filtered records and every view as CSV files into `dir`.
    pub fn export(&mut self, selection: &Selection, dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
        let dataset = self.dataset()?;
        let view = filter::filter(&dataset.records, selection);
        let records = view.records();

        let top_n = self.config.top_n;
        let target = self.config.pareto_target_pct;
        let period = self.config.period;

        let frames: Vec<(&str, DataFrame)> = vec![
            ("filtered.csv", frame::records_frame(records)?),
            ("kpis.csv", frame::kpis_frame(&utils::kpi::kpis_over_data(records))?),
            (
                "time_series.csv",
                frame::time_series_frame(&utils::time_series::time_series_over_data(records, period))?,
            ),
            (
                "segments.csv",
                frame::segments_frame(
                    &utils::segments::segments_over_data(records, Dimension::Category),
                    Dimension::Category,
                )?,
            ),
            (
                "segments_by_product.csv",
                frame::segments_frame(
                    &utils::segments::segments_over_data(records, Dimension::CategoryProduct),
                    Dimension::CategoryProduct,
                )?,
            ),
            (
                "top_cases.csv",
                frame::top_cases_frame(&utils::ranking::top_cases_over_data(records, top_n))?,
            ),
            (
                "pareto.csv",
                frame::pareto_frame(&utils::pareto::pareto_over_data(records, target))?,
            ),
        ];

        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(frames.len());
        for (name, mut df) in frames {
            let path = dir.join(name);
            let writer = BufWriter::new(File::create(&path)?);
            frame::write_csv(&mut df, writer)?;
            log::info!("Wrote {} ({} rows)", path.display(), df.height());
            written.push(path);
        }
        Ok(written)
    }
}

/// Runs every aggregation over an already filtered view.
pub fn analyze(records: &[&EnrichedRecord], config: &EngineConfig) -> Output {
    Output::Data {
        kpis: utils::kpi::kpis_over_data(records),
        time_series: utils::time_series::time_series_over_data(records, config.period),
        segments: utils::segments::segments_over_data(records, Dimension::Category),
        product_segments: utils::segments::segments_over_data(records, Dimension::CategoryProduct),
        top_cases: utils::ranking::top_cases_over_data(records, config.top_n),
        pareto: utils::pareto::pareto_over_data(records, config.pareto_target_pct),
    }
}
