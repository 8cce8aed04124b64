mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use signals_engine::config::EngineConfig;
use signals_engine::filter;
use signals_engine::utils::pareto::Pareto;
use signals_engine::{Engine, Output};

use crate::cli::Args;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let base = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::from_env().context("Failed to read SIGNALS_* settings")?,
    };
    let config = args.apply(base).map_err(|e| anyhow!(e))?;
    let selection = args.selection();

    log::info!("Starting signals on {}", config.orders_path.display());
    let mut engine = Engine::new(config)?;

    let dataset = engine.dataset()?;
    log::info!(
        "Reconcile report: {}",
        serde_json::to_string(&dataset.report)?
    );
    if let Some((first, last)) = filter::date_bounds(&dataset.records) {
        log::info!("Orders span {} to {}", first, last);
    }
    log::info!(
        "Categories: {:?}",
        filter::all_categories(&dataset.records)
    );

    let output = engine.run(&selection)?;
    if let Output::Data {
        kpis,
        top_cases,
        pareto,
        ..
    } = &output
    {
        log::info!("KPIs: {}", serde_json::to_string(kpis)?);
        if let Some(top) = top_cases.first() {
            log::info!(
                "Top return case: {} / {} ({} returns, {:.1}%)",
                top.category,
                top.product,
                top.returns,
                top.return_rate
            );
        }
        match pareto {
            Pareto::Curve {
                vital_few,
                total_products,
                target_pct,
                ..
            } => log::info!(
                "{} of {} products account for {}% of returns",
                vital_few,
                total_products,
                target_pct
            ),
            Pareto::NotApplicable { reason } => log::info!("No Pareto curve: {}", reason),
        }
    }

    let written = engine.export(&selection, &args.out_dir)?;
    println!(
        "Wrote {} files to {}",
        written.len(),
        args.out_dir.display()
    );
    Ok(())
}
