pub mod reconcile;
pub mod sources;

use crate::utils::kpi::Kpis;
use crate::utils::pareto::Pareto;
use crate::utils::ranking::TopCase;
use crate::utils::segments::Segment;
use crate::utils::time_series::TimeBucket;

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Data {
        kpis: Kpis,
        time_series: Vec<TimeBucket>,
        /// Grouped by category.
        segments: Vec<Segment>,
        /// Grouped by category and product.
        product_segments: Vec<Segment>,
        top_cases: Vec<TopCase>,
        pareto: Pareto,
    },
    Error(String),
    None,
}

impl Output {
    pub fn get_kpis(&self) -> Option<&Kpis> {
        match self {
            Output::Data { kpis, .. } => Some(kpis),
            _ => None,
        }
    }

    pub fn get_time_series(&self) -> Option<&[TimeBucket]> {
        match self {
            Output::Data { time_series, .. } => Some(time_series),
            _ => None,
        }
    }

    pub fn get_segments(&self) -> Option<&[Segment]> {
        match self {
            Output::Data { segments, .. } => Some(segments),
            _ => None,
        }
    }

    pub fn get_product_segments(&self) -> Option<&[Segment]> {
        match self {
            Output::Data {
                product_segments, ..
            } => Some(product_segments),
            _ => None,
        }
    }

    pub fn get_top_cases(&self) -> Option<&[TopCase]> {
        match self {
            Output::Data { top_cases, .. } => Some(top_cases),
            _ => None,
        }
    }

    pub fn get_pareto(&self) -> Option<&Pareto> {
        match self {
            Output::Data { pareto, .. } => Some(pareto),
            _ => None,
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Output::None
    }
}
