use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analytics::aggregate::{self, Aggregate, PivotTable, RowProjection, StateTotals};
use crate::analytics::metrics::{self, MetricsBundle};
use crate::data::filter::{self, FilterSpec};
use crate::data::model::{Dataset, Dimension, MonthKey, SalesRow};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Length of the best-selling sub-category ranking.
    pub top_n: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions { top_n: 10 }
    }
}

impl PipelineOptions {
    /// Read options from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Result bundle
// ---------------------------------------------------------------------------

/// Everything the dashboard shows for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardBundle {
    /// The selection this bundle was computed for.
    pub filter: FilterSpec,
    pub metrics: MetricsBundle,
    pub sales_by_category: Aggregate<String>,
    pub profit_by_state: Aggregate<String>,
    pub monthly_sales: Aggregate<MonthKey>,
    pub top_sub_categories: Aggregate<String>,
    pub region_category: PivotTable,
    pub sales_by_segment: Aggregate<String>,
    /// Whole-dataset profit/sales per state; ignores the filter.
    pub state_map: Vec<StateTotals>,
    /// Per-row sales, profit and margin, in `rows` order.
    pub projection: Vec<RowProjection>,
    /// Dataset positions of the filtered rows.
    pub row_indices: Vec<usize>,
    /// The filtered rows themselves, unmodified.
    pub rows: Vec<SalesRow>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Runs filter → metrics + aggregates for one [`FilterSpec`].
#[derive(Debug, Clone, Default)]
pub struct PipelineController {
    options: PipelineOptions,
}

impl PipelineController {
    pub fn new(options: PipelineOptions) -> Self {
        PipelineController { options }
    }

    /// Filter once, then derive every output from that single subset.
    pub fn run(
        &self,
        dataset: &Dataset,
        spec: &FilterSpec,
    ) -> Result<DashboardBundle, PipelineError> {
        let view = filter::select(dataset, spec)?;
        log::debug!(
            "filter region={:?} states={:?} categories={:?}: {} of {} rows",
            spec.region,
            spec.states.as_ref().map(|s| s.len()),
            spec.categories.as_ref().map(|s| s.len()),
            view.len(),
            dataset.len()
        );

        let rows = view.to_rows();
        let (regions, categories) = pivot_axes(dataset, spec);

        Ok(DashboardBundle {
            filter: spec.clone(),
            metrics: metrics::compute(&rows),
            sales_by_category: aggregate::sales_by_category(&rows),
            profit_by_state: aggregate::profit_by_state(&rows),
            monthly_sales: aggregate::monthly_sales(&rows),
            top_sub_categories: aggregate::top_sub_categories(&rows, self.options.top_n),
            region_category: aggregate::region_category_pivot(&rows, regions, categories),
            sales_by_segment: aggregate::sales_by_segment(&rows),
            state_map: aggregate::state_totals(dataset.rows()),
            projection: aggregate::project(&rows),
            row_indices: view.indices().to_vec(),
            rows,
        })
    }
}

/// Pivot axes: the selected region, and the selected categories that exist in
/// the dataset (all of them when categories are unrestricted).
fn pivot_axes(dataset: &Dataset, spec: &FilterSpec) -> (Vec<String>, Vec<String>) {
    let regions = if dataset.contains_value(Dimension::Region, &spec.region) {
        vec![spec.region.clone()]
    } else {
        Vec::new()
    };
    let categories = match &spec.categories {
        None => dataset.distinct_values(Dimension::Category).to_vec(),
        Some(selected) => selected
            .iter()
            .filter(|c| dataset.contains_value(Dimension::Category, c))
            .cloned()
            .collect(),
    };
    (regions, categories)
}
