use std::collections::BTreeSet;

use crate::data::filter::FilterSpec;
use crate::data::model::{Dataset, Dimension};
use crate::pipeline::{DashboardBundle, PipelineController};

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// Interactive state behind a dashboard front-end, independent of rendering.
///
/// Every mutation rebuilds `bundle` from scratch through the controller, so
/// the bundle always matches `filter`.
#[derive(Debug, Default)]
pub struct DashboardState {
    /// Loaded dataset (None until a file is loaded).
    pub dataset: Option<Dataset>,

    /// Current selection.
    pub filter: Option<FilterSpec>,

    /// Output for `filter`; `None` after a failed recompute.
    pub bundle: Option<DashboardBundle>,

    /// Status / error message for the front-end.
    pub status_message: Option<String>,

    controller: PipelineController,
}

impl DashboardState {
    pub fn new(controller: PipelineController) -> Self {
        DashboardState {
            controller,
            ..Default::default()
        }
    }

    /// Ingest a newly loaded dataset with everything selected.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.filter = FilterSpec::select_all(&dataset);
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refresh();
    }

    /// Replace the whole selection.
    pub fn set_filter(&mut self, spec: FilterSpec) {
        self.filter = Some(spec);
        self.refresh();
    }

    pub fn set_region(&mut self, region: &str) {
        if let Some(spec) = &mut self.filter {
            spec.region = region.to_string();
        }
        self.refresh();
    }

    /// Toggle one state in the selection.
    pub fn toggle_state(&mut self, state: &str) {
        self.toggle(Dimension::State, state);
    }

    /// Toggle one category in the selection.
    pub fn toggle_category(&mut self, category: &str) {
        self.toggle(Dimension::Category, category);
    }

    fn toggle(&mut self, dim: Dimension, value: &str) {
        let Some(all_vals) = self.dataset.as_ref().map(|ds| ds.distinct_values(dim).to_vec()) else {
            return;
        };
        let Some(slot) = self.filter.as_mut().and_then(|f| f.selection_mut(dim)) else {
            return;
        };
        // An unrestricted dimension is the same as every value being ticked.
        let selected = slot.get_or_insert_with(|| all_vals.iter().cloned().collect());
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refresh();
    }

    /// Select all values in a multi-select dimension.
    pub fn select_all(&mut self, dim: Dimension) {
        if let Some(slot) = self.filter.as_mut().and_then(|f| f.selection_mut(dim)) {
            *slot = None;
            self.refresh();
        }
    }

    /// Deselect all values in a multi-select dimension.
    pub fn select_none(&mut self, dim: Dimension) {
        if let Some(slot) = self.filter.as_mut().and_then(|f| f.selection_mut(dim)) {
            *slot = Some(BTreeSet::new());
            self.refresh();
        }
    }

    /// Recompute the bundle for the current selection.
    pub fn refresh(&mut self) {
        let (Some(ds), Some(spec)) = (&self.dataset, &self.filter) else {
            self.bundle = None;
            return;
        };
        match self.controller.run(ds, spec) {
            Ok(bundle) => {
                self.bundle = Some(bundle);
                self.status_message = None;
            }
            Err(e) => {
                log::warn!("filter rejected: {e}");
                self.bundle = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
