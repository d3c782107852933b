use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::{Dataset, Dimension, SalesRow};
use crate::error::FilterError;

// ---------------------------------------------------------------------------
// Filter predicate: which values are selected per dimension
// ---------------------------------------------------------------------------

/// The user's current selection.
///
/// * `states` / `categories`: `None` means no constraint on that dimension;
///   `Some(empty)` means nothing is selected, so no row matches. Values that
///   do not occur in the dataset are inert.
/// * `region`: single-select, must be one of the dataset's regions.
///
/// All three predicates combine with AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub states: Option<BTreeSet<String>>,
    #[serde(default)]
    pub categories: Option<BTreeSet<String>>,
    pub region: String,
}

impl FilterSpec {
    /// A spec that only constrains the region.
    pub fn for_region(region: impl Into<String>) -> Self {
        FilterSpec {
            states: None,
            categories: None,
            region: region.into(),
        }
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = Some(states.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Everything selected, region defaulting to the first one in the data.
    /// `None` for a dataset without rows.
    pub fn select_all(dataset: &Dataset) -> Option<Self> {
        let region = dataset.distinct_values(Dimension::Region).first()?;
        Some(FilterSpec::for_region(region.clone()))
    }

    /// Selection slot of a multi-select dimension; `None` for single-select ones.
    pub fn selection_mut(&mut self, dim: Dimension) -> Option<&mut Option<BTreeSet<String>>> {
        match dim {
            Dimension::State => Some(&mut self.states),
            Dimension::Category => Some(&mut self.categories),
            _ => None,
        }
    }

    /// Whether a single row passes all three predicates.
    pub fn matches(&self, row: &SalesRow) -> bool {
        fn selected(set: &Option<BTreeSet<String>>, value: &str) -> bool {
            set.as_ref().map_or(true, |s| s.contains(value))
        }
        row.region == self.region
            && selected(&self.states, &row.state)
            && selected(&self.categories, &row.category)
    }

    /// Check the spec against the dataset's known values.
    ///
    /// A dataset without rows has no known regions and accepts any spec.
    pub fn validate(&self, dataset: &Dataset) -> Result<(), FilterError> {
        if dataset.is_empty() || dataset.contains_value(Dimension::Region, &self.region) {
            return Ok(());
        }
        Err(FilterError::UnknownRegion {
            region: self.region.clone(),
            known: dataset.distinct_values(Dimension::Region).to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Filtered subset
// ---------------------------------------------------------------------------

/// Rows of a dataset that passed a filter, in original order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Positions of the selected rows in the dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a SalesRow> + '_ {
        let rows = self.dataset.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn to_rows(&self) -> Vec<SalesRow> {
        self.rows().cloned().collect()
    }
}

/// Return the rows that pass `spec`, after validating it.
pub fn select<'a>(
    dataset: &'a Dataset,
    spec: &FilterSpec,
) -> Result<FilteredView<'a>, FilterError> {
    spec.validate(dataset)?;
    Ok(FilteredView {
        dataset,
        indices: filtered_indices(dataset, spec),
    })
}

/// Return indices of rows that pass all predicates. No validation.
pub fn filtered_indices(dataset: &Dataset, spec: &FilterSpec) -> Vec<usize> {
    dataset
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| spec.matches(row))
        .map(|(i, _)| i)
        .collect()
}
