//! Filter-and-aggregate pipeline behind a Superstore-style sales dashboard.
//!
//! Load a [`Dataset`] once, then call [`PipelineController::run`] with a
//! [`FilterSpec`] on every selection change; every figure in the returned
//! [`DashboardBundle`] comes from the same filtered subset.

pub mod analytics;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod state;

pub use analytics::aggregate::{Aggregate, PivotTable, Reducer, RowProjection, StateTotals};
pub use analytics::metrics::MetricsBundle;
pub use data::filter::{FilterSpec, FilteredView};
pub use data::model::{Dataset, Dimension, MonthKey, SalesRow};
pub use error::{DataError, FilterError, PipelineError};
pub use pipeline::{DashboardBundle, PipelineController, PipelineOptions};
pub use state::DashboardState;
