//! KPI metrics and grouped aggregates over a filtered subset.

pub mod aggregate;
pub mod metrics;
