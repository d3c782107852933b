use thiserror::Error;

/// Structural problems with the input table. Always fatal for a load.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("dataset is missing required column(s): {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("row {row}: column '{column}' value {value:?} is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("column '{column}' has unsupported type {data_type}")]
    UnsupportedColumnType { column: String, data_type: String },
}

/// A filter selection the dataset cannot satisfy. The caller can correct it.
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("unknown region {region:?} (known regions: {})", known.join(", "))]
    UnknownRegion { region: String, known: Vec<String> },
}

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),
}
