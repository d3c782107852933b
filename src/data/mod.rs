/// Data layer: core types, loading, date normalisation and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset   (dates: raw text → NaiveDate + MonthKey)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<SalesRow>, distinct values per dimension
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec → FilteredView (row indices, original order)
///   └──────────┘
/// ```

pub mod dates;
pub mod filter;
pub mod loader;
pub mod model;
