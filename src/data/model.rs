use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// MonthKey – calendar month used for trend grouping
// ---------------------------------------------------------------------------

/// A `(year, month)` pair. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        MonthKey { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// Serialised as "YYYY-MM" so chart collaborators get a plain label.
impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Dimension – categorical columns usable as group-by keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    State,
    Category,
    SubCategory,
    Region,
    Segment,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::State,
        Dimension::Category,
        Dimension::SubCategory,
        Dimension::Region,
        Dimension::Segment,
    ];

    /// Column header in the source data.
    pub fn column_name(self) -> &'static str {
        match self {
            Dimension::State => "State",
            Dimension::Category => "Category",
            Dimension::SubCategory => "Sub-Category",
            Dimension::Region => "Region",
            Dimension::Segment => "Segment",
        }
    }

    /// The row's value for this dimension.
    pub fn value_of(self, row: &SalesRow) -> &str {
        match self {
            Dimension::State => &row.state,
            Dimension::Category => &row.category,
            Dimension::SubCategory => &row.sub_category,
            Dimension::Region => &row.region,
            Dimension::Segment => &row.segment,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

// ---------------------------------------------------------------------------
// SalesRow – one row of the source table
// ---------------------------------------------------------------------------

/// A single order line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRow {
    /// Date text exactly as it appeared in the source.
    pub order_date_raw: String,
    /// Parsed order date; `None` when the text could not be understood.
    pub order_date: Option<NaiveDate>,
    /// Derived from `order_date` at load time.
    pub month: Option<MonthKey>,
    pub state: String,
    pub category: String,
    pub sub_category: String,
    pub region: String,
    pub segment: String,
    pub sales: f64,
    /// May be negative.
    pub profit: f64,
    /// `sales` or `profit` was blank or non-finite in the source. The missing
    /// amount reads as 0 in sums and the row has no profit margin.
    pub missing_amount: bool,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed dimension indices.
///
/// Rows are never mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<SalesRow>,
    /// For each dimension the distinct values in first-appearance order.
    distinct: BTreeMap<Dimension, Vec<String>>,
}

impl Dataset {
    /// Build dimension indices from the loaded rows.
    pub fn from_rows(rows: Vec<SalesRow>) -> Self {
        let mut distinct: BTreeMap<Dimension, Vec<String>> = BTreeMap::new();

        for dim in Dimension::ALL {
            let mut seen: HashSet<&str> = HashSet::new();
            let values = distinct.entry(dim).or_default();
            for row in &rows {
                let v = dim.value_of(row);
                if seen.insert(v) {
                    values.push(v.to_string());
                }
            }
        }

        Dataset { rows, distinct }
    }

    pub fn rows(&self) -> &[SalesRow] {
        &self.rows
    }

    /// Distinct values of `dim`, in the order they first appear.
    pub fn distinct_values(&self, dim: Dimension) -> &[String] {
        self.distinct.get(&dim).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `value` occurs anywhere in column `dim`.
    pub fn contains_value(&self, dim: Dimension, value: &str) -> bool {
        self.distinct_values(dim).iter().any(|v| v == value)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
