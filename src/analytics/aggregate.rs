use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::data::model::{Dimension, MonthKey, SalesRow};

// ---------------------------------------------------------------------------
// Generic group-by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
}

/// Ordered `key → value` pairs produced by a grouping.
///
/// Keys are exactly the groups seen in the input; nothing is zero-filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate<K> {
    entries: Vec<(K, f64)>,
}

impl<K> Default for Aggregate<K> {
    fn default() -> Self {
        Aggregate { entries: Vec::new() }
    }
}

impl<K: PartialEq> Aggregate<K> {
    pub fn entries(&self) -> &[(K, f64)] {
        &self.entries
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v).sum()
    }

    /// Stable ascending sort by value; ties keep first-encounter order.
    pub fn sorted_ascending(mut self) -> Self {
        self.entries.sort_by(|a, b| a.1.total_cmp(&b.1));
        self
    }

    /// Stable descending sort by value; ties keep first-encounter order.
    pub fn sorted_descending(mut self) -> Self {
        self.entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        self
    }

    pub fn truncated(mut self, n: usize) -> Self {
        self.entries.truncate(n);
        self
    }
}

impl<K: Ord> Aggregate<K> {
    pub fn sorted_by_key(mut self) -> Self {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }
}

#[derive(Serialize)]
struct Entry<'a, K> {
    key: &'a K,
    value: f64,
}

// Serialised as `[{"key": ..., "value": ...}, ...]` so order survives JSON.
impl<K: Serialize> Serialize for Aggregate<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.iter().map(|(key, value)| Entry { key, value: *value }))
    }
}

/// Group rows by `key`, reducing `value` with `reducer`.
///
/// Rows for which `key` returns `None` are skipped. Groups come out in the
/// order their first row was seen.
pub fn group_by<'a, I, K, F, V>(rows: I, key: F, value: V, reducer: Reducer) -> Aggregate<K>
where
    I: IntoIterator<Item = &'a SalesRow>,
    K: Eq + Hash + Clone,
    F: Fn(&SalesRow) -> Option<K>,
    V: Fn(&SalesRow) -> f64,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut acc: Vec<(K, f64, usize)> = Vec::new();

    for row in rows {
        let Some(k) = key(row) else {
            continue;
        };
        let slot = *slots.entry(k.clone()).or_insert_with(|| {
            acc.push((k, 0.0, 0));
            acc.len() - 1
        });
        acc[slot].1 += value(row);
        acc[slot].2 += 1;
    }

    let entries = acc
        .into_iter()
        .map(|(k, sum, n)| {
            let v = match reducer {
                Reducer::Sum => sum,
                Reducer::Mean => sum / n as f64,
            };
            (k, v)
        })
        .collect();
    Aggregate { entries }
}

/// Sum of `value` per distinct value of `dim`.
pub fn group_sum<'a, I, V>(rows: I, dim: Dimension, value: V) -> Aggregate<String>
where
    I: IntoIterator<Item = &'a SalesRow>,
    V: Fn(&SalesRow) -> f64,
{
    group_by(rows, |r| Some(dim.value_of(r).to_string()), value, Reducer::Sum)
}

/// Mean of `value` per distinct value of `dim`.
pub fn group_mean<'a, I, V>(rows: I, dim: Dimension, value: V) -> Aggregate<String>
where
    I: IntoIterator<Item = &'a SalesRow>,
    V: Fn(&SalesRow) -> f64,
{
    group_by(rows, |r| Some(dim.value_of(r).to_string()), value, Reducer::Mean)
}

fn sales(row: &SalesRow) -> f64 {
    row.sales
}

fn profit(row: &SalesRow) -> f64 {
    row.profit
}

// ---------------------------------------------------------------------------
// Chart aggregates
// ---------------------------------------------------------------------------

/// Sales per category, ascending by value.
pub fn sales_by_category<'a>(rows: impl IntoIterator<Item = &'a SalesRow>) -> Aggregate<String> {
    group_sum(rows, Dimension::Category, sales).sorted_ascending()
}

/// Profit per state, ascending by value.
pub fn profit_by_state<'a>(rows: impl IntoIterator<Item = &'a SalesRow>) -> Aggregate<String> {
    group_sum(rows, Dimension::State, profit).sorted_ascending()
}

/// Sales per calendar month, chronological. Rows without a month are skipped.
pub fn monthly_sales<'a>(rows: impl IntoIterator<Item = &'a SalesRow>) -> Aggregate<MonthKey> {
    group_by(rows, |r| r.month, sales, Reducer::Sum).sorted_by_key()
}

/// The `n` best-selling sub-categories, descending; ties keep first-seen order.
pub fn top_sub_categories<'a>(
    rows: impl IntoIterator<Item = &'a SalesRow>,
    n: usize,
) -> Aggregate<String> {
    group_sum(rows, Dimension::SubCategory, sales)
        .sorted_descending()
        .truncated(n)
}

/// Sales per customer segment, ordered by segment name.
pub fn sales_by_segment<'a>(rows: impl IntoIterator<Item = &'a SalesRow>) -> Aggregate<String> {
    group_sum(rows, Dimension::Segment, sales).sorted_by_key()
}

// ---------------------------------------------------------------------------
// Region × Category pivot
// ---------------------------------------------------------------------------

/// Two-dimensional sales table. Every `(region, category)` cell of the axes
/// is present; cells without rows hold `0.0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PivotTable {
    regions: Vec<String>,
    categories: Vec<String>,
    /// Row-major, `regions.len() * categories.len()`.
    values: Vec<f64>,
}

impl PivotTable {
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn get(&self, region: &str, category: &str) -> Option<f64> {
        let r = self.regions.iter().position(|x| x == region)?;
        let c = self.categories.iter().position(|x| x == category)?;
        Some(self.values[r * self.categories.len() + c])
    }

    /// `((region, category), value)` for every cell, row-major.
    pub fn cells(&self) -> impl Iterator<Item = ((&str, &str), f64)> + '_ {
        self.regions.iter().enumerate().flat_map(move |(r, region)| {
            self.categories.iter().enumerate().map(move |(c, category)| {
                (
                    (region.as_str(), category.as_str()),
                    self.values[r * self.categories.len() + c],
                )
            })
        })
    }

    /// Row of values for one region, in `categories()` order.
    pub fn row(&self, region: &str) -> Option<&[f64]> {
        let r = self.regions.iter().position(|x| x == region)?;
        let w = self.categories.len();
        Some(&self.values[r * w..(r + 1) * w])
    }
}

impl Serialize for PivotTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<&[f64]> = if self.categories.is_empty() {
            self.regions.iter().map(|_| &[][..]).collect()
        } else {
            self.values.chunks(self.categories.len()).collect()
        };
        let mut s = serializer.serialize_struct("PivotTable", 3)?;
        s.serialize_field("regions", &self.regions)?;
        s.serialize_field("categories", &self.categories)?;
        s.serialize_field("values", &rows)?;
        s.end()
    }
}

/// Sum sales into a `regions × categories` grid, zero-filling empty cells.
///
/// Axes are sorted and de-duplicated. Rows whose region or category is not on
/// an axis are ignored.
pub fn region_category_pivot<'a, I, R, C>(rows: I, regions: R, categories: C) -> PivotTable
where
    I: IntoIterator<Item = &'a SalesRow>,
    R: IntoIterator<Item = String>,
    C: IntoIterator<Item = String>,
{
    let regions: Vec<String> = regions.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
    let categories: Vec<String> = categories
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut values = vec![0.0; regions.len() * categories.len()];

    let sums = group_by(
        rows,
        |r| Some((r.region.clone(), r.category.clone())),
        sales,
        Reducer::Sum,
    );
    for ((region, category), v) in sums.entries {
        let (Some(ri), Some(ci)) = (
            regions.iter().position(|x| *x == region),
            categories.iter().position(|x| *x == category),
        ) else {
            continue;
        };
        values[ri * categories.len() + ci] = v;
    }

    PivotTable {
        regions,
        categories,
        values,
    }
}

// ---------------------------------------------------------------------------
// Map view and per-row projection
// ---------------------------------------------------------------------------

/// Profit and sales for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTotals {
    pub state: String,
    pub profit: f64,
    pub sales: f64,
}

/// Profit and sales per state, ordered by state name.
pub fn state_totals<'a>(rows: impl IntoIterator<Item = &'a SalesRow>) -> Vec<StateTotals> {
    let mut by_state: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for row in rows {
        let t = by_state.entry(row.state.as_str()).or_default();
        t.0 += row.profit;
        t.1 += row.sales;
    }
    by_state
        .into_iter()
        .map(|(state, (profit, sales))| StateTotals {
            state: state.to_string(),
            profit,
            sales,
        })
        .collect()
}

/// Sales/profit pair plus margin for one filtered row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RowProjection {
    pub sales: f64,
    pub profit: f64,
    pub margin_pct: Option<f64>,
}

pub fn project<'a>(rows: impl IntoIterator<Item = &'a SalesRow>) -> Vec<RowProjection> {
    rows.into_iter()
        .map(|r| RowProjection {
            sales: r.sales,
            profit: r.profit,
            margin_pct: super::metrics::profit_margin_pct(r),
        })
        .collect()
}
