use serde::Serialize;

use crate::data::model::SalesRow;

// ---------------------------------------------------------------------------
// KPI metrics
// ---------------------------------------------------------------------------

/// Headline figures for one filtered subset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsBundle {
    pub total_sales: f64,
    pub total_profit: f64,
    pub order_count: usize,
    /// Mean of per-row `profit / sales * 100`, over rows with non-zero sales.
    /// `0.0` when no row qualifies; see `has_margin_data`.
    pub avg_profit_margin: f64,
    /// `false` when the margin above is a placeholder rather than a real 0%.
    pub has_margin_data: bool,
    /// Rows that contributed to the margin mean.
    pub margin_rows: usize,
}

/// Per-row profit margin in percent. `None` for rows without sales or with a
/// missing amount.
pub fn profit_margin_pct(row: &SalesRow) -> Option<f64> {
    if row.missing_amount || row.sales == 0.0 {
        return None;
    }
    let pct = row.profit / row.sales * 100.0;
    pct.is_finite().then_some(pct)
}

/// Compute the KPI bundle in a single pass.
pub fn compute<'a, I>(rows: I) -> MetricsBundle
where
    I: IntoIterator<Item = &'a SalesRow>,
{
    let mut total_sales = 0.0;
    let mut total_profit = 0.0;
    let mut order_count = 0;
    let mut margin_sum = 0.0;
    let mut margin_rows = 0;

    for row in rows {
        total_sales += row.sales;
        total_profit += row.profit;
        order_count += 1;
        if let Some(m) = profit_margin_pct(row) {
            margin_sum += m;
            margin_rows += 1;
        }
    }

    let has_margin_data = margin_rows > 0;
    MetricsBundle {
        total_sales,
        total_profit,
        order_count,
        avg_profit_margin: if has_margin_data {
            margin_sum / margin_rows as f64
        } else {
            0.0
        },
        has_margin_data,
        margin_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::row;

    #[test]
    fn zero_sales_rows_are_excluded_from_margin_only() {
        let rows = [
            row("CA", "Furniture", "West", 100.0, 20.0),
            row("CA", "Furniture", "West", 0.0, 5.0),
        ];
        let m = compute(&rows);
        assert_eq!(m.order_count, 2);
        assert_eq!(m.total_sales, 100.0);
        assert_eq!(m.total_profit, 25.0);
        assert!((m.avg_profit_margin - 20.0).abs() < 1e-9);
        assert_eq!(m.margin_rows, 1);
        assert!(m.has_margin_data);
    }

    #[test]
    fn margin_is_a_mean_of_row_ratios() {
        let rows = [
            row("CA", "Furniture", "West", 100.0, 10.0),
            row("CA", "Furniture", "West", 50.0, -25.0),
        ];
        let m = compute(&rows);
        assert!((m.avg_profit_margin - (10.0 - 50.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_reports_no_margin_data() {
        let m = compute(std::iter::empty());
        assert_eq!(m.order_count, 0);
        assert_eq!(m.total_sales, 0.0);
        assert_eq!(m.avg_profit_margin, 0.0);
        assert!(!m.has_margin_data);
    }

    #[test]
    fn all_zero_sales_is_distinct_from_a_real_zero_margin() {
        let no_data = compute(&[row("CA", "Furniture", "West", 0.0, 3.0)]);
        let break_even = compute(&[row("CA", "Furniture", "West", 40.0, 0.0)]);
        assert_eq!(no_data.avg_profit_margin, 0.0);
        assert_eq!(break_even.avg_profit_margin, 0.0);
        assert!(!no_data.has_margin_data);
        assert!(break_even.has_margin_data);
    }

    #[test]
    fn row_with_missing_amount_counts_but_has_no_margin() {
        let blank_profit = SalesRow {
            missing_amount: true,
            ..row("CA", "Furniture", "West", 80.0, 0.0)
        };
        let m = compute(&[row("CA", "Furniture", "West", 100.0, 20.0), blank_profit]);
        assert_eq!(m.order_count, 2);
        assert_eq!(m.total_sales, 180.0);
        assert_eq!(m.margin_rows, 1);
        assert!((m.avg_profit_margin - 20.0).abs() < 1e-9);
    }
}
