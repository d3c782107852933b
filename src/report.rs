//! Plain-text rendering of a [`DashboardBundle`] for the command line.

use std::fmt::{self, Display, Write};

use crate::analytics::aggregate::Aggregate;
use crate::pipeline::DashboardBundle;

/// `1234.5` → `$1,234.50`; negatives as `-$12.00`.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// Margin with two decimals, or `n/a` when no row had sales.
pub fn format_margin(value: f64, has_data: bool) -> String {
    if has_data {
        format!("{value:.2}%")
    } else {
        "n/a".to_string()
    }
}

fn section<K: Display + PartialEq>(
    out: &mut String,
    title: &str,
    agg: &Aggregate<K>,
) -> fmt::Result {
    writeln!(out, "\n{title}")?;
    if agg.is_empty() {
        return writeln!(out, "  (no data)");
    }
    for (key, value) in agg.entries() {
        writeln!(out, "  {key:<28} {:>16}", format_currency(*value))?;
    }
    Ok(())
}

/// Render the KPI block followed by every aggregate.
pub fn render_text(bundle: &DashboardBundle) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let m = &bundle.metrics;

    writeln!(out, "Key Metrics (region: {})", bundle.filter.region)?;
    writeln!(out, "  Total Sales         {}", format_currency(m.total_sales))?;
    writeln!(out, "  Total Profit        {}", format_currency(m.total_profit))?;
    writeln!(out, "  Total Orders        {}", m.order_count)?;
    writeln!(
        out,
        "  Avg. Profit Margin  {}",
        format_margin(m.avg_profit_margin, m.has_margin_data)
    )?;

    section(&mut out, "Sales by Category", &bundle.sales_by_category)?;
    section(&mut out, "Profit by State", &bundle.profit_by_state)?;
    section(&mut out, "Monthly Sales Trend", &bundle.monthly_sales)?;
    section(&mut out, "Top Sub-Categories by Sales", &bundle.top_sub_categories)?;

    writeln!(out, "\nSales by Region and Category")?;
    let pivot = &bundle.region_category;
    if pivot.regions().is_empty() || pivot.categories().is_empty() {
        writeln!(out, "  (no data)")?;
    } else {
        for ((region, category), value) in pivot.cells() {
            writeln!(out, "  {region} / {category:<20} {:>16}", format_currency(value))?;
        }
    }

    section(&mut out, "Sales by Segment", &bundle.sales_by_segment)?;

    writeln!(out, "\nProfit by State (all data)")?;
    for t in &bundle.state_map {
        writeln!(
            out,
            "  {:<28} {:>16}  sales {}",
            t.state,
            format_currency(t.profit),
            format_currency(t.sales)
        )?;
    }

    writeln!(out, "\n{} filtered rows", bundle.rows.len())?;
    Ok(out)
}
