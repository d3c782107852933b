use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

const REGIONS: &[(&str, &[&str])] = &[
    ("West", &["California", "Washington", "Oregon", "Arizona"]),
    ("East", &["New York", "Pennsylvania", "Ohio", "Massachusetts"]),
    ("Central", &["Texas", "Illinois", "Michigan", "Indiana"]),
    ("South", &["Florida", "Kentucky", "Virginia", "Georgia"]),
];

const CATEGORIES: &[(&str, &[&str], f64)] = &[
    ("Furniture", &["Bookcases", "Chairs", "Furnishings", "Tables"], 350.0),
    ("Office Supplies", &["Binders", "Paper", "Storage", "Art", "Labels", "Envelopes"], 120.0),
    ("Technology", &["Phones", "Accessories", "Machines", "Copiers"], 450.0),
];

const SEGMENTS: &[&str] = &["Consumer", "Corporate", "Home Office"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Render a date the way messy exports do: mostly US month-first, some ISO,
/// some day-first, and the odd unreadable value.
fn render_date(date: NaiveDate, rng: &mut SimpleRng) -> String {
    match rng.next_u64() % 100 {
        0 => "not-a-date".to_string(),
        1..=59 => date.format("%-m/%-d/%Y").to_string(),
        60..=84 => date.format("%Y-%m-%d").to_string(),
        _ => date.format("%d/%m/%Y").to_string(),
    }
}

#[derive(Default)]
struct Columns {
    order_date: Vec<String>,
    state: Vec<String>,
    category: Vec<String>,
    sub_category: Vec<String>,
    region: Vec<String>,
    segment: Vec<String>,
    sales: Vec<f64>,
    profit: Vec<f64>,
}

fn generate(n: usize, rng: &mut SimpleRng) -> Columns {
    let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or_default();
    let mut cols = Columns::default();

    for _ in 0..n {
        let &(region, states) = rng.pick(REGIONS);
        let &(category, subs, base_price) = rng.pick(CATEGORIES);
        let date = start + Duration::days((rng.next_u64() % (4 * 365)) as i64);

        // A handful of free-of-charge lines exercise the zero-sales path.
        let sales = if rng.next_u64() % 50 == 0 {
            0.0
        } else {
            ((base_price * (0.05 + 2.0 * rng.next_f64())) * 100.0).round() / 100.0
        };
        let margin = rng.next_f64() * 0.6 - 0.2;
        let profit = if sales == 0.0 {
            -((rng.next_f64() * 20.0 * 100.0).round() / 100.0)
        } else {
            (sales * margin * 10000.0).round() / 10000.0
        };

        cols.order_date.push(render_date(date, rng));
        cols.state.push(rng.pick(states).to_string());
        cols.category.push(category.to_string());
        cols.sub_category.push(rng.pick(subs).to_string());
        cols.region.push(region.to_string());
        cols.segment.push(rng.pick(SEGMENTS).to_string());
        cols.sales.push(sales);
        cols.profit.push(profit);
    }
    cols
}

fn write_parquet(cols: &Columns, path: &str) -> Result<()> {
    let text = |name: &str| Field::new(name, DataType::Utf8, false);
    let schema = Arc::new(Schema::new(vec![
        text("Order Date"),
        text("State"),
        text("Category"),
        text("Sub-Category"),
        text("Region"),
        text("Segment"),
        Field::new("Sales", DataType::Float64, false),
        Field::new("Profit", DataType::Float64, false),
    ]));

    let strings =
        |v: &[String]| -> ArrayRef { Arc::new(StringArray::from_iter_values(v.iter())) };
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            strings(&cols.order_date),
            strings(&cols.state),
            strings(&cols.category),
            strings(&cols.sub_category),
            strings(&cols.region),
            strings(&cols.segment),
            Arc::new(Float64Array::from(cols.sales.clone())),
            Arc::new(Float64Array::from(cols.profit.clone())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn write_csv(cols: &Columns, path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record([
        "Order Date",
        "State",
        "Category",
        "Sub-Category",
        "Region",
        "Segment",
        "Sales",
        "Profit",
    ])?;
    for i in 0..cols.sales.len() {
        let sales = cols.sales[i].to_string();
        let profit = cols.profit[i].to_string();
        writer.write_record([
            cols.order_date[i].as_str(),
            cols.state[i].as_str(),
            cols.category[i].as_str(),
            cols.sub_category[i].as_str(),
            cols.region[i].as_str(),
            cols.segment[i].as_str(),
            sales.as_str(),
            profit.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let cols = generate(2000, &mut rng);

    write_parquet(&cols, "sample_sales.parquet")?;
    write_csv(&cols, "sample_sales.csv")?;

    println!(
        "Wrote {} order lines to sample_sales.parquet and sample_sales.csv",
        cols.sales.len()
    );
    Ok(())
}
