use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, Date32Array, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::dates::DateNormalizer;
use super::model::{Dataset, MonthKey, SalesRow};
use crate::error::DataError;

// ---------------------------------------------------------------------------
// Required columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Column {
    OrderDate,
    State,
    Category,
    SubCategory,
    Region,
    Segment,
    Sales,
    Profit,
}

impl Column {
    const ALL: [Column; 8] = [
        Column::OrderDate,
        Column::State,
        Column::Category,
        Column::SubCategory,
        Column::Region,
        Column::Segment,
        Column::Sales,
        Column::Profit,
    ];

    fn header(self) -> &'static str {
        match self {
            Column::OrderDate => "Order Date",
            Column::State => "State",
            Column::Category => "Category",
            Column::SubCategory => "Sub-Category",
            Column::Region => "Region",
            Column::Segment => "Segment",
            Column::Sales => "Sales",
            Column::Profit => "Profit",
        }
    }
}

/// Position of each required column within a header row.
#[derive(Debug)]
struct ColumnIndex([usize; 8]);

impl ColumnIndex {
    /// Resolve required columns, trimming whitespace around header names.
    /// Every missing name is reported at once.
    fn resolve<S: AsRef<str>>(headers: &[S]) -> Result<Self, DataError> {
        let mut positions = [0usize; 8];
        let mut missing = Vec::new();
        for (slot, col) in positions.iter_mut().zip(Column::ALL) {
            match headers.iter().position(|h| h.as_ref().trim() == col.header()) {
                Some(i) => *slot = i,
                None => missing.push(col.header().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(ColumnIndex(positions))
        } else {
            Err(DataError::MissingColumns { missing })
        }
    }

    fn get(&self, col: Column) -> usize {
        self.0[col as usize]
    }
}

/// A single source cell, before conversion into a typed row field.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Null,
}

impl Cell {
    fn into_text(self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(v) => v.to_string(),
            Cell::Date(d) => d.to_string(),
            Cell::Null => String::new(),
        }
    }
}

/// Turns raw cells into rows, normalising dates as it goes.
#[derive(Debug, Default)]
struct RowBuilder {
    dates: DateNormalizer,
    missing_amounts: usize,
    rows: Vec<SalesRow>,
}

impl RowBuilder {
    fn push(
        &mut self,
        row_no: usize,
        mut cell: impl FnMut(Column) -> Cell,
    ) -> Result<(), DataError> {
        let sales = amount(row_no, Column::Sales, cell(Column::Sales))?;
        let profit = amount(row_no, Column::Profit, cell(Column::Profit))?;
        let missing_amount = sales.is_none() || profit.is_none();
        if missing_amount {
            self.missing_amounts += 1;
            log::debug!("row {row_no}: blank or non-finite Sales/Profit read as 0");
        }

        let (order_date_raw, order_date) = match cell(Column::OrderDate) {
            Cell::Date(d) => {
                self.dates.record_parsed();
                (d.to_string(), Some(d))
            }
            other => {
                let raw = other.into_text();
                let parsed = self.dates.normalize(&raw);
                (raw, parsed)
            }
        };

        self.rows.push(SalesRow {
            order_date_raw,
            order_date,
            month: order_date.map(MonthKey::from_date),
            state: cell(Column::State).into_text(),
            category: cell(Column::Category).into_text(),
            sub_category: cell(Column::SubCategory).into_text(),
            region: cell(Column::Region).into_text(),
            segment: cell(Column::Segment).into_text(),
            sales: sales.unwrap_or(0.0),
            profit: profit.unwrap_or(0.0),
            missing_amount,
        });
        Ok(())
    }

    fn finish(self, source: &str) -> Dataset {
        let total = self.rows.len();
        let unparsed = self.dates.unparsed_count();
        if unparsed > 0 {
            log::warn!(
                "{source}: {unparsed} of {total} order dates could not be parsed; \
                 those rows are left out of the monthly trend"
            );
        }
        if self.missing_amounts > 0 {
            log::warn!(
                "{source}: {} of {total} rows have a blank or non-finite Sales or Profit; \
                 they count as 0 and are left out of the profit margin",
                self.missing_amounts
            );
        }
        let dated = self.dates.parsed_count();
        let dataset = Dataset::from_rows(self.rows);
        log::info!("{source}: loaded {total} rows, {dated} with an order date");
        dataset
    }
}

/// Parse a `Sales`/`Profit` cell. Blank and non-finite values (`NaN`, `inf`)
/// are missing; other non-numeric text is an error.
fn amount(row: usize, col: Column, cell: Cell) -> Result<Option<f64>, DataError> {
    let invalid = |value: String| DataError::InvalidNumber {
        row,
        column: col.header().to_string(),
        value,
    };
    let value = match cell {
        Cell::Number(v) => v,
        Cell::Null => return Ok(None),
        Cell::Text(s) => {
            let cleaned = s.trim().replace(',', "");
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned.parse::<f64>().map_err(|_| invalid(s))?
        }
        Cell::Date(d) => return Err(invalid(d.to_string())),
    };
    Ok(value.is_finite().then_some(value))
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sales dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one order line per record (UTF-8 or Latin-1)
/// * `.json`    – `[{ "Order Date": "...", "State": "...", ... }, ...]`
/// * `.parquet` – one column per field, strings or numbers
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading CSV file {}", path.display()))?;
            load_csv_bytes(&bytes)
        }
        "json" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading JSON file {}", path.display()))?;
            load_json_str(&text)
        }
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Decode as UTF-8 when valid, otherwise as Latin-1.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s).to_string(),
        Err(_) => {
            log::debug!("input is not UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Parse CSV content. Extra columns are ignored.
pub fn load_csv_bytes(bytes: &[u8]) -> Result<Dataset> {
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let index = ColumnIndex::resolve(&headers)?;

    let mut builder = RowBuilder::default();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        builder.push(row_no, |col| {
            Cell::Text(record.get(index.get(col)).unwrap_or("").to_string())
        })?;
    }

    Ok(builder.finish("csv"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   {
///     "Order Date": "11/8/2016",
///     "State": "Kentucky",
///     "Sales": 261.96,
///     "Profit": 41.9136,
///     ...
///   },
///   ...
/// ]
/// ```
pub fn load_json_str(text: &str) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut builder = RowBuilder::default();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let fields: HashMap<&str, &JsonValue> =
            obj.iter().map(|(k, v)| (k.trim(), v)).collect();
        let keys: Vec<&str> = fields.keys().copied().collect();
        ColumnIndex::resolve(&keys)?;

        builder.push(i, |col| {
            fields
                .get(col.header())
                .map_or(Cell::Null, |v| json_to_cell(v))
        })?;
    }

    Ok(builder.finish("json"))
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) => n.as_f64().map_or_else(|| Cell::Text(n.to_string()), Cell::Number),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one order line per row.
///
/// Text columns may be Utf8, LargeUtf8 or dictionary-encoded strings (pandas
/// categoricals), `Sales`/`Profit` any integer or float type, and
/// `Order Date` text, Date32, Date64 or a timestamp of any unit. Any other
/// column type is a `DataError::UnsupportedColumnType`.
pub fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let index = {
        let names: Vec<&str> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        ColumnIndex::resolve(&names)?
    };
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = RowBuilder::default();
    let mut offset = 0usize;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = Column::ALL
            .iter()
            .map(|&col| readable_column(batch.column(index.get(col)), col))
            .collect::<Result<Vec<_>, _>>()?;
        for row in 0..batch.num_rows() {
            rows.push(offset + row, |col| extract_cell(&columns[col as usize], row))?;
        }
        offset += batch.num_rows();
    }

    Ok(rows.finish("parquet"))
}

/// Cast a column into one of the layouts [`extract_cell`] reads.
fn readable_column(col: &ArrayRef, column: Column) -> Result<ArrayRef, DataError> {
    let target = match col.data_type() {
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Date32 => return Ok(Arc::clone(col)),
        DataType::Dictionary(_, values)
            if matches!(values.as_ref(), DataType::Utf8 | DataType::LargeUtf8) =>
        {
            DataType::Utf8
        }
        DataType::Int8
        | DataType::Int16
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => DataType::Float64,
        DataType::Timestamp(_, _) | DataType::Date64 => DataType::Date32,
        _ => return Err(unsupported(col, column)),
    };
    cast(col, &target).map_err(|e| {
        log::debug!("casting column '{}' to {target}: {e}", column.header());
        unsupported(col, column)
    })
}

fn unsupported(col: &ArrayRef, column: Column) -> DataError {
    DataError::UnsupportedColumnType {
        column: column.header().to_string(),
        data_type: col.data_type().to_string(),
    }
}

/// Extract a single cell from a column prepared by [`readable_column`].
fn extract_cell(col: &ArrayRef, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map_or(Cell::Null, |a| Cell::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => Cell::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map_or(Cell::Null, |a| Cell::Number(a.value(row) as f64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map_or(Cell::Null, |a| Cell::Number(a.value(row) as f64)),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map_or(Cell::Null, |a| Cell::Number(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map_or(Cell::Null, |a| Cell::Number(a.value(row))),
        DataType::Date32 => any
            .downcast_ref::<Date32Array>()
            .and_then(|a| a.value_as_date(row))
            .map_or(Cell::Null, Cell::Date),
        // `readable_column` casts everything else away.
        _ => Cell::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Row ID, Order Date ,State,Category,Sub-Category,Region,Segment, Sales,Profit\n";

    #[test]
    fn csv_headers_are_trimmed_and_extra_columns_ignored() {
        let csv = format!(
            "{HEADER}1,11/8/2016,Kentucky,Furniture,Bookcases,South,Consumer,261.96,41.9136\n"
        );
        let ds = load_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        let row = &ds.rows()[0];
        assert_eq!(row.state, "Kentucky");
        assert_eq!(row.sub_category, "Bookcases");
        assert_eq!(row.month, Some(MonthKey::new(2016, 11)));
        assert!((row.sales - 261.96).abs() < 1e-9);
    }

    #[test]
    fn missing_columns_are_reported_together() {
        let csv = "Order Date,State,Category,Region,Sales\n";
        let err = load_csv_bytes(csv.as_bytes()).unwrap_err();
        let data_err = err.downcast_ref::<DataError>().unwrap();
        assert_eq!(
            data_err,
            &DataError::MissingColumns {
                missing: vec!["Sub-Category".into(), "Segment".into(), "Profit".into()],
            }
        );
    }

    #[test]
    fn bad_date_keeps_the_row() {
        let csv = format!("{HEADER}1,not-a-date,Texas,Technology,Phones,Central,Corporate,10,2\n");
        let ds = load_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows()[0].order_date, None);
        assert_eq!(ds.rows()[0].month, None);
        assert_eq!(ds.rows()[0].order_date_raw, "not-a-date");
    }

    #[test]
    fn blank_and_non_finite_amounts_keep_the_row() {
        let csv = format!(
            "{HEADER}1,1/1/2016,Texas,Technology,Phones,Central,Corporate,,2\n\
             2,1/2/2016,Texas,Technology,Phones,Central,Corporate,NaN,3\n\
             3,1/3/2016,Texas,Technology,Phones,Central,Corporate,40,inf\n\
             4,1/4/2016,Texas,Technology,Phones,Central,Corporate,50,5\n"
        );
        let ds = load_csv_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);
        let rows = ds.rows();
        assert_eq!((rows[0].sales, rows[0].profit), (0.0, 2.0));
        assert_eq!((rows[1].sales, rows[1].profit), (0.0, 3.0));
        assert_eq!((rows[2].sales, rows[2].profit), (40.0, 0.0));
        assert!(rows[..3].iter().all(|r| r.missing_amount));
        assert!(!rows[3].missing_amount);
        assert!(rows.iter().all(|r| r.sales.is_finite() && r.profit.is_finite()));
    }

    #[test]
    fn json_null_amount_is_missing() {
        let json = r#"[{"Order Date": "2017-01-05", "State": "Ohio", "Category": "Furniture",
             "Sub-Category": "Tables", "Region": "East", "Segment": "Home Office",
             "Sales": 12, "Profit": null}]"#;
        let ds = load_json_str(json).unwrap();
        assert!(ds.rows()[0].missing_amount);
        assert_eq!(ds.rows()[0].profit, 0.0);
    }

    #[test]
    fn non_numeric_sales_is_a_data_error() {
        let csv = format!("{HEADER}1,1/1/2016,Texas,Technology,Phones,Central,Corporate,abc,2\n");
        let err = load_csv_bytes(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::InvalidNumber { row: 0, column, .. }) if column == "Sales"
        ));
    }

    #[test]
    fn latin1_bytes_are_decoded() {
        let mut bytes = HEADER.as_bytes().to_vec();
        bytes.extend_from_slice(b"1,1/1/2016,Qu\xe9bec,Furniture,Chairs,East,Consumer,5,1\n");
        let ds = load_csv_bytes(&bytes).unwrap();
        assert_eq!(ds.rows()[0].state, "Qu\u{e9}bec");
    }

    #[test]
    fn header_only_csv_is_an_empty_dataset() {
        let ds = load_csv_bytes(HEADER.as_bytes()).unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn json_accepts_numbers_and_numeric_strings() {
        let json = r#"[
            {"Order Date": "2017-01-05", "State": "Ohio", "Category": "Furniture",
             "Sub-Category": "Tables", "Region": "East", "Segment": "Home Office",
             "Sales": "120.5", "Profit": -3},
            {" Order Date ": "bogus", "State": "Ohio", "Category": "Furniture",
             "Sub-Category": "Tables", "Region": "East", "Segment": "Home Office",
             "Sales": 10, "Profit": 1.5}
        ]"#;
        let ds = load_json_str(json).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].sales, 120.5);
        assert_eq!(ds.rows()[0].profit, -3.0);
        assert_eq!(ds.rows()[1].month, None);
    }

    #[test]
    fn json_record_without_profit_is_rejected() {
        let json = r#"[{"Order Date": "2017-01-05", "State": "Ohio", "Category": "Furniture",
             "Sub-Category": "Tables", "Region": "East", "Segment": "Home Office", "Sales": 1}]"#;
        let err = load_json_str(json).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DataError>(),
            Some(&DataError::MissingColumns { missing: vec!["Profit".into()] })
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(load_file(Path::new("sales.xlsx")).is_err());
    }
}
