use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto, Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{guess_cell_type, CellValue, RawRow, Record, RecordSet};
use crate::config::ColumnMap;
use crate::error::SourceError;

// ---------------------------------------------------------------------------
// Data source contract
// ---------------------------------------------------------------------------

/// Something that can hand out the record set of a named subject.
pub trait DataSource {
    /// Workbook file or directory the records come from.
    fn location(&self) -> &Path;

    /// Subject identifiers available in the source.
    fn subjects(&self) -> Result<Vec<String>, SourceError>;

    /// Load every record of `subject`.
    fn load(&self, subject: &str) -> Result<RecordSet, SourceError>;

    /// Modification stamp of the data backing `subject`, used to detect
    /// changes on disk. `None` when unknown.
    fn revision(&self, subject: &str) -> Option<SystemTime>;
}

/// Pick a source implementation for `path`: directories hold one file per
/// subject, anything else is treated as a workbook with one sheet per subject.
pub fn open_source(path: &Path, columns: &ColumnMap) -> Box<dyn DataSource> {
    if path.is_dir() {
        Box::new(DirectorySource::new(path, columns.clone()))
    } else {
        Box::new(WorkbookSource::new(path, columns.clone()))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Turn header + rows into a record set, validating the year column.
fn rows_to_records(
    subject: &str,
    header: &[String],
    rows: Vec<RawRow>,
    columns: &ColumnMap,
) -> Result<RecordSet, SourceError> {
    // An empty JSON array carries no header at all.
    if header.is_empty() && rows.is_empty() {
        return Ok(RecordSet::from_records(subject, Vec::new()));
    }
    if !header.iter().any(|h| *h == columns.year) {
        return Err(SourceError::format(
            subject,
            format!("missing '{}' column", columns.year),
        ));
    }

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        // Row 1 is the header, data starts at row 2.
        if let Some(record) = Record::from_row(row, columns, subject, i + 2)? {
            records.push(record);
        }
    }

    log::debug!(
        "Parsed {} of {} rows for subject '{subject}'",
        records.len(),
        rows.len()
    );
    Ok(RecordSet::from_records(subject, records))
}

// ---------------------------------------------------------------------------
// Workbook source (xlsx / xls / xlsb / ods)
// ---------------------------------------------------------------------------

/// A spreadsheet workbook where every subject is a sheet.
pub struct WorkbookSource {
    path: PathBuf,
    columns: ColumnMap,
}

impl WorkbookSource {
    pub fn new(path: &Path, columns: ColumnMap) -> Self {
        WorkbookSource {
            path: path.to_path_buf(),
            columns,
        }
    }
}

impl DataSource for WorkbookSource {
    fn location(&self) -> &Path {
        &self.path
    }

    fn subjects(&self) -> Result<Vec<String>, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::not_found("*", &self.path));
        }
        let workbook = open_workbook_auto(&self.path)
            .map_err(|e| SourceError::format("*", format!("cannot open workbook: {e}")))?;
        Ok(workbook.sheet_names().to_vec())
    }

    fn load(&self, subject: &str) -> Result<RecordSet, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::not_found(subject, &self.path));
        }

        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| SourceError::format(subject, format!("cannot open workbook: {e}")))?;

        if !workbook.sheet_names().iter().any(|name| name == subject) {
            return Err(SourceError::not_found(subject, &self.path));
        }

        let range = workbook
            .worksheet_range(subject)
            .map_err(|e| SourceError::format(subject, format!("cannot read sheet: {e}")))?;

        let mut rows_iter = range.rows();
        let header: Vec<String> = match rows_iter.next() {
            Some(cells) => cells.iter().map(|c| c.to_string().trim().to_string()).collect(),
            None => return Err(SourceError::format(subject, "sheet is empty")),
        };

        let rows: Vec<RawRow> = rows_iter
            .map(|cells| {
                header
                    .iter()
                    .zip(cells.iter())
                    .filter(|(name, _)| !name.is_empty())
                    .map(|(name, cell)| (name.clone(), workbook_cell(cell)))
                    .collect()
            })
            .collect();

        rows_to_records(subject, &header, rows, &self.columns)
    }

    fn revision(&self, _subject: &str) -> Option<SystemTime> {
        modified(&self.path)
    }
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Empty | Data::Error(_) => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Directory source (one csv / json / parquet file per subject)
// ---------------------------------------------------------------------------

const SUPPORTED_EXTENSIONS: [&str; 4] = ["csv", "json", "parquet", "pq"];

/// A directory where every subject is a `<subject>.<ext>` file.
pub struct DirectorySource {
    dir: PathBuf,
    columns: ColumnMap,
}

impl DirectorySource {
    pub fn new(dir: &Path, columns: ColumnMap) -> Self {
        DirectorySource {
            dir: dir.to_path_buf(),
            columns,
        }
    }

    /// First existing file for `subject`, in extension preference order.
    fn subject_file(&self, subject: &str) -> Option<PathBuf> {
        SUPPORTED_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{subject}.{ext}")))
            .find(|p| p.is_file())
    }
}

impl DataSource for DirectorySource {
    fn location(&self) -> &Path {
        &self.dir
    }

    fn subjects(&self) -> Result<Vec<String>, SourceError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| SourceError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut subjects: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
            })
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        subjects.sort();
        subjects.dedup();
        Ok(subjects)
    }

    fn load(&self, subject: &str) -> Result<RecordSet, SourceError> {
        let path = self
            .subject_file(subject)
            .ok_or_else(|| SourceError::not_found(subject, &self.dir))?;
        let (header, rows) = load_file(&path, subject)?;
        rows_to_records(subject, &header, rows, &self.columns)
    }

    fn revision(&self, subject: &str) -> Option<SystemTime> {
        self.subject_file(subject).and_then(|p| modified(&p))
    }
}

/// Read a tabular file into header + raw rows.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names
/// * `.json`    – `[{ "Ano": 2020, "Frente": "...", ... }, ...]`
/// * `.parquet` – one column per field
pub fn load_file(path: &Path, subject: &str) -> Result<(Vec<String>, Vec<RawRow>), SourceError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, subject),
        "json" => load_json(path, subject),
        "csv" => load_csv(path, subject),
        other => Err(SourceError::format(
            subject,
            format!("unsupported file extension: .{other}"),
        )),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, subject: &str) -> Result<(Vec<String>, Vec<RawRow>), SourceError> {
    let bytes = read_bytes(path)?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SourceError::format(subject, format!("reading CSV headers: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| SourceError::format(subject, format!("CSV row {}: {e}", row_no + 2)))?;

        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.clone(), guess_cell_type(value)))
            .collect();
        rows.push(row);
    }

    Ok((headers, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn load_json(path: &Path, subject: &str) -> Result<(Vec<String>, Vec<RawRow>), SourceError> {
    let bytes = read_bytes(path)?;
    let root: JsonValue = serde_json::from_slice(&bytes)
        .map_err(|e| SourceError::format(subject, format!("parsing JSON: {e}")))?;

    let items = root
        .as_array()
        .ok_or_else(|| SourceError::format(subject, "expected top-level JSON array"))?;

    let mut header: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| SourceError::format(subject, format!("row {i} is not a JSON object")))?;

        let mut row = RawRow::new();
        for (key, val) in obj {
            if !header.contains(key) {
                header.push(key.clone());
            }
            row.insert(key.clone(), json_to_cell(val));
        }
        rows.push(row);
    }

    Ok((header, rows))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, subject: &str) -> Result<(Vec<String>, Vec<RawRow>), SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| SourceError::format(subject, format!("reading parquet metadata: {e}")))?;
    // Taken from the file schema so zero-row files keep their columns.
    let header: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder
        .build()
        .map_err(|e| SourceError::format(subject, format!("reading parquet metadata: {e}")))?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| SourceError::format(subject, format!("reading parquet batch: {e}")))?;
        let schema = batch.schema();

        for row in 0..batch.num_rows() {
            let mut raw = RawRow::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = extract_cell_value(batch.column(col_idx), row);
                raw.insert(field.name().clone(), value);
            }
            rows.push(raw);
        }
    }

    Ok((header, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell_value(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Empty;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| CellValue::Text(a.value(row).to_string())),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| CellValue::Text(a.value(row).to_string())),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row))),
        other => Some(CellValue::Text(format!("{other:?}"))),
    };
    value.unwrap_or(CellValue::Empty)
}
