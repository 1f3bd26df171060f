use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::RangeInclusive;

use crate::config::ColumnMap;
use crate::error::{EngineError, SourceError};

// ---------------------------------------------------------------------------
// CellValue – a single raw cell as read from a sheet or file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common spreadsheet cell types.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            // Spreadsheets store whole numbers as floats; show them as integers.
            CellValue::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.0}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl CellValue {
    /// Whether the cell carries no usable value (empty or whitespace text).
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Trimmed text form, or `None` for blank cells.
    pub fn as_text(&self) -> Option<String> {
        if self.is_blank() {
            return None;
        }
        Some(self.to_string().trim().to_string())
    }

    /// Interpret the cell as a calendar year.
    ///
    /// Accepts integers, floats without a fractional part (`2020.0`) and
    /// numeric text.
    pub fn as_year(&self) -> Option<i32> {
        match self {
            CellValue::Integer(i) => i32::try_from(*i).ok(),
            CellValue::Float(v) if v.fract() == 0.0 && v.is_finite() => {
                let v = *v;
                if v >= i32::MIN as f64 && v <= i32::MAX as f64 {
                    Some(v as i32)
                } else {
                    None
                }
            }
            CellValue::Text(s) => {
                let s = s.trim();
                s.parse::<i32>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .and_then(|v| CellValue::Float(v).as_year())
                })
            }
            _ => None,
        }
    }
}

/// Guess the type of a cell that arrived as plain text (CSV).
pub fn guess_cell_type(s: &str) -> CellValue {
    if s.trim().is_empty() {
        return CellValue::Empty;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::Text(s.to_string())
}

/// One source row: column name → cell.
pub type RawRow = BTreeMap<String, CellValue>;

// ---------------------------------------------------------------------------
// QuestionKind
// ---------------------------------------------------------------------------

/// How a question is solved, as classified in the source sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QuestionKind {
    Computational,
    Conceptual,
    Mixed,
    Unknown,
}

impl QuestionKind {
    /// Parse a source label. Unrecognised labels (including `(?)`) are `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "conta" | "cálculo" | "calculo" | "computational" => QuestionKind::Computational,
            "conceitual" | "conceptual" => QuestionKind::Conceptual,
            "mista" | "misto" | "mixed" => QuestionKind::Mixed,
            _ => QuestionKind::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::Computational => "Computational",
            QuestionKind::Conceptual => "Conceptual",
            QuestionKind::Mixed => "Mixed",
            QuestionKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Record – one exam question
// ---------------------------------------------------------------------------

/// A single classified exam question (one row of a subject sheet).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub year: i32,
    pub kind: QuestionKind,
    /// Populated classification columns: column_name → trimmed value.
    /// Blank cells are never stored.
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    pub fn new(year: i32, kind: QuestionKind) -> Self {
        Record {
            year,
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter; blank values are ignored.
    pub fn with(mut self, column: &str, value: &str) -> Self {
        let value = value.trim();
        if !value.is_empty() {
            self.attributes.insert(column.to_string(), value.to_string());
        }
        self
    }

    pub fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes.get(column).map(String::as_str)
    }

    /// Convert a raw source row into a record.
    ///
    /// Returns `Ok(None)` for entirely blank rows.
    pub fn from_row(
        row: &RawRow,
        columns: &ColumnMap,
        subject: &str,
        row_no: usize,
    ) -> Result<Option<Record>, SourceError> {
        if row.values().all(CellValue::is_blank) {
            return Ok(None);
        }

        let year_cell = row.get(&columns.year).unwrap_or(&CellValue::Empty);
        let year = year_cell.as_year().ok_or_else(|| {
            SourceError::format(
                subject,
                format!(
                    "row {row_no}: '{}' is not a valid year ('{year_cell}')",
                    columns.year
                ),
            )
        })?;

        let kind = row
            .get(&columns.kind)
            .and_then(CellValue::as_text)
            .map(|label| QuestionKind::parse(&label))
            .unwrap_or(QuestionKind::Unknown);

        let record = row
            .iter()
            .filter(|(col, _)| **col != columns.year && **col != columns.kind)
            .filter_map(|(col, cell)| cell.as_text().map(|v| (col, v)))
            .fold(Record::new(year, kind), |rec, (col, v)| rec.with(col, &v));

        Ok(Some(record))
    }
}

// ---------------------------------------------------------------------------
// RecordSet – all records of one subject
// ---------------------------------------------------------------------------

/// The full parsed record set of one subject with pre-computed indices.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub subject: String,
    pub records: Vec<Record>,
    /// Ordered list of attribute column names seen in any record.
    pub column_names: Vec<String>,
    /// For each attribute column the sorted set of distinct values.
    pub unique_values: BTreeMap<String, BTreeSet<String>>,
    /// Years present in the data, ascending.
    pub years: BTreeSet<i32>,
}

impl RecordSet {
    /// Build column indices from the loaded records.
    pub fn from_records(subject: &str, records: Vec<Record>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut years = BTreeSet::new();

        for rec in &records {
            years.insert(rec.year);
            for (col, val) in &rec.attributes {
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names = unique_values.keys().cloned().collect();
        RecordSet {
            subject: subject.to_string(),
            records,
            column_names,
            unique_values,
            years,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct values of an attribute column (empty when unknown).
    pub fn categories(&self, column: &str) -> Vec<String> {
        self.unique_values
            .get(column)
            .map(|vals| vals.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// First and last year present in the data.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        Some((*self.years.first()?, *self.years.last()?))
    }
}

// ---------------------------------------------------------------------------
// YearRange
// ---------------------------------------------------------------------------

/// Inclusive, validated year interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    /// Inverted bounds are rejected rather than swapped.
    pub fn new(start: i32, end: i32) -> Result<Self, EngineError> {
        if start > end {
            return Err(EngineError::InvalidRange { start, end });
        }
        Ok(YearRange { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.start..=self.end
    }

    /// Number of years covered (always at least one).
    pub fn len(&self) -> usize {
        (i64::from(self.end) - i64::from(self.start) + 1) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, CellValue)]) -> RawRow {
        cells
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn year_accepts_whole_floats_and_text() {
        assert_eq!(CellValue::Float(2020.0).as_year(), Some(2020));
        assert_eq!(CellValue::Text(" 2019 ".into()).as_year(), Some(2019));
        assert_eq!(CellValue::Text("2018.0".into()).as_year(), Some(2018));
        assert_eq!(CellValue::Float(2020.5).as_year(), None);
        assert_eq!(CellValue::Empty.as_year(), None);
    }

    #[test]
    fn question_kind_parses_source_labels() {
        assert_eq!(QuestionKind::parse("Conta"), QuestionKind::Computational);
        assert_eq!(QuestionKind::parse("conceitual "), QuestionKind::Conceptual);
        assert_eq!(QuestionKind::parse("Mista"), QuestionKind::Mixed);
        assert_eq!(QuestionKind::parse("(?)"), QuestionKind::Unknown);
    }

    #[test]
    fn from_row_drops_blank_attributes() {
        let columns = ColumnMap::default();
        let raw = row(&[
            ("Ano", CellValue::Float(2021.0)),
            ("Tipo", CellValue::Text("Conta".into())),
            ("Frente", CellValue::Text("Mecânica".into())),
            ("Subtópico 1", CellValue::Text("  ".into())),
            ("Subtópico 2", CellValue::Empty),
        ]);
        let rec = Record::from_row(&raw, &columns, "Fisica", 2)
            .unwrap()
            .unwrap();
        assert_eq!(rec.year, 2021);
        assert_eq!(rec.kind, QuestionKind::Computational);
        assert_eq!(rec.attribute("Frente"), Some("Mecânica"));
        assert_eq!(rec.attributes.len(), 1);
    }

    #[test]
    fn from_row_skips_blank_rows_and_rejects_bad_years() {
        let columns = ColumnMap::default();
        let blank = row(&[("Ano", CellValue::Empty), ("Frente", CellValue::Empty)]);
        assert!(Record::from_row(&blank, &columns, "Fisica", 3)
            .unwrap()
            .is_none());

        let bad = row(&[("Ano", CellValue::Text("twenty".into()))]);
        let err = Record::from_row(&bad, &columns, "Fisica", 4).unwrap_err();
        assert!(matches!(err, SourceError::DataFormat { .. }));
        assert!(err.to_string().contains("row 4"));
    }

    #[test]
    fn record_set_indexes_columns_and_years() {
        let set = RecordSet::from_records(
            "Fisica",
            vec![
                Record::new(2020, QuestionKind::Conceptual).with("Frente", "Óptica"),
                Record::new(2018, QuestionKind::Mixed).with("Frente", "Mecânica"),
            ],
        );
        assert_eq!(set.year_bounds(), Some((2018, 2020)));
        assert_eq!(set.categories("Frente"), vec!["Mecânica", "Óptica"]);
        assert!(set.categories("Tópico").is_empty());
    }

    #[test]
    fn year_range_is_strict() {
        assert_eq!(
            YearRange::new(2022, 2020),
            Err(EngineError::InvalidRange {
                start: 2022,
                end: 2020
            })
        );
        let range = YearRange::new(2020, 2022).unwrap();
        assert_eq!(range.len(), 3);
        assert!(range.contains(2021));
        assert!(!range.contains(2023));
    }
}
