use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::model::{QuestionKind, Record, YearRange};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// CountTable – (year, category) → count
// ---------------------------------------------------------------------------

/// Occurrence counts keyed by `(year, category)`.
///
/// Tables produced by [`build_count_table`] are dense: every pair of the
/// requested year range and category set is present, gaps holding zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    counts: BTreeMap<(i32, String), u64>,
}

impl CountTable {
    /// Count for a pair, `None` when the pair is not part of the table.
    #[cfg(test)]
    pub fn get(&self, year: i32, category: &str) -> Option<u64> {
        self.counts.get(&(year, category.to_string())).copied()
    }

    /// Number of entries (including zero-filled ones).
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries ordered by year, then category.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &str, u64)> + '_ {
        self.counts
            .iter()
            .map(|((year, cat), count)| (*year, cat.as_str(), *count))
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.counts.keys().map(|(year, _)| *year).collect()
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.counts.keys().map(|(_, cat)| cat.as_str()).collect()
    }

    /// Year-ordered series of one category (line chart input).
    pub fn series(&self, category: &str) -> Vec<(i32, u64)> {
        self.iter()
            .filter(|(_, cat, _)| *cat == category)
            .map(|(year, _, count)| (year, count))
            .collect()
    }

    /// One year-ordered series per category, categories ascending.
    pub fn all_series(&self) -> Vec<(String, Vec<(i32, u64)>)> {
        self.categories()
            .into_iter()
            .map(|cat| (cat.to_string(), self.series(cat)))
            .collect()
    }
}

/// Build a dense, gap-filled count table.
///
/// Every year in `[year_start, year_end]` is paired with every value of
/// `categories`; records are counted by exact match of their `category_key`
/// attribute. Records outside the range or whose category is not requested
/// are ignored. Duplicate categories collapse into one.
pub fn build_count_table<'a, I, C>(
    records: I,
    year_start: i32,
    year_end: i32,
    category_key: &str,
    categories: &[C],
) -> Result<CountTable, EngineError>
where
    I: IntoIterator<Item = &'a Record>,
    C: AsRef<str>,
{
    let range = YearRange::new(year_start, year_end)?;

    let mut counts: BTreeMap<(i32, String), u64> = BTreeMap::new();
    for year in range.years() {
        for cat in categories {
            counts.insert((year, cat.as_ref().to_string()), 0);
        }
    }

    for rec in records {
        if !range.contains(rec.year) {
            continue;
        }
        let Some(value) = rec.attribute(category_key) else {
            continue;
        };
        if let Some(slot) = counts.get_mut(&(rec.year, value.to_string())) {
            *slot += 1;
        }
    }

    Ok(CountTable { counts })
}

/// Sparse count table of the `(year, category)` pairs that actually occur.
///
/// Records lacking `category_key` are skipped.
pub fn count_observed<'a, I>(records: I, category_key: &str) -> CountTable
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts: BTreeMap<(i32, String), u64> = BTreeMap::new();
    for rec in records {
        if let Some(value) = rec.attribute(category_key) {
            *counts.entry((rec.year, value.to_string())).or_default() += 1;
        }
    }
    CountTable { counts }
}

// ---------------------------------------------------------------------------
// Pivot – CountTable → matrix
// ---------------------------------------------------------------------------

/// The two keys of a count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Year,
    Category,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::Year => Axis::Category,
            Axis::Category => Axis::Year,
        }
    }
}

/// A row or column label of a [`PivotMatrix`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AxisLabel {
    Year(i32),
    Category(String),
}

impl fmt::Display for AxisLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisLabel::Year(y) => write!(f, "{y}"),
            AxisLabel::Category(c) => write!(f, "{c}"),
        }
    }
}

/// Row/column/value grid (heatmap input).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotMatrix {
    pub rows: Vec<AxisLabel>,
    pub columns: Vec<AxisLabel>,
    /// `values[i][j]` is the count for `(rows[i], columns[j])`.
    pub values: Vec<Vec<u64>>,
}

impl PivotMatrix {
    pub fn get(&self, row: usize, column: usize) -> u64 {
        self.values
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.values.iter().flatten().sum()
    }

    pub fn max(&self) -> u64 {
        self.values.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }
}

/// Reshape a count table into a matrix with `rows` as the row axis and the
/// other key as columns.
///
/// Labels are the distinct values present in the table, sorted ascending
/// (years numerically). Pairs missing from the table read as zero.
pub fn pivot(table: &CountTable, rows: Axis) -> PivotMatrix {
    let label = |axis: Axis, year: i32, cat: &str| match axis {
        Axis::Year => AxisLabel::Year(year),
        Axis::Category => AxisLabel::Category(cat.to_string()),
    };

    let mut row_set = BTreeSet::new();
    let mut col_set = BTreeSet::new();
    for (year, cat, _) in table.iter() {
        row_set.insert(label(rows, year, cat));
        col_set.insert(label(rows.other(), year, cat));
    }
    let row_labels: Vec<AxisLabel> = row_set.into_iter().collect();
    let col_labels: Vec<AxisLabel> = col_set.into_iter().collect();

    let row_index: BTreeMap<&AxisLabel, usize> =
        row_labels.iter().enumerate().map(|(i, l)| (l, i)).collect();
    let col_index: BTreeMap<&AxisLabel, usize> =
        col_labels.iter().enumerate().map(|(j, l)| (l, j)).collect();

    let mut values = vec![vec![0u64; col_labels.len()]; row_labels.len()];
    for (year, cat, count) in table.iter() {
        let r = label(rows, year, cat);
        let c = label(rows.other(), year, cat);
        if let (Some(&i), Some(&j)) = (row_index.get(&r), col_index.get(&c)) {
            values[i][j] += count;
        }
    }

    PivotMatrix {
        rows: row_labels,
        columns: col_labels,
        values,
    }
}

// ---------------------------------------------------------------------------
// Multi-slot secondary tags
// ---------------------------------------------------------------------------

/// One populated secondary tag of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry<'a> {
    pub year: i32,
    /// The record's primary category (e.g. its topic), when present.
    pub primary: Option<&'a str>,
    pub tag: &'a str,
}

/// Flatten the optional tag slots `field_names` of every record into one
/// entry per populated value. Blank and absent slots are dropped.
pub fn split_multi_value_field<'a, I>(
    records: I,
    field_names: &[&str],
    primary_key: &str,
) -> Vec<TagEntry<'a>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut entries = Vec::new();
    for rec in records {
        let primary = rec.attribute(primary_key);
        for field in field_names {
            let Some(tag) = rec.attribute(field).map(str::trim) else {
                continue;
            };
            if tag.is_empty() {
                continue;
            }
            entries.push(TagEntry {
                year: rec.year,
                primary,
                tag,
            });
        }
    }
    entries
}

// ---------------------------------------------------------------------------
// Categorical counts (bar / pie inputs)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindCount {
    pub kind: QuestionKind,
    pub count: u64,
}

/// `(tag, primary)` row of the sub-topic table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub primary: Option<String>,
    pub count: u64,
}

fn sorted_counts(counts: BTreeMap<String, u64>) -> Vec<CategoryCount> {
    let mut out: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount { label, count })
        .collect();
    // Stable sort keeps ties in label order.
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Occurrences of each value of `key`, most frequent first (ties by label).
pub fn value_counts<'a, I>(records: I, key: &str) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for rec in records {
        if let Some(value) = rec.attribute(key) {
            *counts.entry(value.to_string()).or_default() += 1;
        }
    }
    sorted_counts(counts)
}

/// Occurrences of each question kind, most frequent first.
pub fn kind_counts<'a, I>(records: I) -> Vec<KindCount>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts: BTreeMap<QuestionKind, u64> = BTreeMap::new();
    for rec in records {
        *counts.entry(rec.kind).or_default() += 1;
    }
    let mut out: Vec<KindCount> = counts
        .into_iter()
        .map(|(kind, count)| KindCount { kind, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Group tag entries by `(tag, primary)`, most frequent first.
pub fn tag_counts(entries: &[TagEntry<'_>]) -> Vec<TagCount> {
    let mut counts: BTreeMap<(&str, Option<&str>), u64> = BTreeMap::new();
    for entry in entries {
        *counts.entry((entry.tag, entry.primary)).or_default() += 1;
    }
    let mut out: Vec<TagCount> = counts
        .into_iter()
        .map(|((tag, primary), count)| TagCount {
            tag: tag.to_string(),
            primary: primary.map(str::to_string),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Occurrences of each tag across all slots, most frequent first.
pub fn tag_frequencies(entries: &[TagEntry<'_>]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.tag.to_string()).or_default() += 1;
    }
    sorted_counts(counts)
}

/// Percentage of records whose `key` attribute is one of `values`.
pub fn share<'a, I, C>(records: I, key: &str, values: &[C]) -> f64
where
    I: IntoIterator<Item = &'a Record>,
    C: AsRef<str>,
{
    let mut total = 0u64;
    let mut hits = 0u64;
    for rec in records {
        total += 1;
        if let Some(value) = rec.attribute(key) {
            if values.iter().any(|v| v.as_ref() == value) {
                hits += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONT: &str = "Frente";
    const TOPIC: &str = "Tópico";

    fn rec(year: i32, front: &str) -> Record {
        Record::new(year, QuestionKind::Conceptual).with(FRONT, front)
    }

    fn tagged(year: i32, topic: &str, sub1: &str, sub2: &str) -> Record {
        Record::new(year, QuestionKind::Computational)
            .with(TOPIC, topic)
            .with("Subtópico 1", sub1)
            .with("Subtópico 2", sub2)
    }

    #[test]
    fn count_table_fills_gaps_with_zero() {
        let records = vec![rec(2020, "Mechanics"), rec(2022, "Mechanics")];
        let table = build_count_table(
            &records,
            2020,
            2022,
            FRONT,
            &["Mechanics", "Electromagnetism"],
        )
        .unwrap();

        assert_eq!(table.len(), 6);
        assert_eq!(table.get(2020, "Mechanics"), Some(1));
        assert_eq!(table.get(2021, "Mechanics"), Some(0));
        assert_eq!(table.get(2022, "Mechanics"), Some(1));
        for year in 2020..=2022 {
            assert_eq!(table.get(year, "Electromagnetism"), Some(0));
        }
    }

    #[test]
    fn count_table_from_empty_records_is_all_zero() {
        let records: Vec<Record> = Vec::new();
        let table = build_count_table(&records, 2015, 2016, FRONT, &["A"]).unwrap();

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![(2015, "A", 0), (2016, "A", 0)]);
    }

    #[test]
    fn count_table_size_is_years_times_categories() {
        let records = vec![rec(2001, "A"), rec(2009, "C")];
        let cats = ["A", "B", "C", "D"];
        let table = build_count_table(&records, 2000, 2010, FRONT, &cats).unwrap();
        assert_eq!(table.len(), 11 * cats.len());
    }

    #[test]
    fn count_table_excludes_out_of_range_and_unrequested_records() {
        let records = vec![
            rec(2019, "A"),
            rec(2020, "A"),
            rec(2020, "B"),
            rec(2021, "Z"),
            rec(2023, "A"),
            Record::new(2020, QuestionKind::Mixed),
        ];
        let table = build_count_table(&records, 2020, 2022, FRONT, &["A", "B"]).unwrap();

        assert_eq!(table.total(), 2);
        assert_eq!(table.get(2021, "Z"), None);
        assert_eq!(table.get(2023, "A"), None);
    }

    #[test]
    fn count_table_rejects_inverted_range() {
        let records = vec![rec(2020, "A")];
        let err = build_count_table(&records, 2022, 2020, FRONT, &["A"]).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidRange {
                start: 2022,
                end: 2020
            }
        );
    }

    #[test]
    fn count_table_with_unknown_key_is_zero_everywhere() {
        let records = vec![rec(2020, "A"), rec(2021, "A")];
        let table = build_count_table(&records, 2020, 2021, "Missing", &["A"]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn count_table_ignores_row_order_and_duplicate_categories() {
        let mut records = vec![rec(2020, "A"), rec(2021, "B"), rec(2021, "A"), rec(2020, "A")];
        let first = build_count_table(&records, 2020, 2021, FRONT, &["A", "B", "A"]).unwrap();
        records.reverse();
        let second = build_count_table(&records, 2020, 2021, FRONT, &["B", "A"]).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert_eq!(first.get(2020, "A"), Some(2));
    }

    #[test]
    fn series_is_year_ordered() {
        let records = vec![rec(2022, "A"), rec(2020, "A"), rec(2020, "A")];
        let table = build_count_table(&records, 2020, 2022, FRONT, &["A", "B"]).unwrap();

        assert_eq!(table.series("A"), vec![(2020, 2), (2021, 0), (2022, 1)]);
        let all = table.all_series();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].0, "B");
        assert_eq!(all[1].1, vec![(2020, 0), (2021, 0), (2022, 0)]);
    }

    #[test]
    fn observed_counts_skip_missing_attributes() {
        let records = vec![rec(2020, "A"), rec(2020, "A"), Record::new(2021, QuestionKind::Mixed)];
        let table = count_observed(&records, FRONT);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(2020, "A"), Some(2));
    }

    #[test]
    fn pivot_sorts_labels_and_fills_missing_pairs() {
        let records = vec![
            rec(2021, "Waves"),
            rec(2019, "Optics"),
            rec(2021, "Optics"),
            rec(2021, "Optics"),
        ];
        let table = count_observed(&records, FRONT);
        let matrix = pivot(&table, Axis::Category);

        assert_eq!(
            matrix.rows,
            vec![
                AxisLabel::Category("Optics".into()),
                AxisLabel::Category("Waves".into())
            ]
        );
        assert_eq!(matrix.columns, vec![AxisLabel::Year(2019), AxisLabel::Year(2021)]);
        assert_eq!(matrix.values, vec![vec![1, 2], vec![0, 1]]);
        assert_eq!(matrix.total(), table.total());
        assert_eq!(matrix.max(), 2);
    }

    #[test]
    fn pivot_with_years_as_rows_transposes() {
        let records = vec![rec(2020, "A"), rec(2010, "B")];
        let table = build_count_table(&records, 2010, 2020, FRONT, &["A", "B"]).unwrap();
        let matrix = pivot(&table, Axis::Year);

        assert_eq!(matrix.rows.len(), 11);
        assert_eq!(matrix.columns.len(), 2);
        assert_eq!(matrix.rows[0], AxisLabel::Year(2010));
        assert_eq!(matrix.get(0, 1), 1);
        assert_eq!(matrix.get(10, 0), 1);
        assert_eq!(matrix.total(), 2);
    }

    #[test]
    fn pivot_of_empty_table_is_empty() {
        let matrix = pivot(&CountTable::default(), Axis::Category);
        assert!(matrix.is_empty());
        assert_eq!(matrix.total(), 0);
    }

    #[test]
    fn split_unions_populated_slots() {
        let records = vec![
            tagged(2020, "Kinematics", "Velocity", ""),
            tagged(2021, "Kinematics", "Acceleration", "Velocity"),
            tagged(2022, "Dynamics", "  ", ""),
            Record::new(2022, QuestionKind::Unknown).with("Subtópico 2", "Velocity"),
        ];
        let entries = split_multi_value_field(&records, &["Subtópico 1", "Subtópico 2"], TOPIC);

        assert_eq!(entries.len(), 4);
        assert!(entries.len() <= 2 * records.len());
        assert!(entries.iter().all(|e| !e.tag.is_empty()));
        assert_eq!(entries[3].primary, None);

        let freq = tag_frequencies(&entries);
        assert_eq!(
            freq[0],
            CategoryCount {
                label: "Velocity".into(),
                count: 3
            }
        );

        let table = tag_counts(&entries);
        assert_eq!(table[0].tag, "Velocity");
        assert_eq!(table[0].primary.as_deref(), Some("Kinematics"));
        assert_eq!(table[0].count, 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn value_counts_order_by_count_then_label() {
        let records = vec![rec(2020, "B"), rec(2020, "A"), rec(2021, "C"), rec(2021, "C")];
        let counts = value_counts(&records, FRONT);
        let labels: Vec<_> = counts.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["C", "A", "B"]);
    }

    #[test]
    fn kind_counts_and_share() {
        let records = vec![
            rec(2020, "Mecânica"),
            rec(2020, "Óptica"),
            Record::new(2020, QuestionKind::Computational).with(FRONT, "Ondulatória"),
            Record::new(2021, QuestionKind::Computational),
        ];
        let kinds = kind_counts(&records);
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds.iter().map(|k| k.count).sum::<u64>(), 4);

        assert_eq!(share(&records, FRONT, &["Mecânica"]), 25.0);
        assert_eq!(share(&records, FRONT, &["Óptica", "Ondulatória"]), 50.0);
        assert_eq!(share(&Vec::<Record>::new(), FRONT, &["Mecânica"]), 0.0);
    }
}
