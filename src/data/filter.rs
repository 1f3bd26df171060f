use std::collections::{BTreeMap, BTreeSet};

use super::model::{Record, RecordSet, YearRange};

// ---------------------------------------------------------------------------
// Filter predicate: year range plus selected values per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of selected values.
pub type Selection = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Inclusive year window; `None` admits every year.
    pub years: Option<YearRange>,
    pub selections: Selection,
}

impl RecordFilter {
    pub fn years(range: YearRange) -> Self {
        RecordFilter {
            years: Some(range),
            selections: Selection::new(),
        }
    }

    /// Restrict `column` to a single value.
    pub fn only(mut self, column: &str, value: &str) -> Self {
        self.selections
            .insert(column.to_string(), BTreeSet::from([value.to_string()]));
        self
    }

    /// A record passes a column selection when:
    /// * The column is not present in `selections` → passes (no constraint)
    /// * The selected set for that column is empty → nothing selected → fails
    /// * The record's value for that column is in the selected set → passes
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(range) = &self.years {
            if !range.contains(record.year) {
                return false;
            }
        }
        self.selections.iter().all(|(col, selected)| {
            match record.attribute(col) {
                Some(val) => selected.contains(val),
                // record doesn't have this column → fails any active selection
                None => false,
            }
        })
    }

    /// Records passing the filter, in source order.
    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a Record>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Return the records of `set` that pass `filter`.
pub fn filtered<'a>(set: &'a RecordSet, filter: &RecordFilter) -> Vec<&'a Record> {
    filter.apply(&set.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::QuestionKind;

    fn sample() -> RecordSet {
        RecordSet::from_records(
            "Fisica",
            vec![
                Record::new(2019, QuestionKind::Conceptual).with("Frente", "Mecânica"),
                Record::new(2020, QuestionKind::Computational).with("Frente", "Óptica"),
                Record::new(2021, QuestionKind::Mixed).with("Frente", "Mecânica"),
                Record::new(2021, QuestionKind::Unknown),
            ],
        )
    }

    #[test]
    fn default_filter_admits_everything() {
        let set = sample();
        assert_eq!(filtered(&set, &RecordFilter::default()).len(), 4);
    }

    #[test]
    fn year_range_is_inclusive() {
        let set = sample();
        let filter = RecordFilter::years(YearRange::new(2020, 2021).unwrap());
        let years: Vec<i32> = filtered(&set, &filter).iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2020, 2021, 2021]);
    }

    #[test]
    fn selection_requires_matching_value() {
        let set = sample();
        let filter = RecordFilter::default().only("Frente", "Mecânica");
        let hits = filtered(&set, &filter);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|r| r.attribute("Frente") == Some("Mecânica")));
    }

    #[test]
    fn empty_selection_admits_nothing() {
        let set = sample();
        let mut filter = RecordFilter::default();
        filter.selections.insert("Frente".to_string(), BTreeSet::new());
        assert!(filtered(&set, &filter).is_empty());
    }

    #[test]
    fn unmatched_selection_yields_empty_result() {
        let set = sample();
        let filter = RecordFilter::years(YearRange::new(2019, 2021).unwrap())
            .only("Frente", "Termofísica");
        assert!(filtered(&set, &filter).is_empty());
    }
}
