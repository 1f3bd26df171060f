use std::collections::BTreeSet;

use crate::config::{ColumnMap, HighlightGroup};
use crate::data::aggregate::{
    build_count_table, count_observed, kind_counts, pivot, share, split_multi_value_field,
    tag_counts, tag_frequencies, value_counts, Axis, CategoryCount, CountTable, KindCount,
    PivotMatrix, TagCount,
};
use crate::data::filter::{filtered, RecordFilter};
use crate::data::model::{Record, RecordSet, YearRange};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Selection – everything the user picked on a subject page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub year_start: i32,
    pub year_end: i32,
    /// Fronts plotted in the evolution chart; empty means all of them.
    pub evolution_fronts: BTreeSet<String>,
    /// Front shown in the detail section; falls back to the first available.
    pub front: Option<String>,
    /// Restricts the sub-topic table to one topic; `None` shows every topic.
    pub table_topic: Option<String>,
    /// Topic of the focus section; falls back to the first available.
    pub focus_topic: Option<String>,
}

impl Selection {
    /// Full year span of the data with nothing else selected.
    pub fn for_records(records: &RecordSet) -> Option<Self> {
        let (year_start, year_end) = records.year_bounds()?;
        Some(Selection {
            year_start,
            year_end,
            evolution_fronts: BTreeSet::new(),
            front: None,
            table_topic: None,
            focus_topic: None,
        })
    }

    pub fn year_range(&self) -> Result<YearRange, EngineError> {
        YearRange::new(self.year_start, self.year_end)
    }
}

// ---------------------------------------------------------------------------
// Report – chart-ready data for one subject page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub label: String,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectReport {
    pub range: YearRange,
    pub total: usize,
    pub highlights: Vec<Highlight>,
    pub front_counts: Vec<CategoryCount>,
    pub kind_counts: Vec<KindCount>,
    pub topic_counts: Vec<CategoryCount>,
    /// Every front of the subject, for the evolution selector.
    pub fronts: Vec<String>,
    /// Dense year × front table of the selected fronts.
    pub evolution: CountTable,
    pub detail: Option<FrontDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontDetail {
    pub front: String,
    /// Fronts present in the selected years, for the detail selector.
    pub available_fronts: Vec<String>,
    pub topics: Vec<String>,
    /// Topic the sub-topic table is restricted to, if it is one of `topics`.
    pub table_topic: Option<String>,
    pub topic_counts: Vec<CategoryCount>,
    pub sub_topic_table: Vec<TagCount>,
    pub kind_counts: Vec<KindCount>,
    /// Dense year × topic table over the selected years.
    pub topic_trend: CountTable,
    /// Topics as rows, observed years as columns.
    pub heatmap: PivotMatrix,
    pub focus: Option<TopicFocus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicFocus {
    pub topic: String,
    pub sub_topics: Vec<CategoryCount>,
    pub kind_counts: Vec<KindCount>,
}

/// Pick `wanted` if it is one of `available`, else the first available.
fn pick(wanted: Option<&String>, available: &[String]) -> Option<String> {
    match wanted {
        Some(w) if available.contains(w) => Some(w.clone()),
        Some(w) => {
            log::debug!("Selection '{w}' matches no records, falling back");
            available.first().cloned()
        }
        None => available.first().cloned(),
    }
}

fn distinct<'a>(records: &[&'a Record], column: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.attribute(column))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Build every chart series of a subject page for the current selection.
pub fn build_report(
    records: &RecordSet,
    columns: &ColumnMap,
    highlights: &[HighlightGroup],
    selection: &Selection,
) -> Result<SubjectReport, EngineError> {
    let range = selection.year_range()?;
    let in_range = filtered(records, &RecordFilter::years(range));

    let highlights = highlights
        .iter()
        .map(|group| Highlight {
            label: group.label.clone(),
            percent: share(in_range.iter().copied(), &columns.front, &group.fronts),
        })
        .collect();

    let fronts = records.categories(&columns.front);
    let evolution_fronts: Vec<String> = if selection.evolution_fronts.is_empty() {
        fronts.clone()
    } else {
        selection.evolution_fronts.iter().cloned().collect()
    };
    let evolution = build_count_table(
        in_range.iter().copied(),
        range.start(),
        range.end(),
        &columns.front,
        &evolution_fronts,
    )?;

    let detail = build_detail(&in_range, columns, range, selection)?;

    Ok(SubjectReport {
        range,
        total: in_range.len(),
        highlights,
        front_counts: value_counts(in_range.iter().copied(), &columns.front),
        kind_counts: kind_counts(in_range.iter().copied()),
        topic_counts: value_counts(in_range.iter().copied(), &columns.topic),
        fronts,
        evolution,
        detail,
    })
}

fn build_detail(
    in_range: &[&Record],
    columns: &ColumnMap,
    range: YearRange,
    selection: &Selection,
) -> Result<Option<FrontDetail>, EngineError> {
    let available_fronts = distinct(in_range, &columns.front);
    let Some(front) = pick(selection.front.as_ref(), &available_fronts) else {
        return Ok(None);
    };

    let front_records = RecordFilter::default()
        .only(&columns.front, &front)
        .apply(in_range.iter().copied());
    let topics = distinct(&front_records, &columns.topic);
    let slots = columns.sub_topic_slots();

    let tags = split_multi_value_field(front_records.iter().copied(), &slots, &columns.topic);
    let table_topic = match &selection.table_topic {
        Some(topic) if topics.contains(topic) => Some(topic.clone()),
        Some(topic) => {
            log::debug!("Table topic '{topic}' not under '{front}', showing every topic");
            None
        }
        None => None,
    };
    let table_tags: Vec<_> = match &table_topic {
        Some(topic) => tags
            .into_iter()
            .filter(|t| t.primary == Some(topic.as_str()))
            .collect(),
        None => tags,
    };

    let topic_trend = build_count_table(
        front_records.iter().copied(),
        range.start(),
        range.end(),
        &columns.topic,
        &topics,
    )?;
    let heatmap = pivot(
        &count_observed(front_records.iter().copied(), &columns.topic),
        Axis::Category,
    );

    let focus = pick(selection.focus_topic.as_ref(), &topics).map(|topic| {
        let topic_records = RecordFilter::default()
            .only(&columns.topic, &topic)
            .apply(front_records.iter().copied());
        let entries =
            split_multi_value_field(topic_records.iter().copied(), &slots, &columns.topic);
        TopicFocus {
            sub_topics: tag_frequencies(&entries),
            kind_counts: kind_counts(topic_records.iter().copied()),
            topic,
        }
    });

    Ok(Some(FrontDetail {
        topic_counts: value_counts(front_records.iter().copied(), &columns.topic),
        sub_topic_table: tag_counts(&table_tags),
        kind_counts: kind_counts(front_records.iter().copied()),
        front,
        available_fronts,
        topics,
        table_topic,
        topic_trend,
        heatmap,
        focus,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::AxisLabel;
    use crate::data::model::QuestionKind;

    fn q(year: i32, front: &str, topic: &str, subs: [&str; 2], kind: QuestionKind) -> Record {
        Record::new(year, kind)
            .with("Frente", front)
            .with("Tópico", topic)
            .with("Subtópico 1", subs[0])
            .with("Subtópico 2", subs[1])
    }

    fn physics() -> RecordSet {
        use QuestionKind::*;
        RecordSet::from_records(
            "Fisica",
            vec![
                q(2018, "Mecânica", "Cinemática", ["MRU", ""], Computational),
                q(2019, "Mecânica", "Dinâmica", ["Leis de Newton", "Atrito"], Computational),
                q(2019, "Eletromagnetismo", "Circuitos", ["Resistores", ""], Conceptual),
                q(2021, "Mecânica", "Cinemática", ["MRUV", "MRU"], Mixed),
                q(2021, "Óptica", "Espelhos", ["", ""], Conceptual),
                q(2022, "Mecânica", "Dinâmica", ["Atrito", ""], Unknown),
            ],
        )
    }

    fn selection(start: i32, end: i32) -> Selection {
        Selection {
            year_start: start,
            year_end: end,
            ..Selection::for_records(&physics()).unwrap()
        }
    }

    fn highlights() -> Vec<HighlightGroup> {
        vec![HighlightGroup {
            label: "Mecânica".into(),
            fronts: vec!["Mecânica".into()],
        }]
    }

    #[test]
    fn default_selection_spans_all_years() {
        let sel = Selection::for_records(&physics()).unwrap();
        assert_eq!((sel.year_start, sel.year_end), (2018, 2022));
        assert!(Selection::for_records(&RecordSet::default()).is_none());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = build_report(&physics(), &ColumnMap::default(), &[], &selection(2022, 2018))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidRange {
                start: 2022,
                end: 2018
            }
        );
    }

    #[test]
    fn overview_counts_respect_year_range() {
        let report = build_report(
            &physics(),
            &ColumnMap::default(),
            &highlights(),
            &selection(2019, 2021),
        )
        .unwrap();

        assert_eq!(report.total, 4);
        assert_eq!(report.highlights[0].percent, 50.0);
        assert_eq!(report.front_counts[0].label, "Mecânica");
        assert_eq!(report.front_counts[0].count, 2);
        assert_eq!(report.kind_counts.iter().map(|k| k.count).sum::<u64>(), 4);
        assert_eq!(report.fronts.len(), 3);
    }

    #[test]
    fn evolution_is_gap_filled_over_all_fronts() {
        let report = build_report(
            &physics(),
            &ColumnMap::default(),
            &[],
            &selection(2018, 2022),
        )
        .unwrap();

        assert_eq!(report.evolution.len(), 5 * 3);
        assert_eq!(report.evolution.get(2020, "Mecânica"), Some(0));
        assert_eq!(report.evolution.get(2021, "Óptica"), Some(1));
        assert_eq!(report.evolution.total(), 6);
    }

    #[test]
    fn evolution_honours_front_selection() {
        let mut sel = selection(2018, 2022);
        sel.evolution_fronts = BTreeSet::from(["Óptica".to_string(), "Termofísica".to_string()]);
        let report = build_report(&physics(), &ColumnMap::default(), &[], &sel).unwrap();

        assert_eq!(report.evolution.len(), 5 * 2);
        assert_eq!(report.evolution.total(), 1);
        assert_eq!(report.evolution.series("Termofísica").len(), 5);
    }

    #[test]
    fn detail_falls_back_to_first_front() {
        let mut sel = selection(2018, 2022);
        sel.front = Some("Astronomia".into());
        let report = build_report(&physics(), &ColumnMap::default(), &[], &sel).unwrap();

        let detail = report.detail.unwrap();
        assert_eq!(detail.front, "Eletromagnetismo");
        assert_eq!(detail.available_fronts.len(), 3);
    }

    #[test]
    fn detail_builds_topic_views_for_selected_front() {
        let mut sel = selection(2018, 2022);
        sel.front = Some("Mecânica".into());
        let report = build_report(&physics(), &ColumnMap::default(), &[], &sel).unwrap();
        let detail = report.detail.unwrap();

        assert_eq!(detail.topics, vec!["Cinemática", "Dinâmica"]);
        assert_eq!(detail.topic_trend.len(), 5 * 2);
        assert_eq!(detail.topic_trend.total(), 4);

        assert_eq!(
            detail.heatmap.rows,
            vec![
                AxisLabel::Category("Cinemática".into()),
                AxisLabel::Category("Dinâmica".into())
            ]
        );
        assert_eq!(
            detail.heatmap.columns,
            vec![
                AxisLabel::Year(2018),
                AxisLabel::Year(2019),
                AxisLabel::Year(2021),
                AxisLabel::Year(2022)
            ]
        );
        assert_eq!(detail.heatmap.total(), 4);

        // MRU appears in slot 1 once and slot 2 once, both under Cinemática.
        assert_eq!(detail.sub_topic_table[0].tag, "Atrito");
        let mru = detail
            .sub_topic_table
            .iter()
            .find(|row| row.tag == "MRU")
            .unwrap();
        assert_eq!(mru.count, 2);
        assert_eq!(mru.primary.as_deref(), Some("Cinemática"));

        let focus = detail.focus.unwrap();
        assert_eq!(focus.topic, "Cinemática");
        assert_eq!(focus.sub_topics[0].label, "MRU");
        assert_eq!(focus.sub_topics[0].count, 2);
    }

    #[test]
    fn sub_topic_table_can_be_limited_to_one_topic() {
        let mut sel = selection(2018, 2022);
        sel.front = Some("Mecânica".into());
        sel.table_topic = Some("Dinâmica".into());
        sel.focus_topic = Some("Dinâmica".into());
        let report = build_report(&physics(), &ColumnMap::default(), &[], &sel).unwrap();
        let detail = report.detail.unwrap();

        assert!(detail
            .sub_topic_table
            .iter()
            .all(|row| row.primary.as_deref() == Some("Dinâmica")));
        assert_eq!(detail.sub_topic_table.len(), 2);
        assert_eq!(detail.table_topic.as_deref(), Some("Dinâmica"));
        assert_eq!(detail.focus.unwrap().kind_counts.len(), 2);
    }

    #[test]
    fn stale_table_topic_shows_every_topic() {
        let mut sel = selection(2021, 2022);
        sel.front = Some("Mecânica".into());
        sel.table_topic = Some("Circuitos".into());
        let report = build_report(&physics(), &ColumnMap::default(), &[], &sel).unwrap();
        let detail = report.detail.unwrap();

        assert_eq!(detail.table_topic, None);
        assert_eq!(detail.sub_topic_table.len(), 3);

        // The topic was valid until the year window dropped it.
        sel.year_start = 2021;
        sel.year_end = 2021;
        sel.table_topic = Some("Dinâmica".into());
        let report = build_report(&physics(), &ColumnMap::default(), &[], &sel).unwrap();
        let detail = report.detail.unwrap();
        assert_eq!(detail.topics, vec!["Cinemática"]);
        assert_eq!(detail.table_topic, None);
        assert_eq!(detail.sub_topic_table.len(), 2);
    }

    #[test]
    fn empty_year_window_yields_empty_but_valid_report() {
        let set = RecordSet::from_records(
            "Fisica",
            vec![
                q(2010, "Mecânica", "Cinemática", ["", ""], QuestionKind::Mixed),
                q(2020, "Óptica", "Lentes", ["", ""], QuestionKind::Mixed),
            ],
        );
        let sel = Selection {
            year_start: 2012,
            year_end: 2015,
            ..Selection::for_records(&set).unwrap()
        };
        let report = build_report(&set, &ColumnMap::default(), &highlights(), &sel).unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.highlights[0].percent, 0.0);
        assert_eq!(report.evolution.len(), 4 * 2);
        assert_eq!(report.evolution.total(), 0);
        assert!(report.detail.is_none());
    }
}
