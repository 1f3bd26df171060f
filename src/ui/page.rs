use eframe::egui::{self, RichText, Ui};

use crate::color::{kind_color, ColorMap};
use crate::data::aggregate::{CategoryCount, KindCount};
use crate::report::{FrontDetail, Selection, SubjectReport};
use crate::state::AppState;
use crate::ui::plot::{self, Slice};

fn kind_slices(counts: &[KindCount]) -> Vec<Slice> {
    counts
        .iter()
        .map(|k| Slice {
            label: k.kind.label().to_string(),
            value: k.count,
            color: kind_color(k.kind),
        })
        .collect()
}

fn category_slices(counts: &[CategoryCount]) -> Vec<Slice> {
    let colors = ColorMap::new(counts.iter().map(|c| c.label.clone()));
    counts
        .iter()
        .map(|c| Slice {
            label: c.label.clone(),
            value: c.count,
            color: colors.color_for(&c.label),
        })
        .collect()
}

fn section(ui: &mut Ui, title: &str) {
    ui.add_space(12.0);
    ui.heading(title);
    ui.separator();
}

/// Side-by-side pair of charts.
fn two_columns(ui: &mut Ui, left: impl FnOnce(&mut Ui), right: impl FnOnce(&mut Ui)) {
    ui.columns(2, |cols| {
        left(&mut cols[0]);
        right(&mut cols[1]);
    });
}

fn option_combo(
    ui: &mut Ui,
    id: &str,
    label: &str,
    options: &[String],
    current: &str,
    none_label: Option<&str>,
) -> Option<Option<String>> {
    let mut picked = None;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(current)
            .show_ui(ui, |ui: &mut Ui| {
                if let Some(none) = none_label {
                    if ui.selectable_label(current == none, none).clicked() {
                        picked = Some(None);
                    }
                }
                for option in options {
                    if ui.selectable_label(current == option, option).clicked() {
                        picked = Some(Some(option.clone()));
                    }
                }
            });
    });
    picked
}

// ---------------------------------------------------------------------------
// Subject page
// ---------------------------------------------------------------------------

/// Render the charts of the active subject.
pub fn subject_page(ui: &mut Ui, state: &mut AppState) {
    let Some(report) = state.report.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label("Open a workbook or folder from the File menu.");
        });
        return;
    };
    let Some(mut edited) = state.selection.clone() else {
        return;
    };
    let name = state
        .subject_config()
        .map(|s| s.name.clone())
        .unwrap_or_default();

    ui.heading(RichText::new(&name).size(24.0));
    ui.label(format!(
        "{} questions from {} to {}",
        report.total,
        report.range.start(),
        report.range.end()
    ));

    overview(ui, &report);

    section(ui, "Evolution by front");
    ui.label(format!(
        "{} questions over {} years",
        report.evolution.total(),
        report.evolution.years().len()
    ));
    plot::trend_chart(ui, "evolution", &report.evolution);

    if let Some(detail) = &report.detail {
        section(ui, "Front detail");
        if let Some(front) = option_combo(
            ui,
            "detail_front",
            "Front",
            &detail.available_fronts,
            &detail.front,
            None,
        ) {
            edited.front = front;
            edited.table_topic = None;
            edited.focus_topic = None;
        }
        front_detail(ui, detail, &mut edited);
    }

    state.update_selection(|s| *s = edited);
}

fn overview(ui: &mut Ui, report: &SubjectReport) {
    ui.add_space(8.0);
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for highlight in &report.highlights {
            ui.group(|ui: &mut Ui| {
                ui.vertical(|ui: &mut Ui| {
                    ui.label(&highlight.label);
                    let percent = format!("{:.1}%", highlight.percent);
                    ui.label(RichText::new(percent).size(22.0).strong());
                });
            });
        }
        ui.group(|ui: &mut Ui| {
            ui.vertical(|ui: &mut Ui| {
                ui.label("Questions");
                ui.label(RichText::new(report.total.to_string()).size(22.0).strong());
            });
        });
    });

    section(ui, "Questions by front");
    two_columns(
        ui,
        |ui| plot::bar_chart(ui, "front_bars", &report.front_counts, false),
        |ui| plot::pie_chart(ui, "front_pie", &category_slices(&report.front_counts)),
    );

    section(ui, "Question kinds");
    plot::pie_chart(ui, "kind_pie", &kind_slices(&report.kind_counts));

    section(ui, "Questions by topic");
    plot::bar_chart(ui, "topic_bars", &report.topic_counts, true);
}

fn front_detail(ui: &mut Ui, detail: &FrontDetail, edited: &mut Selection) {
    ui.strong(format!("Topics of {}", detail.front));
    plot::bar_chart(ui, "detail_topics", &detail.topic_counts, true);

    ui.add_space(8.0);
    const ALL_TOPICS: &str = "All topics";
    let current = detail.table_topic.as_deref().unwrap_or(ALL_TOPICS);
    if let Some(topic) = option_combo(
        ui,
        "table_topic",
        "Sub-topics of",
        &detail.topics,
        current,
        Some(ALL_TOPICS),
    ) {
        edited.table_topic = topic;
    }
    plot::tag_table(ui, "sub_topic_table", &detail.sub_topic_table, "Sub-topic", "Topic");

    ui.add_space(8.0);
    two_columns(
        ui,
        |ui| {
            ui.strong("Question kinds");
            plot::pie_chart(ui, "detail_kinds", &kind_slices(&detail.kind_counts));
        },
        |ui| {
            ui.strong(format!("Topics per year ({} questions)", detail.heatmap.total()));
            plot::heatmap(ui, "detail_heatmap", &detail.heatmap);
        },
    );

    ui.add_space(8.0);
    ui.strong("Topic evolution");
    plot::trend_chart(ui, "topic_trend", &detail.topic_trend);

    if let Some(focus) = &detail.focus {
        section(ui, "Topic focus");
        if let Some(topic) = option_combo(
            ui,
            "focus_topic",
            "Topic",
            &detail.topics,
            &focus.topic,
            None,
        ) {
            edited.focus_topic = topic;
        }
        two_columns(
            ui,
            |ui| plot::bar_chart(ui, "focus_sub_topics", &focus.sub_topics, true),
            |ui| plot::pie_chart(ui, "focus_kinds", &kind_slices(&focus.kind_counts)),
        );
    }
}
