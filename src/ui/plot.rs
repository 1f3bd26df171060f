use std::f64::consts::{FRAC_PI_2, TAU};
use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_extras::{Column, TableBuilder};
use egui_plot::{
    Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoint, PlotPoints, Points, Polygon, Text,
};

use crate::color::{green_scale, ColorMap};
use crate::data::aggregate::{CategoryCount, CountTable, PivotMatrix, TagCount};

const EMPTY_TEXT: &str = "No questions for the current filters.";

/// Label of the category sitting at integer position `value`, if any.
fn category_label(labels: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 0.01 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Whole-number tick labels only (years, counts).
fn integer_label(value: f64) -> String {
    if (value - value.round()).abs() < 0.01 {
        format!("{:.0}", value)
    } else {
        String::new()
    }
}

fn static_plot(id: &str) -> Plot<'_> {
    Plot::new(id)
        .allow_zoom(false)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
}

// ---------------------------------------------------------------------------
// Bar chart (categorical counts)
// ---------------------------------------------------------------------------

/// Bars coloured on a green gradient by count. Horizontal charts put the
/// first (most frequent) category on top.
pub fn bar_chart(ui: &mut Ui, id: &str, counts: &[CategoryCount], horizontal: bool) {
    if counts.is_empty() {
        ui.label(EMPTY_TEXT);
        return;
    }

    let n = counts.len();
    let max = counts.iter().map(|c| c.count).max().unwrap_or(0).max(1) as f32;
    let position = |i: usize| if horizontal { n - 1 - i } else { i };

    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, c)| {
            Bar::new(position(i) as f64, c.count as f64)
                .name(&c.label)
                .fill(green_scale(c.count as f32 / max))
                .width(0.7)
        })
        .collect();

    let mut labels = vec![String::new(); n];
    for (i, c) in counts.iter().enumerate() {
        labels[position(i)] = c.label.clone();
    }
    let label_at = move |mark: GridMark, _range: &RangeInclusive<f64>| {
        category_label(&labels, mark.value)
    };

    let mut chart = BarChart::new(bars);
    let plot = if horizontal {
        chart = chart.horizontal();
        static_plot(id)
            .height((n as f32 * 28.0).max(200.0))
            .y_axis_min_width(140.0)
            .y_axis_formatter(label_at)
            .include_x(0.0)
    } else {
        static_plot(id)
            .height(260.0)
            .x_axis_formatter(label_at)
            .include_y(0.0)
    };

    plot.show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

// ---------------------------------------------------------------------------
// Pie chart
// ---------------------------------------------------------------------------

pub struct Slice {
    pub label: String,
    pub value: u64,
    pub color: Color32,
}

/// Wedge outline from `start` sweeping clockwise by `sweep` radians.
fn wedge(start: f64, sweep: f64) -> Vec<[f64; 2]> {
    const STEPS: usize = 12;
    let mut points = Vec::with_capacity(STEPS + 2);
    points.push([0.0, 0.0]);
    for k in 0..=STEPS {
        let angle = start - sweep * k as f64 / STEPS as f64;
        points.push([angle.cos(), angle.sin()]);
    }
    points
}

/// Pie starting at twelve o'clock, clockwise, with a legend entry per slice.
pub fn pie_chart(ui: &mut Ui, id: &str, slices: &[Slice]) {
    let total: u64 = slices.iter().map(|s| s.value).sum();
    if total == 0 {
        ui.label(EMPTY_TEXT);
        return;
    }

    let mut polygons = Vec::new();
    let mut start = FRAC_PI_2;
    for slice in slices.iter().filter(|s| s.value > 0) {
        let fraction = slice.value as f64 / total as f64;
        let sweep = fraction * TAU;
        let name = format!("{}: {} ({:.1}%)", slice.label, slice.value, fraction * 100.0);

        // Filled polygons must be convex: split wide slices into quarter turns.
        let parts = (sweep / FRAC_PI_2).ceil().max(1.0) as usize;
        for p in 0..parts {
            let part_start = start - sweep * p as f64 / parts as f64;
            polygons.push(
                Polygon::new(PlotPoints::from(wedge(part_start, sweep / parts as f64)))
                    .fill_color(slice.color)
                    .stroke(Stroke::new(1.0, slice.color))
                    .name(&name),
            );
        }
        start -= sweep;
    }

    static_plot(id)
        .height(240.0)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            for polygon in polygons {
                plot_ui.polygon(polygon);
            }
        });
}

// ---------------------------------------------------------------------------
// Line chart (one year-ordered series per category)
// ---------------------------------------------------------------------------

pub fn trend_chart(ui: &mut Ui, id: &str, table: &CountTable) {
    if table.is_empty() {
        ui.label(EMPTY_TEXT);
        return;
    }

    let series = table.all_series();
    let colors = ColorMap::new(series.iter().map(|(cat, _)| cat.clone()));

    Plot::new(id)
        .height(320.0)
        .legend(Legend::default())
        .include_y(0.0)
        .x_axis_label("Year")
        .y_axis_label("Questions")
        .x_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| integer_label(mark.value))
        .y_axis_formatter(|mark: GridMark, _range: &RangeInclusive<f64>| integer_label(mark.value))
        .show(ui, |plot_ui| {
            for (category, points) in &series {
                let color = colors.color_for(category);
                let xy: Vec<[f64; 2]> = points
                    .iter()
                    .map(|&(year, count)| [year as f64, count as f64])
                    .collect();
                plot_ui.line(Line::new(xy.clone()).name(category).color(color).width(2.0));
                plot_ui.points(Points::new(xy).name(category).color(color).radius(3.0));
            }
        });
}

// ---------------------------------------------------------------------------
// Heatmap (row × column matrix)
// ---------------------------------------------------------------------------

/// One shaded cell per matrix entry, first row on top, counts printed inside.
pub fn heatmap(ui: &mut Ui, id: &str, matrix: &PivotMatrix) {
    if matrix.is_empty() {
        ui.label(EMPTY_TEXT);
        return;
    }

    let n_rows = matrix.rows.len();
    let max = matrix.max().max(1) as f32;
    let row_labels: Vec<String> = matrix.rows.iter().rev().map(ToString::to_string).collect();
    let col_labels: Vec<String> = matrix.columns.iter().map(ToString::to_string).collect();

    static_plot(id)
        .height((n_rows as f32 * 32.0).max(220.0))
        .show_grid(false)
        .y_axis_min_width(140.0)
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            category_label(&col_labels, mark.value)
        })
        .y_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            category_label(&row_labels, mark.value)
        })
        .show(ui, |plot_ui| {
            for i in 0..n_rows {
                let y = (n_rows - 1 - i) as f64;
                for j in 0..matrix.columns.len() {
                    let count = matrix.get(i, j);
                    let x = j as f64;
                    let t = count as f32 / max;
                    let cell = vec![
                        [x - 0.5, y - 0.5],
                        [x + 0.5, y - 0.5],
                        [x + 0.5, y + 0.5],
                        [x - 0.5, y + 0.5],
                    ];
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::from(cell))
                            .fill_color(green_scale(t))
                            .stroke(Stroke::new(1.0, Color32::WHITE)),
                    );
                    let ink = if t > 0.5 { Color32::WHITE } else { Color32::BLACK };
                    plot_ui.text(Text::new(
                        PlotPoint::new(x, y),
                        RichText::new(count.to_string()).color(ink),
                    ));
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Sub-topic table
// ---------------------------------------------------------------------------

pub fn tag_table(ui: &mut Ui, id: &str, rows: &[TagCount], tag_header: &str, primary_header: &str) {
    if rows.is_empty() {
        ui.label(EMPTY_TEXT);
        return;
    }

    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .max_scroll_height(300.0)
            .column(Column::remainder())
            .column(Column::auto().at_least(100.0))
            .column(Column::auto())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong(tag_header);
                });
                header.col(|ui| {
                    ui.strong(primary_header);
                });
                header.col(|ui| {
                    ui.strong("Questions");
                });
            })
            .body(|mut body| {
                for row in rows {
                    body.row(18.0, |mut table_row| {
                        table_row.col(|ui| {
                            ui.label(&row.tag);
                        });
                        table_row.col(|ui| {
                            ui.label(row.primary.as_deref().unwrap_or("-"));
                        });
                        table_row.col(|ui| {
                            ui.label(row.count.to_string());
                        });
                    });
                }
            });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_labels_only_on_integer_marks() {
        let labels = vec!["Mecânica".to_string(), "Óptica".to_string()];
        assert_eq!(category_label(&labels, 1.0), "Óptica");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -1.0), "");
        assert_eq!(category_label(&labels, 2.0), "");
        assert_eq!(integer_label(2020.0), "2020");
        assert_eq!(integer_label(2020.5), "");
    }

    #[test]
    fn wedge_starts_at_centre_and_spans_sweep() {
        let points = wedge(FRAC_PI_2, FRAC_PI_2);
        assert_eq!(points[0], [0.0, 0.0]);
        let first = points[1];
        let last = points[points.len() - 1];
        assert!((first[0] - 0.0).abs() < 1e-9 && (first[1] - 1.0).abs() < 1e-9);
        assert!((last[0] - 1.0).abs() < 1e-9 && last[1].abs() < 1e-9);
    }
}
