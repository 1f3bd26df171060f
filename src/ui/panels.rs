use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::color::ColorMap;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – global filters
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let (Some(records), Some(selection)) = (&state.records, &state.selection) else {
        ui.label("No data loaded.");
        return;
    };

    // Work on copies so the state can be updated once at the end.
    let years: Vec<i32> = records.years.iter().copied().collect();
    let fronts = records.categories(&state.config.columns.front);
    let mut edited = selection.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Year range ----
            ui.strong("Years");
            year_combo(ui, "year_start", "From", &years, &mut edited.year_start);
            year_combo(ui, "year_end", "To", &years, &mut edited.year_end);

            if let Some(msg) = &state.validation_message {
                ui.label(RichText::new(msg).color(Color32::RED));
            }
            ui.separator();

            // ---- Fronts plotted in the evolution chart ----
            let n_selected = if edited.evolution_fronts.is_empty() {
                fronts.len()
            } else {
                edited.evolution_fronts.len()
            };
            let header_text = format!("Evolution fronts  ({n_selected}/{})", fronts.len());
            let colors = ColorMap::new(fronts.iter().cloned());

            egui::CollapsingHeader::new(RichText::new(header_text).strong())
                .id_salt("evolution_fronts")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    if ui.small_button("All").clicked() {
                        edited.evolution_fronts.clear();
                    }

                    for front in &fronts {
                        // An empty selection means every front is shown.
                        let mut checked = edited.evolution_fronts.is_empty()
                            || edited.evolution_fronts.contains(front);
                        let text = RichText::new(front).color(colors.color_for(front));
                        if ui.checkbox(&mut checked, text).changed() {
                            if edited.evolution_fronts.is_empty() {
                                edited.evolution_fronts = fronts.iter().cloned().collect();
                            }
                            if checked {
                                edited.evolution_fronts.insert(front.clone());
                            } else {
                                edited.evolution_fronts.remove(front);
                            }
                            if edited.evolution_fronts.len() == fronts.len() {
                                edited.evolution_fronts.clear();
                            }
                        }
                    }
                });
        });

    state.update_selection(|s| *s = edited);
}

fn year_combo(ui: &mut Ui, id: &str, label: &str, years: &[i32], value: &mut i32) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(value.to_string())
            .show_ui(ui, |ui: &mut Ui| {
                for &year in years {
                    ui.selectable_value(value, year, year.to_string());
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / subject selector.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open workbook…").clicked() {
                open_workbook_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        let mut clicked = None;
        for (i, subject) in state.config.subjects.iter().enumerate() {
            if ui.selectable_label(state.subject == i, &subject.name).clicked() {
                clicked = Some(i);
            }
        }
        if let Some(i) = clicked {
            if i != state.subject {
                state.select_subject(i);
            }
        }

        ui.separator();

        if let (Some(records), Some(report)) = (&state.records, &state.report) {
            ui.label(format!(
                "{} questions loaded, {} in {}–{} ({} years)",
                records.len(),
                report.total,
                report.range.start(),
                report.range.end(),
                report.range.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_workbook_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open question workbook")
        .add_filter("Spreadsheets", &["xlsx", "xlsm", "xls", "xlsb", "ods"])
        .pick_file();

    if let Some(path) = file {
        state.set_source_path(&path);
    }
}

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open folder of per-subject csv / json / parquet files")
        .pick_folder();

    if let Some(path) = folder {
        state.set_source_path(&path);
    }
}
