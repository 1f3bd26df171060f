use std::path::Path;
use std::sync::Arc;

use crate::config::{DashboardConfig, SubjectConfig};
use crate::data::cache::RecordCache;
use crate::data::loader::open_source;
use crate::data::model::RecordSet;
use crate::error::DashboardError;
use crate::report::{build_report, Selection, SubjectReport};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded record sets, keyed by sheet name.
    pub cache: RecordCache,

    /// Index into `config.subjects`.
    pub subject: usize,

    /// Records of the active subject (None until loaded successfully).
    pub records: Option<Arc<RecordSet>>,

    pub selection: Option<Selection>,

    /// Last successfully built report; kept while the selection is invalid.
    pub report: Option<SubjectReport>,

    /// Load error shown in the top bar.
    pub status_message: Option<String>,

    /// Filter validation error shown next to the year selectors.
    pub validation_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let source = open_source(&config.source.path, &config.columns);
        if let Ok(available) = source.subjects() {
            for subject in &config.subjects {
                if !available.contains(&subject.sheet) {
                    log::warn!(
                        "Subject '{}' has no sheet '{}' in {}",
                        subject.name,
                        subject.sheet,
                        source.location().display()
                    );
                }
            }
        }

        let mut state = Self {
            config,
            cache: RecordCache::new(source),
            subject: 0,
            records: None,
            selection: None,
            report: None,
            status_message: None,
            validation_message: None,
        };
        state.select_subject(0);
        state
    }

    pub fn subject_config(&self) -> Option<&SubjectConfig> {
        self.config.subjects.get(self.subject)
    }

    /// Switch to another subject, loading it through the cache.
    pub fn select_subject(&mut self, index: usize) {
        let Some(sheet) = self.config.subjects.get(index).map(|s| s.sheet.clone()) else {
            return;
        };
        self.subject = index;
        self.records = None;
        self.selection = None;
        self.report = None;
        self.validation_message = None;

        match self.cache.get(&sheet) {
            Ok(records) => {
                self.selection = Selection::for_records(&records);
                let columns = &self.config.columns;
                for column in [&columns.front, &columns.topic] {
                    if !records.is_empty() && !records.column_names.contains(column) {
                        log::warn!("Sheet '{sheet}' has no values in column '{column}'");
                    }
                }
                self.status_message = if records.is_empty() {
                    Some(format!("No questions found in '{sheet}'"))
                } else {
                    None
                };
                self.records = Some(records);
                self.refresh();
            }
            Err(e) => {
                log::error!("Failed to load '{sheet}': {e}");
                self.status_message = Some(format!("Error: {}", DashboardError::from(e)));
            }
        }
    }

    /// Point the dashboard at another workbook or directory.
    pub fn set_source_path(&mut self, path: &Path) {
        log::info!("Switching data source to {}", path.display());
        self.config.source.path = path.to_path_buf();
        self.cache
            .set_source(open_source(path, &self.config.columns));
        self.select_subject(self.subject);
    }

    /// Drop the cached records of the active subject and load them again.
    pub fn reload(&mut self) {
        if let Some(sheet) = self.subject_config().map(|s| s.sheet.clone()) {
            self.cache.invalidate(&sheet);
        }
        self.select_subject(self.subject);
    }

    /// Recompute the report after a selection change.
    pub fn refresh(&mut self) {
        let (Some(records), Some(selection)) = (&self.records, &self.selection) else {
            return;
        };
        let highlights = self
            .subject_config()
            .map(|s| s.highlights.as_slice())
            .unwrap_or_default();

        match build_report(records, &self.config.columns, highlights, selection) {
            Ok(report) => {
                log::debug!(
                    "Report rebuilt: {} questions, {} evolution cells",
                    report.total,
                    report.evolution.len()
                );
                self.report = Some(report);
                self.validation_message = None;
            }
            Err(e) => {
                log::debug!("Report not rebuilt: {e}");
                self.validation_message = Some(DashboardError::from(e).to_string());
            }
        }
    }

    /// Apply a change to the selection and rebuild the report if it changed.
    pub fn update_selection(&mut self, change: impl FnOnce(&mut Selection)) {
        let Some(selection) = &mut self.selection else {
            return;
        };
        let before = selection.clone();
        change(selection);
        if *selection != before {
            self.refresh();
        }
    }
}
