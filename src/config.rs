//! Configuration file handling.
//!
//! The dashboard reads an optional `dashboard.toml` (or the file named by
//! `EXAM_TRENDS_CONFIG`) describing where the question data lives, how its
//! columns are named and which subjects to offer.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "EXAM_TRENDS_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Where the question data is read from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Source column names.
    #[serde(default)]
    pub columns: ColumnMap,

    /// Subjects offered in the subject selector, in display order.
    #[serde(default = "default_subjects")]
    pub subjects: Vec<SubjectConfig>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            columns: ColumnMap::default(),
            subjects: default_subjects(),
        }
    }
}

/// Data source location: a workbook file or a directory of per-subject files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

fn default_source_path() -> PathBuf {
    PathBuf::from("dados/dados_enem_natureza.xlsx")
}

/// Header names of the columns the dashboard understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    #[serde(default = "default_year_column")]
    pub year: String,

    /// Question type ("Conta", "Conceitual", ...).
    #[serde(default = "default_kind_column")]
    pub kind: String,

    /// Top-level subdivision of a subject.
    #[serde(default = "default_front_column")]
    pub front: String,

    #[serde(default = "default_topic_column")]
    pub topic: String,

    /// Secondary tag slots, each optionally populated.
    #[serde(default = "default_sub_topic_columns")]
    pub sub_topics: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            year: default_year_column(),
            kind: default_kind_column(),
            front: default_front_column(),
            topic: default_topic_column(),
            sub_topics: default_sub_topic_columns(),
        }
    }
}

impl ColumnMap {
    pub fn sub_topic_slots(&self) -> Vec<&str> {
        self.sub_topics.iter().map(String::as_str).collect()
    }
}

fn default_year_column() -> String {
    "Ano".to_string()
}

fn default_kind_column() -> String {
    "Tipo".to_string()
}

fn default_front_column() -> String {
    "Frente".to_string()
}

fn default_topic_column() -> String {
    "Tópico".to_string()
}

fn default_sub_topic_columns() -> Vec<String> {
    vec!["Subtópico 1".to_string(), "Subtópico 2".to_string()]
}

/// One subject page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectConfig {
    /// Display name.
    pub name: String,

    /// Sheet name (workbook) or file stem (directory source).
    pub sheet: String,

    /// KPI tiles: share of questions whose front is in each group.
    #[serde(default)]
    pub highlights: Vec<HighlightGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightGroup {
    pub label: String,
    pub fronts: Vec<String>,
}

impl HighlightGroup {
    fn new(label: &str, fronts: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            fronts: fronts.iter().map(|f| f.to_string()).collect(),
        }
    }
}

fn default_subjects() -> Vec<SubjectConfig> {
    vec![
        SubjectConfig {
            name: "Física".to_string(),
            sheet: "Fisica".to_string(),
            highlights: vec![
                HighlightGroup::new("Mecânica", &["Mecânica"]),
                HighlightGroup::new("Eletromagnetismo", &["Eletromagnetismo"]),
                HighlightGroup::new(
                    "Termo / Ondul. / Óptica",
                    &["Termofísica", "Ondulatória", "Óptica"],
                ),
            ],
        },
        SubjectConfig {
            name: "Química".to_string(),
            sheet: "Quimica".to_string(),
            highlights: Vec::new(),
        },
        SubjectConfig {
            name: "Biologia".to_string(),
            sheet: "Biologia".to_string(),
            highlights: Vec::new(),
        },
    ]
}

impl DashboardConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: DashboardConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the configuration: `$EXAM_TRENDS_CONFIG`, then
    /// `./dashboard.toml`, then built-in defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            log::info!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.subjects.is_empty() {
            bail!("at least one [[subjects]] entry is required");
        }
        for subject in &self.subjects {
            if subject.sheet.trim().is_empty() {
                bail!("subject '{}' has an empty sheet name", subject.name);
            }
        }
        if self.columns.year == self.columns.kind {
            bail!("year and kind columns must differ");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.columns.year, "Ano");
        assert_eq!(config.columns.sub_topics.len(), 2);
        assert_eq!(config.subjects.len(), 3);
        assert_eq!(config.subjects[0].sheet, "Fisica");
        assert_eq!(config.subjects[0].highlights[2].fronts.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[source]
path = "sample_data"

[columns]
front = "Area"

[[subjects]]
name = "Chemistry"
sheet = "Quimica"
highlights = [{ label = "Organic", fronts = ["Orgânica"] }]
"#;

        let config: DashboardConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.source.path, PathBuf::from("sample_data"));
        assert_eq!(config.columns.front, "Area");
        assert_eq!(config.columns.topic, "Tópico");
        assert_eq!(config.subjects.len(), 1);
        assert_eq!(config.subjects[0].highlights[0].label, "Organic");
    }

    #[test]
    fn test_load_rejects_empty_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        std::fs::write(&path, "subjects = []\n").unwrap();

        let err = DashboardConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("at least one"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        std::fs::write(
            &path,
            "[[subjects]]\nname = \"Biologia\"\nsheet = \"Biologia\"\n",
        )
        .unwrap();

        let config = DashboardConfig::load(&path).unwrap();
        assert_eq!(config.subjects[0].name, "Biologia");
        assert_eq!(config.source.path, default_source_path());
    }
}
