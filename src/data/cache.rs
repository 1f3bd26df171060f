use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use super::loader::DataSource;
use super::model::RecordSet;
use crate::error::SourceError;

// ---------------------------------------------------------------------------
// Subject-keyed record cache
// ---------------------------------------------------------------------------

struct CachedSet {
    records: Arc<RecordSet>,
    revision: Option<SystemTime>,
}

/// Loads each subject once and hands out shared, read-only record sets.
///
/// An entry is reloaded when the source reports a different revision than
/// the one seen at load time.
pub struct RecordCache {
    source: Box<dyn DataSource>,
    entries: HashMap<String, CachedSet>,
}

impl RecordCache {
    pub fn new(source: Box<dyn DataSource>) -> Self {
        RecordCache {
            source,
            entries: HashMap::new(),
        }
    }

    /// Swap the underlying source; every cached entry is dropped.
    pub fn set_source(&mut self, source: Box<dyn DataSource>) {
        self.source = source;
        self.clear();
    }

    /// Records of `subject`, loading them on first use or after a change.
    pub fn get(&mut self, subject: &str) -> Result<Arc<RecordSet>, SourceError> {
        let revision = self.source.revision(subject);

        if let Some(entry) = self.entries.get(subject) {
            if entry.revision == revision {
                return Ok(Arc::clone(&entry.records));
            }
            log::info!("Source changed for '{subject}', reloading");
        }

        let records = Arc::new(self.source.load(subject)?);
        log::info!(
            "Loaded {} records for '{}' from {}",
            records.len(),
            records.subject,
            self.source.location().display()
        );
        self.entries.insert(
            subject.to_string(),
            CachedSet {
                records: Arc::clone(&records),
                revision,
            },
        );
        Ok(records)
    }

    /// Drop one subject; returns whether it was cached.
    pub fn invalidate(&mut self, subject: &str) -> bool {
        self.entries.remove(subject).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
