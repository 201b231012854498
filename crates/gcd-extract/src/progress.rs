//! Durable resume cursor for long extraction runs
//!
//! The progress file is a JSON object keyed by extraction type:
//!
//! ```json
//! {
//!   "Character": { "lastProcessedItemId": 8812, "totalTimeMillis": 51230, "numCompleted": 4100 },
//!   "Credit": { "lastProcessedItemId": 120, "totalTimeMillis": 800, "numCompleted": 120 }
//! }
//! ```
//!
//! A [`ProgressTracker`] owns one entry and rewrites the whole file on every
//! update (temp file, fsync, rename), so a crash loses at most the row that
//! was in flight. Entries for other extraction types are carried through
//! untouched.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use gcd_common::{GcdError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

/// Persisted cursor of one extraction type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    pub last_processed_item_id: i64,
    /// Cumulative processing time over all runs
    pub total_time_millis: u64,
    /// Cumulative processed rows over all runs
    pub num_completed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressInfo {
    /// Mean processing time per row
    pub fn average_time_millis(&self) -> f64 {
        if self.num_completed == 0 {
            return 0.0;
        }
        self.total_time_millis as f64 / self.num_completed as f64
    }

    /// Projected time for the rows not yet completed
    ///
    /// Saturates at [`Duration::MAX`] when the file holds totals too large
    /// to project.
    pub fn estimate_remaining(&self, total_items: u64) -> Duration {
        let remaining = total_items.saturating_sub(self.num_completed);
        let secs = self.average_time_millis() * remaining as f64 / 1000.0;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Calculate completion percentage
    pub fn completion_percentage(&self, total_items: u64) -> f64 {
        if total_items == 0 {
            return 0.0;
        }
        (self.num_completed as f64 / total_items as f64 * 100.0).min(100.0)
    }
}

/// Single writer of one extraction type's entry in the progress file
#[derive(Debug)]
pub struct ProgressTracker {
    path: PathBuf,
    extraction_type: String,
    document: Map<String, Value>,
    current: Option<ProgressInfo>,
}

impl ProgressTracker {
    /// Load the progress file; a missing or empty file means no progress yet
    pub fn open(path: impl Into<PathBuf>, extraction_type: &str) -> Result<Self> {
        let path = path.into();
        let document = load_document(&path)?;
        let current = match document.get(extraction_type) {
            Some(entry) => Some(parse_entry(&path, extraction_type, entry)?),
            None => None,
        };

        if let Some(info) = &current {
            debug!(
                extraction_type,
                last_processed_item_id = info.last_processed_item_id,
                num_completed = info.num_completed,
                "Loaded progress"
            );
        }

        Ok(Self {
            path,
            extraction_type: extraction_type.to_string(),
            document,
            current,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extraction_type(&self) -> &str {
        &self.extraction_type
    }

    pub fn progress_info(&self) -> Option<&ProgressInfo> {
        self.current.as_ref()
    }

    /// Where to resume: the last committed row id, or `default` on a fresh run
    pub fn get_last_processed_item_id(&self, default: i64) -> i64 {
        self.current
            .as_ref()
            .map_or(default, |info| info.last_processed_item_id)
    }

    pub fn num_completed(&self) -> u64 {
        self.current.as_ref().map_or(0, |info| info.num_completed)
    }

    pub fn total_time_millis(&self) -> u64 {
        self.current.as_ref().map_or(0, |info| info.total_time_millis)
    }

    /// Commit one processed row
    ///
    /// `total_time_millis` is the new cumulative total, not a delta. The file
    /// is durable on disk when this returns.
    pub fn update_progress_info(
        &mut self,
        last_processed_item_id: i64,
        total_time_millis: u64,
    ) -> Result<&ProgressInfo> {
        let mut info = self.current.clone().unwrap_or_default();
        info.last_processed_item_id = last_processed_item_id;
        info.total_time_millis = total_time_millis;
        info.num_completed += 1;
        info.updated_at = Some(Utc::now());

        self.document
            .insert(self.extraction_type.clone(), serde_json::to_value(&info)?);
        self.persist()?;

        Ok(self.current.insert(info))
    }

    /// Forget this extraction type's progress; the next run starts over
    pub fn reset_progress_info(&mut self) -> Result<()> {
        self.document.remove(&self.extraction_type);
        self.current = None;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let persist_err = |source: io::Error| GcdError::ProgressPersist {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(persist_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(persist_err)?;
        serde_json::to_writer_pretty(&mut tmp, &self.document)?;
        tmp.write_all(b"\n").map_err(persist_err)?;
        tmp.as_file().sync_all().map_err(persist_err)?;
        tmp.persist(&self.path).map_err(|e| persist_err(e.error))?;

        Ok(())
    }
}

/// Every readable entry of a progress file, by extraction type
///
/// Entries that are not cursors are skipped.
pub fn read_all(path: &Path) -> Result<BTreeMap<String, ProgressInfo>> {
    let document = load_document(path)?;
    Ok(document
        .into_iter()
        .filter_map(|(key, value)| {
            serde_json::from_value::<ProgressInfo>(value)
                .ok()
                .map(|info| (key, info))
        })
        .collect())
}

fn load_document(path: &Path) -> Result<Map<String, Value>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(err) => return Err(err.into()),
    };

    if contents.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GcdError::ProgressState {
            path: path.to_path_buf(),
            reason: "top level is not a JSON object".to_string(),
        }),
        Err(err) => Err(GcdError::ProgressState {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }),
    }
}

fn parse_entry(path: &Path, extraction_type: &str, entry: &Value) -> Result<ProgressInfo> {
    serde_json::from_value(entry.clone()).map_err(|err| GcdError::ProgressState {
        path: path.to_path_buf(),
        reason: format!("entry '{extraction_type}': {err}"),
    })
}

/// Format a duration as `1h 02m 03s`, dropping leading zero units
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
