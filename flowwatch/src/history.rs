use chrono::NaiveDateTime;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::HarvestError;
use crate::snapshot::Snapshot;

/// Append-only JSON history of snapshots.
///
/// The file is the single source of truth: every append re-reads it, adds one
/// record and rewrites the whole list. A missing or unreadable file counts as
/// an empty history. There is no locking; one writer per file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `snapshot` and return the new number of records.
    ///
    /// Prior records are carried over verbatim, whatever their shape.
    pub fn append(&self, snapshot: &Snapshot) -> Result<usize, HarvestError> {
        let mut records = self.read_records();
        records.push(serde_json::to_value(snapshot)?);
        self.write_records(&records)?;
        debug!(path = %self.path.display(), records = records.len(), "History rewritten");
        Ok(records.len())
    }

    /// All records that parse as snapshots, oldest first.
    pub fn load(&self) -> Vec<Snapshot> {
        self.read_records()
            .into_iter()
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect()
    }

    /// Snapshots taken strictly after `since`.
    pub fn recent(&self, since: NaiveDateTime) -> Vec<Snapshot> {
        self.load()
            .into_iter()
            .filter(|s| s.taken_at().is_some_and(|at| at > since))
            .collect()
    }

    fn read_records(&self) -> Vec<Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No history yet, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "History unreadable, previous records will be discarded"
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(records)) => records,
            Ok(other) => {
                warn!(
                    path = %self.path.display(),
                    found = json_kind(&other),
                    "History is not a list, previous records will be discarded"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "History is corrupt, previous records will be discarded"
                );
                Vec::new()
            }
        }
    }

    /// Write to a sibling temp file, then rename over the log so a crash
    /// mid-write leaves the previous content intact.
    ///
    /// A symlinked log is rewritten at its target, and an existing log keeps
    /// its permissions.
    fn write_records(&self, records: &[Value]) -> Result<(), HarvestError> {
        let target = self.resolve_target();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, records)?;
        tmp.write_all(b"\n")?;
        match fs::metadata(&target) {
            Ok(existing) => tmp.as_file().set_permissions(existing.permissions())?,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| HarvestError::Io(e.error))?;
        Ok(())
    }

    fn resolve_target(&self) -> PathBuf {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => match fs::canonicalize(&self.path) {
                Ok(target) => target,
                Err(e) => {
                    debug!(path = %self.path.display(), error = %e, "Dangling history symlink");
                    self.path.clone()
                }
            },
            _ => self.path.clone(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
