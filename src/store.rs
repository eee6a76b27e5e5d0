use crate::error::CollectError;
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path-addressed JSON storage used by the reconciler.
pub trait JsonStore {
    fn exists(&self, path: &Path) -> bool;
    fn read_json(&self, path: &Path) -> Result<Value>;
    fn write_json(&self, path: &Path, value: &Value) -> Result<()>;
    /// Create `dir` and any missing parents. Idempotent.
    fn ensure_dir(&self, dir: &Path) -> Result<()>;
}

/// Filesystem store. JSON is written with four-space indentation and
/// non-ASCII characters left unescaped; writes are atomic per file.
#[derive(Debug, Clone, Default)]
pub struct FsStore;

impl JsonStore for FsStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_json(&self, path: &Path) -> Result<Value> {
        let s = std::fs::read_to_string(path).map_err(|e| CollectError::storage(path, e))?;
        let v = serde_json::from_str(&s).map_err(|e| CollectError::malformed(path, e))?;
        Ok(v)
    }

    /// Writes to a temp file in the target directory, then renames it over
    /// `path`. A failed write leaves any existing file at `path` as it was.
    fn write_json(&self, path: &Path, value: &Value) -> Result<()> {
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        value.serialize(&mut ser)?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| CollectError::storage(dir, e))?;
        temp.write_all(&buf)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| CollectError::storage(temp.path(), e))?;
        temp.persist(path)
            .map_err(|e| CollectError::storage(path, e.error))?;
        Ok(())
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| CollectError::storage(dir, e))?;
        Ok(())
    }
}

/// Date-keyed file layout under the data directory:
///
/// ```text
/// <root>/2024-05/snapshot_2024-05.json
/// <root>/2024-05/changes_2024-05-17.json
/// ```
#[derive(Debug, Clone)]
pub struct DatedLayout {
    root: PathBuf,
}

impl DatedLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn month_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m").to_string())
    }

    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.month_dir(date)
            .join(format!("snapshot_{}.json", date.format("%Y-%m")))
    }

    pub fn delta_path(&self, date: NaiveDate) -> PathBuf {
        self.month_dir(date)
            .join(format!("changes_{}.json", date.format("%Y-%m-%d")))
    }
}
