use crate::domain::Record;
use crate::error::{BatchError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::{Path, PathBuf};

pub trait ResultStore: Send + Sync {
    /// `None` when no results have been written yet.
    fn load(&self) -> Result<Option<Vec<Record>>>;
    fn save(&self, records: &[Record]) -> Result<()>;
}

pub struct ResultSetLoader;

impl ResultSetLoader {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Option<Vec<Record>>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path).map_err(|err| BatchError::io(path, err))?;
        let records: Vec<Record> = serde_json::from_str(&data)?;
        Ok(Some(records))
    }
}

pub struct ResultSetWriter;

impl ResultSetWriter {
    pub fn save_to_path(path: impl AsRef<Path>, records: &[Record]) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| BatchError::io(parent, err))?;
        }
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        records.serialize(&mut serializer)?;
        fs::write(path, buf).map_err(|err| BatchError::io(path, err))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JsonResultStore {
    path: PathBuf,
}

impl JsonResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for JsonResultStore {
    fn load(&self) -> Result<Option<Vec<Record>>> {
        ResultSetLoader::load_from_path(&self.path)
    }

    fn save(&self, records: &[Record]) -> Result<()> {
        ResultSetWriter::save_to_path(&self.path, records)
    }
}
