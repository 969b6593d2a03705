use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::domain::Record;
use crate::error::{BatchError, Result};

pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|err| {
        BatchError::Configuration(format!("cannot read dataset {path:?}: {err}"))
    })?;

    let items: Vec<Value> = if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
        data.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(serde_json::from_str::<Value>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| invalid_dataset(path, err))?
    } else {
        serde_json::from_str(&data).map_err(|err| invalid_dataset(path, err))?
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| into_record(idx, item))
        .collect()
}

fn into_record(idx: usize, item: Value) -> Result<Record> {
    match item {
        Value::Object(fields) => Ok(Record::from_map(fields)),
        Value::String(text) => Ok(Record::from_text(text)),
        other => Err(BatchError::Configuration(format!(
            "dataset item {idx} is neither an object nor a string: {other}"
        ))),
    }
}

fn invalid_dataset(path: &Path, err: serde_json::Error) -> BatchError {
    BatchError::Configuration(format!("invalid dataset {path:?}: {err}"))
}
