use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::record::Object;

pub mod json;
pub mod jsonl;
pub mod text;

pub use self::json::JsonSink;
pub use self::jsonl::JsonlSink;
pub use self::text::TextSink;

/// A record that passed the filter, with any mapping labels attached.
#[derive(Clone, Debug, Serialize)]
pub struct MatchRow {
    pub line: usize,
    pub record: Object,
    pub labels: BTreeMap<String, String>,
}

pub trait DataSink: Send {
    fn add_match(&mut self, row: MatchRow) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

/// File at `path`, or stdout for `-`.
pub(crate) fn open_output(path: &Path) -> Result<Box<dyn Write + Send>> {
    if path == Path::new("-") {
        Ok(Box::new(std::io::stdout()))
    } else {
        Ok(Box::new(File::create(path)?))
    }
}

/// Record fields followed by labels; a label never replaces a field.
pub(crate) fn row_properties(row: MatchRow) -> Result<serde_json::Map<String, serde_json::Value>> {
    let mut properties = serde_json::Map::new();
    for (name, value) in row.record.iter() {
        properties.insert(name.clone(), serde_json::to_value(value)?);
    }
    for (name, label) in row.labels {
        if properties.contains_key(&name) {
            continue;
        }
        properties.insert(name, serde_json::Value::String(label));
    }
    Ok(properties)
}
