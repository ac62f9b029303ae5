use super::{DataSink, MatchRow, open_output};
use anyhow::Result;
use std::io::{BufWriter, Write};
use std::path::Path;

/// A single JSON array of `{line, record, labels}` objects.
pub struct JsonSink {
    writer: BufWriter<Box<dyn Write + Send>>,
    first_row: bool,
}

impl JsonSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut writer = BufWriter::new(open_output(path.as_ref())?);
        writeln!(writer, "[")?;
        Ok(Self {
            writer,
            first_row: true,
        })
    }
}

impl DataSink for JsonSink {
    fn add_match(&mut self, row: MatchRow) -> Result<()> {
        if !self.first_row {
            writeln!(self.writer, ",")?;
        }
        self.first_row = false;

        write!(self.writer, "  ")?;
        serde_json::to_writer(&mut self.writer, &row)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Close the array
        if !self.first_row {
            writeln!(self.writer)?;
        }
        writeln!(self.writer, "]")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_line;
    use std::collections::BTreeMap;

    #[test]
    fn test_writes_valid_array() {
        let file = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        let mut sink = JsonSink::new(file.path()).unwrap();
        for (line, text) in [(1, "Language=French, BookNumber=150"), (4, "Language=Spanish")] {
            sink.add_match(MatchRow {
                line,
                record: parse_line(text),
                labels: BTreeMap::new(),
            })
            .unwrap();
        }
        sink.finish().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["line"], 1);
        assert_eq!(rows[0]["record"]["BookNumber"], 150);
        assert_eq!(rows[1]["record"]["Language"], "Spanish");
    }

    #[test]
    fn test_empty_output_is_empty_array() {
        let file = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        let mut sink = JsonSink::new(file.path()).unwrap();
        sink.finish().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, serde_json::json!([]));
    }
}
