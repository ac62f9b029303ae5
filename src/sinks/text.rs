use super::{DataSink, MatchRow, open_output};
use anyhow::Result;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Numbered listing: `1: 'Name'='value', ...`.
pub struct TextSink {
    writer: BufWriter<Box<dyn Write + Send>>,
    count: u64,
}

impl TextSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_writer(open_output(path.as_ref())?))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            count: 0,
        }
    }
}

impl DataSink for TextSink {
    fn add_match(&mut self, row: MatchRow) -> Result<()> {
        self.count += 1;
        write!(self.writer, "{}: {}", self.count, row.record)?;
        for (name, label) in &row.labels {
            write!(self.writer, " [{}={}]", name, label)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.count == 0 {
            writeln!(self.writer, "No matches found")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_line;
    use std::collections::BTreeMap;

    fn read_back(rows: Vec<MatchRow>) -> String {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut sink = TextSink::new(file.path()).unwrap();
        for row in rows {
            sink.add_match(row).unwrap();
        }
        sink.finish().unwrap();
        std::fs::read_to_string(file.path()).unwrap()
    }

    #[test]
    fn test_numbers_matches() {
        let mut labels = BTreeMap::new();
        labels.insert("era".to_string(), "modern".to_string());
        let out = read_back(vec![
            MatchRow {
                line: 3,
                record: parse_line("Language=French, BookNumber=150"),
                labels: BTreeMap::new(),
            },
            MatchRow {
                line: 7,
                record: parse_line("Language=Spanish"),
                labels,
            },
        ]);
        assert_eq!(
            out,
            "1: 'BookNumber'=150, 'Language'='French'\n2: 'Language'='Spanish' [era=modern]\n"
        );
    }

    #[test]
    fn test_reports_no_matches() {
        assert_eq!(read_back(Vec::new()), "No matches found\n");
    }
}
