use super::{DataSink, MatchRow, open_output, row_properties};
use anyhow::Result;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One JSON object per matched record.
pub struct JsonlSink {
    writer: BufWriter<Box<dyn Write + Send>>,
}

impl JsonlSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_writer(open_output(path.as_ref())?))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }
}

impl DataSink for JsonlSink {
    fn add_match(&mut self, row: MatchRow) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &row_properties(row)?)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
