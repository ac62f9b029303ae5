use anyhow::{Result, anyhow};
use crossbeam_channel::bounded;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::ErrorPolicy;
use crate::dsl::Constraints;
use crate::mapping::Mapping;
use crate::record::Object;
use crate::sinks::{DataSink, MatchRow};

/// Progress is logged every this many records.
const PROGRESS_INTERVAL: u64 = 100_000;

pub trait BatchProcessor: Send + Sync {
    /// Matches of `batch`, in input order.
    fn process_batch(&self, batch: Vec<(usize, Object)>) -> Result<Vec<MatchRow>>;
}

/// Applies a parsed filter and attaches mapping labels to each match.
pub struct FilterProcessor {
    pub constraints: Arc<Constraints>,
    pub mappings: Arc<Vec<Mapping>>,
    pub on_error: ErrorPolicy,
    failed: AtomicU64,
}

impl FilterProcessor {
    pub fn new(
        constraints: Arc<Constraints>,
        mappings: Arc<Vec<Mapping>>,
        on_error: ErrorPolicy,
    ) -> Self {
        Self {
            constraints,
            mappings,
            on_error,
            failed: AtomicU64::new(0),
        }
    }

    /// Records skipped because the filter could not be evaluated.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn process_record(&self, line: usize, record: Object) -> Result<Option<MatchRow>> {
        let matched = match self.constraints.evaluate(&record) {
            Ok(matched) => matched,
            Err(err) => match self.on_error {
                ErrorPolicy::Skip => {
                    tracing::warn!("Line {}: skipped, {}", line, err);
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    return Ok(None);
                }
                ErrorPolicy::Abort => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("Pipeline: Evaluation failed on line {}", line)));
                }
            },
        };

        if !matched {
            return Ok(None);
        }

        let policy = self.constraints.policy();
        let labels: BTreeMap<String, String> = self
            .mappings
            .iter()
            .filter_map(|mapping| {
                let label = mapping.label(&record, policy)?;
                Some((mapping.name.clone(), label.to_string()))
            })
            .collect();

        Ok(Some(MatchRow {
            line,
            record,
            labels,
        }))
    }
}

impl BatchProcessor for FilterProcessor {
    fn process_batch(&self, batch: Vec<(usize, Object)>) -> Result<Vec<MatchRow>> {
        let results: Vec<Result<Option<MatchRow>>> = batch
            .into_par_iter()
            .map(|(line, record)| self.process_record(line, record))
            .collect();

        // Report the earliest failing line, whatever order the workers ran in.
        let mut rows = Vec::new();
        for result in results {
            if let Some(row) = result? {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub records: u64,
    pub matched: u64,
}

/// Feed `records` through `processor` in batches and write every match to
/// `sink`, which is finished before returning.
///
/// Batches are evaluated in parallel but reach the sink in input order. An
/// input error ends the run after the records read before it are written.
pub fn run_pipeline<I, P>(
    records: I,
    processor: Arc<P>,
    mut sink: Box<dyn DataSink>,
    batch_size: usize,
) -> Result<RunStats>
where
    I: Iterator<Item = Result<(usize, Object)>>,
    P: BatchProcessor + 'static,
{
    let batch_size = batch_size.max(1);
    let (tx, rx) = bounded::<Vec<MatchRow>>(64);

    let writer = std::thread::spawn(move || -> Result<u64> {
        let mut match_count = 0u64;
        for batch in rx {
            for row in batch {
                sink.add_match(row)?;
                match_count += 1;
            }
        }
        sink.finish()
            .map_err(|err| err.context("Pipeline: Failed to finalize sink"))?;
        Ok(match_count)
    });

    let mut record_count = 0u64;
    let read_result = (|| -> Result<()> {
        let flush = |batch: Vec<(usize, Object)>| -> Result<()> {
            if batch.is_empty() {
                return Ok(());
            }
            let rows = processor.process_batch(batch)?;
            if !rows.is_empty() {
                tx.send(rows)
                    .map_err(|err| anyhow!("Pipeline: Failed to send match batch: {}", err))?;
            }
            Ok(())
        };

        let mut batch = Vec::with_capacity(batch_size);
        for item in records {
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    // Records read before the failure are still written.
                    flush(std::mem::take(&mut batch))?;
                    return Err(err);
                }
            };

            batch.push(entry);
            record_count += 1;
            if record_count % PROGRESS_INTERVAL == 0 {
                tracing::info!("Processed {} records", record_count);
            }
            if batch.len() == batch_size {
                flush(std::mem::take(&mut batch))?;
            }
        }
        flush(batch)
    })();

    drop(tx);

    let writer_join = writer.join();

    // The writer's error is the root cause when the channel disconnected.
    let matched = match writer_join {
        Ok(Ok(result)) => result,
        Ok(Err(writer_err)) => {
            return if read_result.is_err() {
                Err(writer_err
                    .context("Pipeline: Sink writer thread failed (caused channel disconnect)"))
            } else {
                Err(writer_err)
            };
        }
        Err(panic_payload) => {
            let panic_msg = panic_payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Err(anyhow!(
                "Pipeline: Sink writer thread panicked: {}",
                panic_msg
            ));
        }
    };

    read_result?;

    Ok(RunStats {
        records: record_count,
        matched,
    })
}
