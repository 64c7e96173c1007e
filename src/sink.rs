//! Serialized CSV result sink.
//!
//! One writer task owns the output file; lookup tasks hand rows over a
//! channel. Rows hit the disk in completion order, whole rows at a time.

use std::fs::File;
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::record::LookupResult;
use crate::Result;

/// Channel capacity between lookup tasks and the writer.
const SINK_BUFFER: usize = 256;

/// Cloneable handle for submitting rows to the writer task.
#[derive(Clone)]
pub struct ResultSink {
    tx: mpsc::Sender<LookupResult>,
}

impl ResultSink {
    /// Queues one row for writing. Fails only when the writer is gone, which
    /// is fatal for the run.
    pub async fn submit(&self, row: LookupResult) -> Result<()> {
        self.tx.send(row).await?;
        Ok(())
    }
}

/// Background task owning the CSV writer. Spawn with
/// `tokio::spawn(writer.run())`; it exits once every [`ResultSink`] clone is
/// dropped.
pub struct SinkWriter {
    rx: mpsc::Receiver<LookupResult>,
    wtr: csv::Writer<File>,
    batch_size: usize,
}

/// Creates the channel-fed sink for `path`, truncating any previous file.
/// Returns the submit handle and the writer task to spawn.
pub fn create_sink(path: &Path, batch_size: usize) -> Result<(ResultSink, SinkWriter)> {
    let file = File::create(path)?;
    let wtr = csv::Writer::from_writer(file);
    let (tx, rx) = mpsc::channel(SINK_BUFFER);
    Ok((
        ResultSink { tx },
        SinkWriter {
            rx,
            wtr,
            batch_size,
        },
    ))
}

impl SinkWriter {
    /// Consumes rows until the channel closes, flushing to disk every
    /// `batch_size` rows and once more at the end. Returns the number of
    /// rows written. Any write error aborts the run.
    pub async fn run(mut self) -> Result<usize> {
        let mut written = 0usize;
        let mut pending = 0usize;

        while let Some(row) = self.rx.recv().await {
            self.wtr.serialize(&row)?;
            written += 1;
            pending += 1;
            if pending >= self.batch_size {
                self.wtr.flush()?;
                info!(rows = pending, total = written, "flushed batch to disk");
                pending = 0;
            }
        }

        self.wtr.flush()?;
        if pending > 0 {
            info!(rows = pending, total = written, "flushed final batch to disk");
        }
        debug!(total = written, "sink writer finished");
        Ok(written)
    }
}
