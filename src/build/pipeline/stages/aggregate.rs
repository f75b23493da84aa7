//! Many-to-one aggregation stage.

use std::cmp::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::build::pipeline::{Pipe, PipelineError};
use crate::build::record::FileRecord;

/// Comparator used to order a complete batch.
pub type RecordOrder = fn(&FileRecord, &FileRecord) -> Ordering;

/// Most recent `date` first. Undated records go last.
///
/// Dates are compared as strings, which orders ISO-8601 dates correctly.
pub fn by_date_descending(a: &FileRecord, b: &FileRecord) -> Ordering {
    b.metadata.first("date").cmp(&a.metadata.first("date"))
}

/// Barrier stage that emits one record per complete batch of inputs.
///
/// Inputs are buffered in arrival order. When exactly `expected` inputs have
/// arrived, the batch is sorted (stably, if an order is set), attached to a
/// copy of the output record as `metadata.inputs`, and emitted; the buffer is
/// then cleared so the next `expected` inputs form a new batch.
///
/// With `expected == 0` no input can complete a batch. Use
/// [`Aggregator::empty_batch`] with a [`Seed`] to emit the empty batch instead.
pub struct Aggregator {
    expected: usize,
    order: Option<RecordOrder>,
    output: FileRecord,
    buffer: Mutex<Vec<FileRecord>>,
}

impl Aggregator {
    pub fn new(expected: usize, output: FileRecord) -> Self {
        Self {
            expected,
            order: None,
            output,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub fn with_order(mut self, order: RecordOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Inputs buffered towards the current batch.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// The output record with an empty batch.
    pub fn empty_batch(&self) -> FileRecord {
        self.output.clone()
    }
}

#[async_trait]
impl Pipe for Aggregator {
    type Input = FileRecord;
    type Output = FileRecord;

    fn name(&self) -> &'static str {
        "aggregate"
    }

    async fn operate(&self, input: FileRecord) -> Result<Option<FileRecord>, PipelineError> {
        let mut batch = {
            let mut buffer = self.buffer.lock();
            buffer.push(input);
            if buffer.len() != self.expected {
                tracing::trace!(pending = buffer.len(), expected = self.expected, "buffered");
                return Ok(None);
            }
            std::mem::take(&mut *buffer)
        };

        if let Some(order) = self.order {
            batch.sort_by(order);
        }
        tracing::debug!(inputs = batch.len(), "batch complete");

        let mut output = self.output.clone();
        output.metadata.set_inputs(batch);
        Ok(Some(output))
    }
}

/// Source stage that emits a prepared record once, when triggered.
pub struct Seed {
    record: FileRecord,
}

impl Seed {
    pub fn new(record: FileRecord) -> Self {
        Self { record }
    }
}

#[async_trait]
impl Pipe for Seed {
    type Input = ();
    type Output = FileRecord;

    fn name(&self) -> &'static str {
        "seed"
    }

    async fn operate(&self, _: ()) -> Result<Option<FileRecord>, PipelineError> {
        Ok(Some(self.record.clone()))
    }
}
