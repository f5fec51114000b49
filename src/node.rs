//! Stream handles connecting one stage to the next.
//!
//! A [`Node`] pairs a schema with the receiving end of a bounded queue.
//! Exactly one stage produces into it and exactly one consumer drains it.
//! Queue items are `Result`s so a failure anywhere upstream reaches the
//! sink in order with the rows that preceded it.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::JoinHandle;

use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::schema::Schema;

/// Sending half of a node's queue.
pub type RowSender = SyncSender<Result<Record>>;

/// Schema plus the stream of rows a stage emits.
#[derive(Debug)]
pub struct Node {
    schema: Arc<Schema>,
    rows: Receiver<Result<Record>>,
}

impl Node {
    /// Create a bounded queue of `depth` rows and the node reading from it.
    pub fn channel(schema: Arc<Schema>, depth: usize) -> (RowSender, Node) {
        let (tx, rx) = mpsc::sync_channel(depth);
        (tx, Node { schema, rows: rx })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Same rows under a different schema of equal width.
    pub fn with_schema(self, schema: Arc<Schema>) -> Node {
        debug_assert_eq!(schema.len(), self.schema.len());
        Node {
            schema,
            rows: self.rows,
        }
    }

    /// Block until the next row arrives. `None` means end of stream.
    pub fn recv(&self) -> Option<Result<Record>> {
        self.rows.recv().ok()
    }

    /// Consume the node as a blocking iterator over its rows.
    pub fn into_rows(self) -> mpsc::IntoIter<Result<Record>> {
        self.rows.into_iter()
    }
}

/// Row counts observed by one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStats {
    pub name: String,
    pub input_rows: u64,
    pub output_rows: u64,
}

impl StageStats {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            input_rows: 0,
            output_rows: 0,
        }
    }
}

/// Handle to a running stage worker.
#[derive(Debug)]
pub struct Worker {
    name: String,
    handle: JoinHandle<StageStats>,
}

impl Worker {
    pub(crate) fn new(name: String, handle: JoinHandle<StageStats>) -> Self {
        Self { name, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the worker to finish.
    pub fn join(self) -> Result<StageStats> {
        self.handle
            .join()
            .map_err(|_| PipelineError::WorkerPanicked(self.name))
    }
}
