//! Threaded pipeline executor.
//!
//! Every stage runs on its own worker thread, pulling from its upstream
//! node and pushing into a bounded queue read by the next stage. A full
//! queue blocks the producer and an empty one blocks the consumer, so a
//! slow stage throttles everything upstream of it.
//!
//! Failures travel in-band. A worker that receives or produces an error
//! sends it downstream and returns; once the sink stops reading, every
//! upstream send fails and the remaining workers wind down on their own.

use std::io;
use std::sync::Arc;
use std::thread;

use tracing::{debug, error};

use crate::error::{PipelineError, Result};
use crate::node::{Node, RowSender, StageStats, Worker};
use crate::record::Record;
use crate::record_stage::RecordStage;
use crate::schema::Schema;

/// Start `stage` on a worker thread reading from `upstream`.
///
/// Returns the node carrying the stage's output and a handle to the worker.
pub fn spawn_stage(
    upstream: Node,
    stage: Box<dyn RecordStage>,
    depth: usize,
) -> Result<(Node, Worker)> {
    let name = stage.name().to_string();
    let (tx, node) = Node::channel(stage.output_schema(), depth);
    let worker_name = name.clone();
    let handle = thread::Builder::new()
        .name(format!("csvpipe-{name}"))
        .spawn(move || run_stage(upstream, stage, tx, worker_name))
        .map_err(|e| PipelineError::io(format!("spawn worker for {name}"), e))?;
    Ok((node, Worker::new(name, handle)))
}

fn run_stage(
    upstream: Node,
    mut stage: Box<dyn RecordStage>,
    tx: RowSender,
    name: String,
) -> StageStats {
    let mut stats = StageStats::new(&name);
    debug!(stage = %name, "stage started");

    for item in upstream.into_rows() {
        let record = match item {
            Ok(record) => record,
            Err(e) => {
                debug!(stage = %name, "passing upstream error along");
                let _ = tx.send(Err(e));
                return stats;
            }
        };
        stats.input_rows += 1;
        match stage.process(record) {
            Ok(rows) => {
                if !forward(&tx, rows, &mut stats) {
                    debug!(stage = %name, "downstream closed");
                    return stats;
                }
            }
            Err(e) => {
                error!(stage = %name, error = %e, "stage failed");
                let _ = tx.send(Err(e));
                return stats;
            }
        }
    }

    match stage.flush() {
        Ok(rows) => {
            forward(&tx, rows, &mut stats);
        }
        Err(e) => {
            error!(stage = %name, error = %e, "stage failed during flush");
            let _ = tx.send(Err(e));
            return stats;
        }
    }

    debug!(
        stage = %name,
        input_rows = stats.input_rows,
        output_rows = stats.output_rows,
        "stage finished"
    );
    stats
}

/// Send `rows` downstream. Returns false once the receiver is gone.
fn forward(tx: &RowSender, rows: Vec<Record>, stats: &mut StageStats) -> bool {
    for row in rows {
        if tx.send(Ok(row)).is_err() {
            return false;
        }
        stats.output_rows += 1;
    }
    true
}

/// Start a worker decoding CSV data rows from `reader`.
///
/// The header must already have been consumed; `schema` describes it.
/// A row that fails to decode ends the stream with a `Decode` error
/// carrying its 1-based data row number.
pub fn spawn_csv_source<R>(
    reader: csv::Reader<R>,
    schema: Arc<Schema>,
    depth: usize,
) -> Result<(Node, Worker)>
where
    R: io::Read + Send + 'static,
{
    let (tx, node) = Node::channel(schema, depth);
    let handle = thread::Builder::new()
        .name("csvpipe-source".to_string())
        .spawn(move || {
            let mut stats = StageStats::new("source");
            for (i, rec) in reader.into_records().enumerate() {
                let row = i as u64 + 1;
                let item = rec
                    .map(|r| Record::from(&r))
                    .map_err(|source| PipelineError::Decode { row, source });
                let failed = item.is_err();
                if failed {
                    error!(row, "input row failed to decode");
                } else {
                    stats.input_rows += 1;
                }
                if tx.send(item).is_err() || failed {
                    break;
                }
                stats.output_rows += 1;
            }
            debug!(rows = stats.output_rows, "source finished");
            stats
        })
        .map_err(|e| PipelineError::io("spawn source worker", e))?;
    Ok((node, Worker::new("source".to_string(), handle)))
}

/// Start a worker emitting already materialized records.
pub fn spawn_record_source(
    schema: Arc<Schema>,
    records: Vec<Record>,
    depth: usize,
) -> Result<(Node, Worker)> {
    let (tx, node) = Node::channel(schema, depth);
    let handle = thread::Builder::new()
        .name("csvpipe-records".to_string())
        .spawn(move || {
            let mut stats = StageStats::new("records");
            stats.input_rows = records.len() as u64;
            forward(&tx, records, &mut stats);
            stats
        })
        .map_err(|e| PipelineError::io("spawn record source", e))?;
    Ok((node, Worker::new("records".to_string(), handle)))
}

/// Drain `node` into `writer` as CSV: header row first, then every record.
///
/// Returns the number of data rows written, or the first error that
/// reached the end of the pipeline.
pub fn write_csv<W: io::Write>(node: Node, writer: W) -> Result<u64> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(node.schema().columns())
        .map_err(|e| PipelineError::csv("write header", e))?;

    let mut written = 0;
    for item in node.into_rows() {
        let record = item?;
        wtr.write_record(record.fields())
            .map_err(|e| PipelineError::csv(format!("write row {}", written + 1), e))?;
        written += 1;
    }
    wtr.flush()
        .map_err(|e| PipelineError::io("flush output", e))?;
    Ok(written)
}

/// Drain `node` into memory.
pub fn collect_rows(node: Node) -> Result<Vec<Record>> {
    node.into_rows().collect()
}
