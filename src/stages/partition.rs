//! SAVE_PARTITIONS - pass records through while fanning them out to files.
//!
//! Every record goes downstream unchanged. On the side, the record's values
//! in the partition columns are substituted into a path template; records
//! sharing a path are buffered together and appended to that file whenever
//! the buffer grows past the flush threshold, and once more at end of stream.
//! A file is created (with a header row) the first time its key is flushed.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::record_stage::RecordStage;
use crate::schema::Schema;

const OPERATOR: &str = "save_partitions";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot,
}

/// A file path with `%s` / `%v` placeholders.
///
/// Placeholders are filled left to right; `%%` is a literal percent sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<Segment>,
    slots: usize,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut slots = 0;
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => literal.push('%'),
                Some('s') | Some('v') => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot);
                    slots += 1;
                }
                Some(other) => {
                    return Err(PipelineError::invalid(
                        OPERATOR,
                        format!("unsupported placeholder '%{other}' in '{template}'"),
                    ));
                }
                None => {
                    return Err(PipelineError::invalid(
                        OPERATOR,
                        format!("dangling '%' at end of '{template}'"),
                    ));
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments, slots })
    }

    /// Number of placeholders.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Fill the placeholders with `values`, in order.
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> String {
        let mut out = String::new();
        let mut values = values.iter();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Slot => {
                    if let Some(v) = values.next() {
                        out.push_str(v.as_ref());
                    }
                }
            }
        }
        out
    }
}

/// Pass-through stage that writes each record to its partition file.
pub struct SavePartitions {
    schema: Arc<Schema>,
    key_columns: Vec<usize>,
    template: PathTemplate,
    flush_rows: usize,
    buffers: HashMap<String, Vec<Record>>,
    writers: HashMap<String, csv::Writer<File>>,
}

impl SavePartitions {
    pub fn new<S: AsRef<str>>(
        input: &Arc<Schema>,
        columns: &[S],
        template: &str,
        flush_rows: usize,
    ) -> Result<Self> {
        let key_columns = input.require_all(columns)?;
        let template = PathTemplate::parse(template)?;
        if template.slots() != key_columns.len() {
            return Err(PipelineError::invalid(
                OPERATOR,
                format!(
                    "template has {} placeholder(s) but {} partition column(s) were given",
                    template.slots(),
                    key_columns.len()
                ),
            ));
        }
        Ok(Self {
            schema: Arc::clone(input),
            key_columns,
            template,
            flush_rows,
            buffers: HashMap::new(),
            writers: HashMap::new(),
        })
    }

    /// The file path `record` belongs to.
    pub fn partition_path(&self, record: &Record) -> String {
        let values: Vec<&str> = self.key_columns.iter().map(|&i| record.field(i)).collect();
        self.template.render(&values)
    }

    fn flush_key(&mut self, key: &str) -> Result<()> {
        let rows = match self.buffers.get_mut(key) {
            Some(buf) if !buf.is_empty() => std::mem::take(buf),
            _ => return Ok(()),
        };
        let writer = match self.writers.entry(key.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(create_partition(key, &self.schema)?),
        };
        for row in &rows {
            writer
                .write_record(row.fields())
                .map_err(|e| PipelineError::csv(format!("write {key}"), e))?;
        }
        debug!(path = key, rows = rows.len(), "flushed partition buffer");
        Ok(())
    }
}

fn create_partition(path: &str, schema: &Schema) -> Result<csv::Writer<File>> {
    if let Some(parent) = Path::new(path).parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| PipelineError::io(format!("mkdir -p {}", parent.display()), e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(format!("create {path}"), e))?;
    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(schema.columns())
        .map_err(|e| PipelineError::csv(format!("write header to {path}"), e))?;
    info!(path, "created partition file");
    Ok(writer)
}

impl RecordStage for SavePartitions {
    fn process(&mut self, record: Record) -> Result<Vec<Record>> {
        let key = self.partition_path(&record);
        let buffer = self.buffers.entry(key.clone()).or_default();
        buffer.push(record.clone());
        if buffer.len() > self.flush_rows {
            self.flush_key(&key)?;
        }
        Ok(vec![record])
    }

    fn flush(&mut self) -> Result<Vec<Record>> {
        let pending: Vec<String> = self
            .buffers
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(key, _)| key.clone())
            .collect();
        for key in pending {
            self.flush_key(&key)?;
        }
        for (path, writer) in self.writers.iter_mut() {
            writer
                .flush()
                .map_err(|e| PipelineError::io(format!("flush {path}"), e))?;
        }
        Ok(vec![])
    }

    fn output_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn name(&self) -> &str {
        OPERATOR
    }
}
