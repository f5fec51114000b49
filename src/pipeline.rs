//! Pipeline assembly.
//!
//! A [`Pipeline`] owns the node at the current end of the chain. Each
//! applied directive is validated against that node's schema, turned into
//! a stage and started on its own worker right away, so construction
//! errors surface before the sink has read a single row.

use std::io::{Read, Write};
use std::sync::Arc;

use tracing::debug;

use crate::config::PipelineConfig;
use crate::dsl::Command;
use crate::error::{PipelineError, Result};
use crate::executor;
use crate::node::{Node, StageStats, Worker};
use crate::record::Record;
use crate::record_stage::command_to_record_stage;
use crate::schema::Schema;
use crate::stages::rename_schema;

/// Row counts for a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub input_rows: u64,
    pub output_rows: u64,
    /// Source first, then one entry per started stage in pipeline order.
    pub stages: Vec<StageStats>,
}

/// A chain of running stages.
pub struct Pipeline {
    config: PipelineConfig,
    node: Node,
    workers: Vec<Worker>,
}

impl Pipeline {
    /// Start a pipeline reading CSV from `reader`.
    ///
    /// The header row is read here, on the calling thread; data rows are
    /// decoded by a source worker.
    pub fn from_reader<R>(reader: R, config: PipelineConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let header = rdr
            .headers()
            .map_err(|e| PipelineError::csv("read input header", e))?;
        if header.is_empty() {
            return Err(PipelineError::EmptyInput("input".to_string()));
        }
        let schema = Arc::new(Schema::new(header.iter().map(str::to_string).collect())?);
        let (node, worker) = executor::spawn_csv_source(rdr, schema, config.queue_depth)?;
        Ok(Self {
            config,
            node,
            workers: vec![worker],
        })
    }

    /// Start a pipeline over records already in memory.
    pub fn from_records(schema: Schema, records: Vec<Record>, config: PipelineConfig) -> Result<Self> {
        if let Some(bad) = records.iter().find(|r| r.len() != schema.len()) {
            return Err(PipelineError::invalid(
                "input",
                format!(
                    "record has {} field(s) but the schema has {} column(s)",
                    bad.len(),
                    schema.len()
                ),
            ));
        }
        let (node, worker) =
            executor::spawn_record_source(Arc::new(schema), records, config.queue_depth)?;
        Ok(Self {
            config,
            node,
            workers: vec![worker],
        })
    }

    /// Schema of the rows at the current end of the chain.
    pub fn schema(&self) -> &Arc<Schema> {
        self.node.schema()
    }

    /// Validate `cmd` against the current schema and start its stage.
    pub fn apply(mut self, cmd: &Command) -> Result<Self> {
        if let Command::Rename { from, to } = cmd {
            let schema = rename_schema(self.node.schema(), from, to)?;
            debug!(columns = ?schema.columns(), "renamed columns");
            self.node = self.node.with_schema(Arc::new(schema));
            return Ok(self);
        }

        let stage = command_to_record_stage(cmd, self.node.schema(), &self.config)?;
        let (node, worker) = executor::spawn_stage(self.node, stage, self.config.queue_depth)?;
        self.workers.push(worker);
        Ok(Self {
            config: self.config,
            node,
            workers: self.workers,
        })
    }

    /// Apply every directive in order.
    pub fn apply_all(self, commands: &[Command]) -> Result<Self> {
        commands.iter().try_fold(self, |pipeline, cmd| pipeline.apply(cmd))
    }

    /// Drain the pipeline into `writer` as CSV and wait for every worker.
    ///
    /// On error the workers are not waited for; they stop on their own once
    /// their downstream is gone.
    pub fn write_csv<W: Write>(self, writer: W) -> Result<RunSummary> {
        let output_rows = executor::write_csv(self.node, writer)?;
        summarize(self.workers, output_rows)
    }

    /// Drain the pipeline into memory.
    pub fn collect(self) -> Result<Vec<Record>> {
        let rows = executor::collect_rows(self.node)?;
        for worker in self.workers {
            worker.join()?;
        }
        Ok(rows)
    }
}

fn summarize(workers: Vec<Worker>, output_rows: u64) -> Result<RunSummary> {
    let stages = workers
        .into_iter()
        .map(Worker::join)
        .collect::<Result<Vec<_>>>()?;
    let input_rows = stages.first().map(|s| s.output_rows).unwrap_or(0);
    Ok(RunSummary {
        input_rows,
        output_rows,
        stages,
    })
}

/// Read CSV from `reader`, run `commands` over it and write CSV to `writer`.
pub fn execute_pipeline<R, W>(
    reader: R,
    writer: W,
    commands: &[Command],
    config: PipelineConfig,
) -> Result<RunSummary>
where
    R: Read + Send + 'static,
    W: Write,
{
    Pipeline::from_reader(reader, config)?
        .apply_all(commands)?
        .write_csv(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::parse_commands;

    const INPUT: &str = "id,name,amount\n1,alice,30\n2,bob,20\n1,alice,10\n";

    fn run(args: &[&str]) -> Result<String> {
        let commands = parse_commands(args)?;
        let mut out = Vec::new();
        execute_pipeline(INPUT.as_bytes(), &mut out, &commands, PipelineConfig::default())?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_grep_then_sorti() {
        let out = run(&["grep", "name", "alice", "sorti", "amount"]).unwrap();
        assert_eq!(out, "id,name,amount\n1,alice,10\n1,alice,30\n");
    }

    #[test]
    fn test_no_directives_copies_input() {
        assert_eq!(run(&[]).unwrap(), INPUT);
    }

    #[test]
    fn test_rename_then_use_new_name() {
        let out = run(&["rename", "amount", "total", "cut", "total,name"]).unwrap();
        assert_eq!(out, "total,name\n30,alice\n20,bob\n10,alice\n");
    }

    #[test]
    fn test_old_name_gone_after_rename() {
        let err = run(&["rename", "amount", "total", "grep", "amount", "1"]).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound(c) if c == "amount"));
    }

    #[test]
    fn test_schema_tracks_stages() {
        let commands = parse_commands(&["shuffle", "amount", "drop", "id"]).unwrap();
        let pipeline = Pipeline::from_reader(INPUT.as_bytes(), PipelineConfig::default())
            .unwrap()
            .apply_all(&commands)
            .unwrap();
        assert_eq!(pipeline.schema().columns(), &["amount", "name"]);
        let rows = pipeline.collect().unwrap();
        assert_eq!(rows[0], Record::from_strs(&["30", "alice"]));
    }

    #[test]
    fn test_summary_counts() {
        let commands = parse_commands(&["grepv", "name", "bob"]).unwrap();
        let mut out = Vec::new();
        let summary =
            execute_pipeline(INPUT.as_bytes(), &mut out, &commands, PipelineConfig::default())
                .unwrap();
        assert_eq!(summary.input_rows, 3);
        assert_eq!(summary.output_rows, 2);
        assert_eq!(summary.stages.len(), 2);
        assert_eq!(summary.stages[1].name, "grepv");
        assert_eq!(summary.stages[1].input_rows, 3);
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = Pipeline::from_reader("".as_bytes(), PipelineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::EmptyInput(_)));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = Pipeline::from_reader("a,b,a\n1,2,3\n".as_bytes(), PipelineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::DuplicateColumn(c) if c == "a"));
    }

    #[test]
    fn test_from_records_checks_width() {
        let schema = Schema::from_strs(&["a", "b"]).unwrap();
        let result = Pipeline::from_records(
            schema,
            vec![Record::from_strs(&["1"])],
            PipelineConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_error_is_fatal() {
        let mut out = Vec::new();
        let err = execute_pipeline(
            "a,b\n1,2\n3\n".as_bytes(),
            &mut out,
            &[],
            PipelineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Decode { row: 2, .. }));
    }
}
