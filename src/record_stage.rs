//! Stage trait and the directive-to-stage factory.
//!
//! Each `RecordStage` processes one record at a time, returning zero or more
//! output records. The executor runs every stage on its own worker thread and
//! calls `flush` once the upstream is exhausted.

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::dsl::Command;
use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::schema::Schema;
use crate::stages::{Compact, Cut, DropColumns, Grep, Join, SavePartitions, Sort};

/// A pipeline stage that processes records one at a time.
///
/// A stage is fully validated against its input schema when it is
/// constructed, so `process` and `flush` only fail on I/O.
pub trait RecordStage: Send {
    /// Process a single input record, returning zero or more output records.
    fn process(&mut self, record: Record) -> Result<Vec<Record>>;

    /// Emit whatever is still held once the input is exhausted.
    fn flush(&mut self) -> Result<Vec<Record>> {
        Ok(vec![])
    }

    /// Schema of the records this stage emits.
    fn output_schema(&self) -> Arc<Schema>;

    /// The display name of this stage.
    fn name(&self) -> &str;
}

/// Build the stage for `cmd` on top of a stream with schema `input`.
///
/// `rename` has no stage: it only swaps the schema and is handled by the
/// pipeline assembler, so it is rejected here.
pub fn command_to_record_stage(
    cmd: &Command,
    input: &Arc<Schema>,
    config: &PipelineConfig,
) -> Result<Box<dyn RecordStage>> {
    let stage: Box<dyn RecordStage> = match cmd {
        Command::Cut { columns } => Box::new(Cut::new(input, columns)?),
        Command::Shuffle { leading } => Box::new(Cut::shuffle(input, leading)?),
        Command::Drop { columns } => Box::new(DropColumns::new(input, columns)?),
        Command::Grep { column, pattern } => Box::new(Grep::new(input, column, pattern, false)?),
        Command::Grepv { column, pattern } => Box::new(Grep::new(input, column, pattern, true)?),
        Command::Sort { columns, kind } => Box::new(Sort::new(
            input,
            columns,
            *kind,
            config.sort_tie_break,
        )?),
        Command::Join { path, pairs } => Box::new(Join::open(input, path, pairs)?),
        Command::Compact { columns } => Box::new(Compact::new(input, columns.as_deref())?),
        Command::SavePartitions { columns, template } => Box::new(SavePartitions::new(
            input,
            columns,
            template,
            config.partition_flush_rows,
        )?),
        Command::Rename { .. } => {
            return Err(PipelineError::invalid(
                "rename",
                "rename is a schema-only transform and has no record stage",
            ));
        }
    };
    Ok(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::SortKind;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from_strs(&["id", "name", "amount"]).unwrap())
    }

    fn cols(s: &[&str]) -> Vec<String> {
        s.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_factory_grep() {
        let cmd = Command::Grep {
            column: "name".to_string(),
            pattern: "ali".to_string(),
        };
        let mut stage = command_to_record_stage(&cmd, &schema(), &PipelineConfig::default()).unwrap();
        assert_eq!(stage.name(), "grep");
        let out = stage.process(Record::from_strs(&["1", "alice", "10"])).unwrap();
        assert_eq!(out.len(), 1);
        assert!(stage.process(Record::from_strs(&["2", "bob", "20"])).unwrap().is_empty());
    }

    #[test]
    fn test_factory_sort_flushes() {
        let cmd = Command::Sort {
            columns: cols(&["amount"]),
            kind: SortKind::Integer,
        };
        let mut stage = command_to_record_stage(&cmd, &schema(), &PipelineConfig::default()).unwrap();
        assert_eq!(stage.name(), "sorti");
        assert!(stage.process(Record::from_strs(&["1", "a", "30"])).unwrap().is_empty());
        assert!(stage.process(Record::from_strs(&["2", "b", "4"])).unwrap().is_empty());
        let flushed = stage.flush().unwrap();
        assert_eq!(flushed[0].field(2), "4");
        assert_eq!(flushed[1].field(2), "30");
    }

    #[test]
    fn test_factory_cut_schema() {
        let cmd = Command::Cut {
            columns: cols(&["amount", "id"]),
        };
        let stage = command_to_record_stage(&cmd, &schema(), &PipelineConfig::default()).unwrap();
        assert_eq!(stage.output_schema().columns(), &cols(&["amount", "id"])[..]);
    }

    #[test]
    fn test_factory_validates_columns() {
        let cmd = Command::Drop {
            columns: cols(&["nope"]),
        };
        let err = command_to_record_stage(&cmd, &schema(), &PipelineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::ColumnNotFound(c) if c == "nope"));
    }

    #[test]
    fn test_factory_rejects_rename() {
        let cmd = Command::Rename {
            from: cols(&["id"]),
            to: cols(&["key"]),
        };
        assert!(command_to_record_stage(&cmd, &schema(), &PipelineConfig::default()).is_err());
    }
}
