//! Column projection: `cut`, `shuffle`, `drop`, `rename`.

use std::sync::Arc;

use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::record_stage::RecordStage;
use crate::schema::Schema;
use crate::stages::dedup_columns;

/// CUT - keep the listed columns, in the listed order.
///
/// Also backs SHUFFLE, which is a cut over every column with the leading
/// columns moved to the front.
pub struct Cut {
    name: &'static str,
    schema: Arc<Schema>,
    /// Output position for each input column, `None` when dropped.
    edits: Vec<Option<usize>>,
}

impl Cut {
    pub fn new<S: AsRef<str>>(input: &Schema, columns: &[S]) -> Result<Self> {
        Self::build("cut", input, columns)
    }

    /// Bring `leading` to the front, keeping the other columns in order.
    pub fn shuffle<S: AsRef<str>>(input: &Schema, leading: &[S]) -> Result<Self> {
        let mut all: Vec<&str> = leading.iter().map(|c| c.as_ref()).collect();
        all.extend(input.columns().iter().map(String::as_str));
        Self::build("shuffle", input, &all)
    }

    fn build<S: AsRef<str>>(name: &'static str, input: &Schema, columns: &[S]) -> Result<Self> {
        let columns = dedup_columns(columns);
        input.require_all(columns.as_slice())?;
        let edits = input
            .columns()
            .iter()
            .map(|h| columns.iter().position(|c| c == h))
            .collect();
        Ok(Self {
            name,
            schema: Arc::new(Schema::new(columns)?),
            edits,
        })
    }
}

impl RecordStage for Cut {
    fn process(&mut self, record: Record) -> Result<Vec<Record>> {
        let mut out = vec![String::new(); self.schema.len()];
        for (value, edit) in record.into_fields().into_iter().zip(&self.edits) {
            if let Some(pos) = *edit {
                out[pos] = value;
            }
        }
        Ok(vec![Record::new(out)])
    }

    fn output_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// DROP - remove the listed columns.
pub struct DropColumns {
    schema: Arc<Schema>,
    keep: Vec<bool>,
}

impl DropColumns {
    pub fn new<S: AsRef<str>>(input: &Schema, columns: &[S]) -> Result<Self> {
        let dropped = input.require_all(columns)?;
        let keep: Vec<bool> = (0..input.len()).map(|i| !dropped.contains(&i)).collect();
        let remaining = input
            .columns()
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(c, _)| c.clone())
            .collect();
        Ok(Self {
            schema: Arc::new(Schema::new(remaining)?),
            keep,
        })
    }
}

impl RecordStage for DropColumns {
    fn process(&mut self, record: Record) -> Result<Vec<Record>> {
        let fields = record
            .into_fields()
            .into_iter()
            .zip(&self.keep)
            .filter(|(_, k)| **k)
            .map(|(v, _)| v)
            .collect();
        Ok(vec![Record::new(fields)])
    }

    fn output_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn name(&self) -> &str {
        "drop"
    }
}

/// RENAME - the input schema with `from[i]` renamed to `to[i]`.
///
/// Rows are untouched, so this produces a schema rather than a stage.
pub fn rename_schema<S: AsRef<str>>(input: &Schema, from: &[S], to: &[S]) -> Result<Schema> {
    if from.len() != to.len() {
        return Err(PipelineError::invalid(
            "rename",
            format!(
                "{} source column(s) but {} new name(s)",
                from.len(),
                to.len()
            ),
        ));
    }
    let mut columns = input.columns().to_vec();
    for (old, new) in from.iter().zip(to) {
        let idx = input.require(old.as_ref())?;
        columns[idx] = new.as_ref().to_string();
    }
    Schema::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> Schema {
        Schema::from_strs(&["id", "name", "amount"]).unwrap()
    }

    fn row() -> Record {
        Record::from_strs(&["1", "alice", "10"])
    }

    #[test]
    fn test_cut_reorders_and_drops() {
        let mut stage = Cut::new(&input(), &["amount", "id"]).unwrap();
        assert_eq!(stage.output_schema().columns(), &["amount", "id"]);
        let out = stage.process(row()).unwrap();
        assert_eq!(out, vec![Record::from_strs(&["10", "1"])]);
    }

    #[test]
    fn test_cut_dedups_request() {
        let mut stage = Cut::new(&input(), &["name", "name", "id"]).unwrap();
        assert_eq!(stage.output_schema().columns(), &["name", "id"]);
        assert_eq!(stage.process(row()).unwrap()[0], Record::from_strs(&["alice", "1"]));
    }

    #[test]
    fn test_cut_missing_column() {
        let err = Cut::new(&input(), &["id", "ghost"]).err().unwrap();
        assert!(matches!(err, PipelineError::ColumnNotFound(c) if c == "ghost"));
    }

    #[test]
    fn test_shuffle_moves_leading_to_front() {
        let mut stage = Cut::shuffle(&input(), &["amount"]).unwrap();
        assert_eq!(stage.name(), "shuffle");
        assert_eq!(stage.output_schema().columns(), &["amount", "id", "name"]);
        assert_eq!(
            stage.process(row()).unwrap()[0],
            Record::from_strs(&["10", "1", "alice"])
        );
    }

    #[test]
    fn test_shuffle_missing_column() {
        assert!(Cut::shuffle(&input(), &["nope"]).is_err());
    }

    #[test]
    fn test_drop_columns() {
        let mut stage = DropColumns::new(&input(), &["name"]).unwrap();
        assert_eq!(stage.output_schema().columns(), &["id", "amount"]);
        assert_eq!(stage.process(row()).unwrap()[0], Record::from_strs(&["1", "10"]));
    }

    #[test]
    fn test_drop_missing_column() {
        let err = DropColumns::new(&input(), &["nope"]).err().unwrap();
        assert!(matches!(err, PipelineError::ColumnNotFound(_)));
    }

    #[test]
    fn test_rename_schema() {
        let renamed = rename_schema(&input(), &["id", "amount"], &["key", "total"]).unwrap();
        assert_eq!(renamed.columns(), &["key", "name", "total"]);
    }

    #[test]
    fn test_rename_length_mismatch() {
        let err = rename_schema(&input(), &["id", "name"], &["key"]).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument { .. }));
    }

    #[test]
    fn test_rename_to_existing_name() {
        let err = rename_schema(&input(), &["id"], &["name"]).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateColumn(c) if c == "name"));
    }

    #[test]
    fn test_rename_missing_column() {
        let err = rename_schema(&input(), &["ghost"], &["x"]).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound(c) if c == "ghost"));
    }
}
