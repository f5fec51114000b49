//! GREP / GREPV - substring filter over one column.

use std::sync::Arc;

use crate::error::Result;
use crate::record::Record;
use crate::record_stage::RecordStage;
use crate::schema::Schema;

/// Keeps records whose field contains (GREP) or does not contain (GREPV)
/// a case-sensitive substring.
pub struct Grep {
    schema: Arc<Schema>,
    column: usize,
    pattern: String,
    invert: bool,
}

impl Grep {
    pub fn new(input: &Arc<Schema>, column: &str, pattern: &str, invert: bool) -> Result<Self> {
        let column = input.require(column)?;
        Ok(Self {
            schema: Arc::clone(input),
            column,
            pattern: pattern.to_string(),
            invert,
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.field(self.column).contains(self.pattern.as_str()) != self.invert
    }
}

impl RecordStage for Grep {
    fn process(&mut self, record: Record) -> Result<Vec<Record>> {
        if self.matches(&record) {
            Ok(vec![record])
        } else {
            Ok(vec![])
        }
    }

    fn output_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn name(&self) -> &str {
        if self.invert { "grepv" } else { "grep" }
    }
}
