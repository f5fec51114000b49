//! COMPACT - drop records that repeat the previously emitted one.

use std::sync::Arc;

use crate::error::Result;
use crate::record::Record;
use crate::record_stage::RecordStage;
use crate::schema::Schema;

/// Adjacent-duplicate suppression over a subset of columns.
///
/// Each record is compared with the last record this stage emitted; it is
/// emitted once if any compared column differs, and suppressed otherwise.
pub struct Compact {
    schema: Arc<Schema>,
    compared: Vec<usize>,
    last: Option<Record>,
}

impl Compact {
    /// `columns` of `None` (or an empty list) compares every column.
    pub fn new<S: AsRef<str>>(input: &Arc<Schema>, columns: Option<&[S]>) -> Result<Self> {
        let compared = match columns {
            Some(cols) if !cols.is_empty() => input.require_all(cols)?,
            _ => (0..input.len()).collect(),
        };
        Ok(Self {
            schema: Arc::clone(input),
            compared,
            last: None,
        })
    }

    fn is_repeat(&self, record: &Record) -> bool {
        match &self.last {
            Some(prev) => self
                .compared
                .iter()
                .all(|&i| prev.field(i) == record.field(i)),
            None => false,
        }
    }
}

impl RecordStage for Compact {
    fn process(&mut self, record: Record) -> Result<Vec<Record>> {
        if self.is_repeat(&record) {
            return Ok(vec![]);
        }
        self.last = Some(record.clone());
        Ok(vec![record])
    }

    fn output_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn name(&self) -> &str {
        "compact"
    }
}
