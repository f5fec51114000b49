//! JOIN - inner equi-join against a side table held in memory.
//!
//! The side table is read in full when the stage is built, before any row
//! flows. Matching uses a hash index on the side table's target columns;
//! each index entry lists side rows in file order, so output order is
//! primary order outer, side-table order inner.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{PipelineError, Result};
use crate::record::Record;
use crate::record_stage::RecordStage;
use crate::schema::Schema;

/// A fully materialized auxiliary table.
#[derive(Debug, Clone)]
pub struct SideTable {
    pub schema: Schema,
    pub rows: Vec<Record>,
}

impl SideTable {
    /// Load a CSV file: header row, then records.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| PipelineError::io(format!("open {}", path.display()), e))?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Load a CSV table from any reader; `label` names it in errors.
    pub fn from_reader<R: Read>(reader: R, label: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let header = rdr
            .headers()
            .map_err(|e| PipelineError::csv(format!("read header of {label}"), e))?;
        if header.is_empty() {
            return Err(PipelineError::EmptyInput(label.to_string()));
        }
        let schema = Schema::new(header.iter().map(str::to_string).collect())?;

        let mut rows = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec.map_err(|e| PipelineError::csv(format!("{label} (row {})", i + 1), e))?;
            rows.push(Record::from(&rec));
        }
        Ok(Self { schema, rows })
    }
}

/// Inner equi-join of the upstream against a [`SideTable`].
pub struct Join {
    schema: Arc<Schema>,
    /// Primary-side key positions, one per column pair.
    source_keys: Vec<usize>,
    /// Side columns appended to each output row.
    carried: Vec<usize>,
    side_rows: Vec<Record>,
    index: HashMap<Vec<String>, Vec<usize>>,
}

impl Join {
    /// Load `path` and join on `pairs` of `(source column, target column)`.
    pub fn open(input: &Schema, path: &Path, pairs: &[(String, String)]) -> Result<Self> {
        let side = SideTable::load(path)?;
        info!(
            path = %path.display(),
            rows = side.rows.len(),
            "loaded join side table"
        );
        Self::new(input, side, pairs)
    }

    pub fn new(input: &Schema, side: SideTable, pairs: &[(String, String)]) -> Result<Self> {
        let mut source_keys = Vec::with_capacity(pairs.len());
        let mut target_keys = Vec::with_capacity(pairs.len());
        for (source, target) in pairs {
            source_keys.push(input.require(source)?);
            target_keys.push(side.schema.require(target)?);
        }

        let carried: Vec<usize> = (0..side.schema.len())
            .filter(|i| !target_keys.contains(i))
            .collect();
        let mut columns = input.columns().to_vec();
        columns.extend(carried.iter().map(|&i| side.schema.columns()[i].clone()));
        let schema = Arc::new(Schema::new(columns)?);

        let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (pos, row) in side.rows.iter().enumerate() {
            let key = target_keys.iter().map(|&k| row.field(k).to_string()).collect();
            index.entry(key).or_default().push(pos);
        }

        Ok(Self {
            schema,
            source_keys,
            carried,
            side_rows: side.rows,
            index,
        })
    }
}

impl RecordStage for Join {
    fn process(&mut self, record: Record) -> Result<Vec<Record>> {
        let key: Vec<String> = self
            .source_keys
            .iter()
            .map(|&k| record.field(k).to_string())
            .collect();
        let Some(matches) = self.index.get(&key) else {
            return Ok(vec![]);
        };

        let out = matches
            .iter()
            .map(|&pos| {
                let side = &self.side_rows[pos];
                let mut fields = Vec::with_capacity(self.schema.len());
                fields.extend_from_slice(record.fields());
                fields.extend(self.carried.iter().map(|&i| side.field(i).to_string()));
                Record::new(fields)
            })
            .collect();
        Ok(out)
    }

    fn output_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn name(&self) -> &str {
        "join"
    }
}
