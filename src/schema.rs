//! Column layout of a record stream.

use std::collections::HashSet;

use crate::error::{PipelineError, Result};

/// Ordered set of unique column names.
///
/// A schema is never changed after a stage publishes it; stages that alter
/// the layout build a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Create a schema, rejecting duplicate column names.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(PipelineError::DuplicateColumn(col.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Convenience constructor for literal column lists.
    pub fn from_strs(columns: &[&str]) -> Result<Self> {
        Self::new(columns.iter().map(|c| c.to_string()).collect())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of `name`, or `ColumnNotFound`.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.index_of(name)
            .ok_or_else(|| PipelineError::ColumnNotFound(name.to_string()))
    }

    /// Positions of every name in `names`, failing on the first missing one.
    pub fn require_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names.iter().map(|n| self.require(n.as_ref())).collect()
    }
}
