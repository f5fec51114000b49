//! Row type shared by every stage.

/// One row of text fields.
///
/// Field `i` always belongs to column `i` of the schema of the stream the
/// record travels on. Records are never edited in place: a stage that
/// changes the field layout builds a new record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Build a record from string slices.
    pub fn from_strs(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Field at position `idx`.
    ///
    /// # Panics
    /// Panics if `idx` is outside the record; positions come from the
    /// stream's schema, so this only happens on a width mismatch.
    pub fn field(&self, idx: usize) -> &str {
        &self.fields[idx]
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<String>> for Record {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl From<&csv::StringRecord> for Record {
    fn from(rec: &csv::StringRecord) -> Self {
        Self {
            fields: rec.iter().map(str::to_string).collect(),
        }
    }
}
