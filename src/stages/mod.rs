//! Stage implementations.

pub mod compact;
pub mod filter;
pub mod join;
pub mod partition;
pub mod project;
pub mod sort;

pub use compact::Compact;
pub use filter::Grep;
pub use join::{Join, SideTable};
pub use partition::{PathTemplate, SavePartitions};
pub use project::{Cut, DropColumns, rename_schema};
pub use sort::{Sort, SortKind, parse_float_literal, parse_int_literal};

/// Remove repeated names, keeping the first occurrence of each.
pub(crate) fn dedup_columns<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(columns.len());
    for c in columns {
        let c = c.as_ref();
        if !out.iter().any(|o| o == c) {
            out.push(c.to_string());
        }
    }
    out
}
