//! # csvpipe
//!
//! A command-composable streaming transformer for CSV data.
//!
//! A pipeline is a chain of operators applied to one record stream. Every
//! operator runs on its own worker thread, connected to its neighbours by
//! bounded queues, so a slow stage throttles the stages feeding it.
//!
//! ## Overview
//!
//! - **Projection**: `cut`, `shuffle`, `drop`, `rename`
//! - **Filtering**: `grep`, `grepv` (substring match on one column)
//! - **Sorting**: `sort`, `sorti`, `sortf` (stable, multi-key)
//! - **Joining**: `join` (inner equi-join against a side table)
//! - **Deduplication**: `compact` (adjacent duplicates)
//! - **Fan-out**: `save_partitions` (pass-through plus keyed output files)
//!
//! Every directive is checked against the schema flowing into it before
//! any row moves, so a bad column name fails the build, not the run.
//!
//! ## Example
//!
//! ```
//! use csvpipe::{PipelineConfig, execute_pipeline, parse_commands};
//!
//! let input = "id,name,amount\n1,alice,30\n2,bob,20\n1,alice,10\n";
//! let commands = parse_commands(&["grep", "name", "alice", "sorti", "amount"]).unwrap();
//!
//! let mut out = Vec::new();
//! execute_pipeline(input.as_bytes(), &mut out, &commands, PipelineConfig::default()).unwrap();
//!
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     "id,name,amount\n1,alice,10\n1,alice,30\n"
//! );
//! ```

pub mod config;
pub mod dsl;
pub mod error;
pub mod executor;
pub mod logging;
pub mod node;
pub mod pipeline;
pub mod record;
pub mod record_stage;
pub mod schema;
pub mod stages;

pub use config::{PipelineConfig, TieBreak};
pub use dsl::{Command, parse_column_list, parse_commands, parse_pipeline_text};
pub use error::{PipelineError, Result};
pub use node::{Node, StageStats, Worker};
pub use pipeline::{Pipeline, RunSummary, execute_pipeline};
pub use record::Record;
pub use record_stage::{RecordStage, command_to_record_stage};
pub use schema::Schema;
pub use stages::SortKind;
