//! Runtime knobs shared by every stage of a pipeline.

/// Default number of rows buffered between two stages.
pub const DEFAULT_QUEUE_DEPTH: usize = 100;

/// Default number of rows a partition key holds before it is written out.
pub const DEFAULT_PARTITION_FLUSH_ROWS: usize = 1000;

/// What the sort stages do once every key column compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TieBreak {
    /// Keep input order.
    #[default]
    Stable,
    /// Compare the non-key columns left to right as raw text, then keep
    /// input order.
    RemainingColumns,
}

/// Pipeline-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of each inter-stage queue. Zero means rendezvous hand-off.
    pub queue_depth: usize,
    /// A partition buffer is flushed once it holds more rows than this.
    pub partition_flush_rows: usize,
    pub sort_tie_break: TieBreak,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            partition_flush_rows: DEFAULT_PARTITION_FLUSH_ROWS,
            sort_tie_break: TieBreak::Stable,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_partition_flush_rows(mut self, rows: usize) -> Self {
        self.partition_flush_rows = rows;
        self
    }

    pub fn with_sort_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.sort_tie_break = tie_break;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PipelineConfig::new();
        assert_eq!(cfg.queue_depth, 100);
        assert_eq!(cfg.partition_flush_rows, 1000);
        assert_eq!(cfg.sort_tie_break, TieBreak::Stable);
    }

    #[test]
    fn test_builder() {
        let cfg = PipelineConfig::new()
            .with_queue_depth(0)
            .with_partition_flush_rows(2)
            .with_sort_tie_break(TieBreak::RemainingColumns);
        assert_eq!(cfg.queue_depth, 0);
        assert_eq!(cfg.partition_flush_rows, 2);
        assert_eq!(cfg.sort_tie_break, TieBreak::RemainingColumns);
    }
}
