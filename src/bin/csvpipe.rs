//! CLI tool to run operator directives over CSV data.
//!
//! Usage:
//!   csvpipe [OPTIONS] [DIRECTIVE]...
//!   csvpipe -i people.csv grep name alice sorti amount
//!   csvpipe -i people.csv -p report.pipe -o out/report.csv
//!
//! Reads stdin and writes stdout unless `-i` / `-o` are given.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};
use csvpipe::config::{DEFAULT_PARTITION_FLUSH_ROWS, DEFAULT_QUEUE_DEPTH, TieBreak};
use csvpipe::logging::init_logging;
use csvpipe::{PipelineConfig, PipelineError, execute_pipeline, parse_commands, parse_pipeline_text};

#[derive(Parser, Debug)]
#[command(name = "csvpipe", version, about = "Stream CSV through a chain of operators")]
struct Cli {
    /// Input CSV file (default: stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output CSV file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pipeline file; its directives run before those on the command line
    #[arg(short, long)]
    pipeline: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Rows buffered between two stages
    #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH)]
    queue_depth: usize,

    /// Rows a partition key holds before it is written out
    #[arg(long, default_value_t = DEFAULT_PARTITION_FLUSH_ROWS)]
    partition_flush_rows: usize,

    /// How sorts order rows whose keys tie
    #[arg(long, value_enum, default_value_t = TieBreak::Stable)]
    sort_tie_break: TieBreak,

    /// Operator directives, e.g. `grep name alice sorti amount`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    directives: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("csvpipe: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> csvpipe::Result<()> {
    let mut commands = Vec::new();
    if let Some(path) = &cli.pipeline {
        let text = fs::read_to_string(path).map_err(|e| io_error("read pipeline file", path, e))?;
        commands.extend(parse_pipeline_text(&text)?);
    }
    commands.extend(parse_commands(&cli.directives)?);

    let config = PipelineConfig::new()
        .with_queue_depth(cli.queue_depth)
        .with_partition_flush_rows(cli.partition_flush_rows)
        .with_sort_tie_break(cli.sort_tie_break);

    let input: Box<dyn Read + Send> = match &cli.input {
        Some(path) => {
            let file = File::open(path).map_err(|e| io_error("open", path, e))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin()),
    };

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .map_err(|e| io_error("create output directory", parent, e))?;
            }
            let file = File::create(path).map_err(|e| io_error("create", path, e))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    };

    let summary = execute_pipeline(input, output, &commands, config)?;

    if cli.verbose > 0 {
        match &cli.output {
            Some(path) => eprintln!(
                "Processed {} -> {} rows, output: {}",
                summary.input_rows,
                summary.output_rows,
                path.display()
            ),
            None => eprintln!(
                "Processed {} -> {} rows",
                summary.input_rows, summary.output_rows
            ),
        }
    }
    Ok(())
}

fn io_error(action: &str, path: &Path, source: io::Error) -> PipelineError {
    PipelineError::Io {
        context: format!("{action} {}", path.display()),
        source,
    }
}
