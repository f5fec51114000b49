//! Operator directives and their parsers.
//!
//! A pipeline is an ordered list of directives, each an operator name
//! followed by a fixed number of string arguments:
//!
//! ```text
//! grep COL SUBSTR          grepv COL SUBSTR
//! cut COLS                 shuffle COLS          drop COLS
//! rename FROM_COLS TO_COLS
//! sort COLS                sorti COLS            sortf COLS
//! join FILE SRC,TGT[,SRC,TGT...]
//! compact COLS             (empty string compares every column)
//! save_partitions COLS TEMPLATE
//! ```
//!
//! `COLS` is a comma-separated list of column names.
//!
//! Directives come either from a flat argument vector (the command line)
//! or from pipeline text, which looks like:
//!
//! ```text
//! # keep alice's rows, smallest amount first
//! grep name alice
//! | sorti amount
//! | save_partitions name "out/%s.csv"
//! ?
//! ```
//!
//! - Lines starting with `#` are comments
//! - A leading `|` and a trailing `?` are ignored
//! - Double-quoted tokens may contain spaces, `\"` and `\\`

use std::path::PathBuf;

use crate::error::{PipelineError, Result};
use crate::stages::SortKind;

/// Parsed pipeline directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// cut COLS
    Cut { columns: Vec<String> },
    /// shuffle COLS
    Shuffle { leading: Vec<String> },
    /// drop COLS
    Drop { columns: Vec<String> },
    /// rename FROM_COLS TO_COLS
    Rename { from: Vec<String>, to: Vec<String> },
    /// grep COL SUBSTR
    Grep { column: String, pattern: String },
    /// grepv COL SUBSTR
    Grepv { column: String, pattern: String },
    /// sort / sorti / sortf COLS
    Sort { columns: Vec<String>, kind: SortKind },
    /// join FILE SRC,TGT[,...]
    Join {
        path: PathBuf,
        pairs: Vec<(String, String)>,
    },
    /// compact COLS; `None` compares every column
    Compact { columns: Option<Vec<String>> },
    /// save_partitions COLS TEMPLATE
    SavePartitions {
        columns: Vec<String>,
        template: String,
    },
}

impl Command {
    /// Operator name as written in a directive.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Cut { .. } => "cut",
            Command::Shuffle { .. } => "shuffle",
            Command::Drop { .. } => "drop",
            Command::Rename { .. } => "rename",
            Command::Grep { .. } => "grep",
            Command::Grepv { .. } => "grepv",
            Command::Sort { kind, .. } => kind.operator_name(),
            Command::Join { .. } => "join",
            Command::Compact { .. } => "compact",
            Command::SavePartitions { .. } => "save_partitions",
        }
    }
}

/// Parse a flat argument vector into directives.
pub fn parse_commands<S: AsRef<str>>(args: &[S]) -> Result<Vec<Command>> {
    let mut args = args.iter().map(AsRef::<str>::as_ref);
    let mut commands = Vec::new();
    while let Some(op) = args.next() {
        commands.push(parse_command(op, &mut args)?);
    }
    Ok(commands)
}

/// Parse pipeline text into directives.
///
/// Errors carry the 1-based line number they were found on.
pub fn parse_pipeline_text(text: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix('|').map(str::trim).unwrap_or(line);
        let line = line.trim_end_matches('?').trim();
        if line.is_empty() {
            continue;
        }

        let at_line = |message: String| PipelineError::Syntax {
            line: line_num + 1,
            message,
        };
        let tokens = tokenize(line).map_err(at_line)?;
        let parsed = parse_commands(&tokens).map_err(|e| at_line(e.to_string()))?;
        commands.extend(parsed);
    }

    Ok(commands)
}

/// Split one line into whitespace-separated tokens, honouring double quotes.
fn tokenize(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            '\\' if in_quotes => match chars.next() {
                Some(e @ ('"' | '\\')) => current.push(e),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse one directive, pulling its arguments from `args`.
fn parse_command<'a>(op: &str, args: &mut impl Iterator<Item = &'a str>) -> Result<Command> {
    let mut next = |argument: &'static str| {
        args.next()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::MissingArgument {
                operator: op.to_string(),
                argument,
            })
    };

    let cmd = match op {
        "cut" => Command::Cut {
            columns: required_list(op, &next("columns")?)?,
        },
        "shuffle" => Command::Shuffle {
            leading: required_list(op, &next("columns")?)?,
        },
        "drop" => Command::Drop {
            columns: required_list(op, &next("columns")?)?,
        },
        "rename" => {
            let from = required_list(op, &next("from-columns")?)?;
            let to = required_list(op, &next("to-columns")?)?;
            if from.len() != to.len() {
                return Err(PipelineError::invalid(
                    op,
                    format!("{} source column(s) but {} new name(s)", from.len(), to.len()),
                ));
            }
            Command::Rename { from, to }
        }
        "grep" | "grepv" => {
            let column = next("column")?;
            let pattern = next("substring")?;
            if op == "grep" {
                Command::Grep { column, pattern }
            } else {
                Command::Grepv { column, pattern }
            }
        }
        "sort" | "sorti" | "sortf" => {
            let kind = match op {
                "sorti" => SortKind::Integer,
                "sortf" => SortKind::Float,
                _ => SortKind::Text,
            };
            Command::Sort {
                columns: required_list(op, &next("columns")?)?,
                kind,
            }
        }
        "join" => {
            let path = PathBuf::from(next("file")?);
            let pairs = parse_join_pairs(&next("column-pairs")?)?;
            Command::Join { path, pairs }
        }
        "compact" => {
            let columns = parse_column_list(&next("columns")?);
            Command::Compact {
                columns: (!columns.is_empty()).then_some(columns),
            }
        }
        "save_partitions" => {
            let columns = required_list(op, &next("columns")?)?;
            let template = next("template")?;
            Command::SavePartitions { columns, template }
        }
        other => return Err(PipelineError::UnknownOperator(other.to_string())),
    };
    Ok(cmd)
}

/// Split a comma-separated column list. The empty string is the empty list.
pub fn parse_column_list(arg: &str) -> Vec<String> {
    if arg.is_empty() {
        return Vec::new();
    }
    arg.split(',').map(str::to_string).collect()
}

fn required_list(op: &str, arg: &str) -> Result<Vec<String>> {
    let columns = parse_column_list(arg);
    if columns.is_empty() {
        return Err(PipelineError::invalid(op, "expected at least one column"));
    }
    Ok(columns)
}

/// `SRC,TGT[,SRC,TGT...]` into `(source, target)` pairs.
fn parse_join_pairs(arg: &str) -> Result<Vec<(String, String)>> {
    let columns = required_list("join", arg)?;
    if columns.len() % 2 != 0 {
        return Err(PipelineError::invalid(
            "join",
            format!("column pairs need an even number of names, got {}", columns.len()),
        ));
    }
    Ok(columns
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}
