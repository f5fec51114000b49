//! SORT / SORTI / SORTF - materializing, stable, multi-key sort.
//!
//! The stage holds every input record until the upstream is exhausted and
//! emits them all on flush. Key columns are compared in order; the first
//! key that differs decides. Records whose keys all tie keep their input
//! order (`slice::sort_by` is stable).
//!
//! Numeric variants never fail on bad input: a value that does not parse
//! sorts after every value that does, and two unparsable values tie on that
//! key so the next key is consulted.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::config::TieBreak;
use crate::error::Result;
use crate::record::Record;
use crate::record_stage::RecordStage;
use crate::schema::Schema;

/// How key values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    /// Raw text, byte-lexicographic.
    Text,
    /// 64-bit signed integer literals.
    Integer,
    /// 64-bit floating point literals.
    Float,
}

impl SortKind {
    pub fn operator_name(self) -> &'static str {
        match self {
            SortKind::Text => "sort",
            SortKind::Integer => "sorti",
            SortKind::Float => "sortf",
        }
    }

    /// Compare two field values under this kind.
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            SortKind::Text => a.as_bytes().cmp(b.as_bytes()),
            SortKind::Integer => compare_parsed(parse_int_literal(a), parse_int_literal(b)),
            SortKind::Float => compare_parsed(float_key(a), float_key(b)),
        }
    }
}

/// Parsed values first, in numeric order; unparsable values last and tied.
/// Callers keep NaN out, so the order is total.
fn compare_parsed<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// NaN has no place in the numeric order; it sorts with the unparsable values.
fn float_key(s: &str) -> Option<f64> {
    parse_float_literal(s).filter(|v| !v.is_nan())
}

fn split_sign(s: &str) -> Option<(bool, &str)> {
    match s.as_bytes().first()? {
        b'-' => Some((true, &s[1..])),
        b'+' => Some((false, &s[1..])),
        _ => Some((false, s)),
    }
}

fn strip_underscores(s: &str) -> String {
    s.chars().filter(|c| *c != '_').collect()
}

/// Parse an integer literal the way source code spells one.
///
/// Accepts an optional sign, then `0x`/`0X` (hex), `0o`/`0O` (octal),
/// `0b`/`0B` (binary), a bare leading `0` (octal) or plain decimal digits.
/// Underscores may separate digits, or follow a base prefix. The value
/// must fit in an `i64`.
pub fn parse_int_literal(s: &str) -> Option<i64> {
    let (negative, body) = split_sign(s)?;

    let lower = body.get(..2).map(str::to_ascii_lowercase);
    let (radix, digits, prefixed) = match lower.as_deref() {
        Some("0x") => (16, &body[2..], true),
        Some("0o") => (8, &body[2..], true),
        Some("0b") => (2, &body[2..], true),
        _ if body.len() > 1 && body.starts_with('0') => (8, &body[1..], true),
        _ => (10, body, false),
    };

    if !underscores_ok(digits, prefixed, |c| c.is_digit(radix)) {
        return None;
    }
    let cleaned = strip_underscores(digits);
    if cleaned.is_empty() || cleaned.starts_with(['+', '-']) {
        return None;
    }
    let signed = if negative {
        format!("-{cleaned}")
    } else {
        cleaned
    };
    i64::from_str_radix(&signed, radix).ok()
}

/// Underscores must sit between two digits, or between a base prefix and
/// a digit.
fn underscores_ok(text: &str, prefixed: bool, is_digit: impl Fn(char) -> bool) -> bool {
    #[derive(PartialEq)]
    enum Prev {
        Start,
        Digit,
        Underscore,
        Other,
    }

    let mut prev = if prefixed { Prev::Digit } else { Prev::Start };
    for c in text.chars() {
        if is_digit(c) {
            prev = Prev::Digit;
        } else if c == '_' {
            if prev != Prev::Digit {
                return false;
            }
            prev = Prev::Underscore;
        } else if prev == Prev::Underscore {
            return false;
        } else {
            prev = Prev::Other;
        }
    }
    prev != Prev::Underscore
}

/// Parse a floating point literal.
///
/// Accepts an optional sign, then decimal or scientific notation, a hex
/// mantissa with a binary exponent (`0x1.8p3`), or `inf`, `infinity`, `nan`
/// in any case. Underscores may separate digits. Values too large for an
/// `f64` do not parse.
pub fn parse_float_literal(s: &str) -> Option<f64> {
    let (negative, body) = split_sign(s)?;
    let signed = body.len() != s.len();
    let lower = body.to_ascii_lowercase();
    let value = match lower.as_str() {
        "inf" | "infinity" => f64::INFINITY,
        "nan" if signed => return None,
        "nan" => return Some(f64::NAN),
        text => {
            let value = match text.strip_prefix("0x") {
                Some(hex) => {
                    if !underscores_ok(hex, true, |c| c.is_ascii_hexdigit()) {
                        return None;
                    }
                    parse_hex_float(&strip_underscores(hex))?
                }
                None => {
                    if !underscores_ok(text, false, |c| c.is_ascii_digit()) {
                        return None;
                    }
                    let cleaned = strip_underscores(text);
                    if cleaned.starts_with(['+', '-']) {
                        return None;
                    }
                    cleaned.parse::<f64>().ok()?
                }
            };
            // Overflow is out of range, not infinity.
            if !value.is_finite() {
                return None;
            }
            value
        }
    };
    Some(if negative { -value } else { value })
}

/// `s` follows the `0x` prefix, lowercased: hex digits with an optional
/// point, then a required `p` exponent in decimal.
fn parse_hex_float(s: &str) -> Option<f64> {
    let (mantissa, exp) = s.split_once('p')?;
    let (whole, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    let exp: i32 = exp.parse().ok()?;
    let mut value = 0.0f64;
    for c in whole.chars().chain(frac.chars()) {
        value = value * 16.0 + f64::from(c.to_digit(16)?);
    }
    if value == 0.0 {
        return Some(0.0);
    }
    let shift = i32::try_from(frac.len()).ok()?.checked_mul(4)?;
    Some(value * 2f64.powi(exp.checked_sub(shift)?))
}

/// The sort stage shared by all three variants.
pub struct Sort {
    schema: Arc<Schema>,
    kind: SortKind,
    keys: Vec<usize>,
    /// Non-key columns, consulted only under `TieBreak::RemainingColumns`.
    rest: Vec<usize>,
    buffer: Vec<Record>,
}

impl Sort {
    pub fn new<S: AsRef<str>>(
        input: &Arc<Schema>,
        columns: &[S],
        kind: SortKind,
        tie_break: TieBreak,
    ) -> Result<Self> {
        let keys = input.require_all(columns)?;
        let rest = match tie_break {
            TieBreak::Stable => Vec::new(),
            TieBreak::RemainingColumns => (0..input.len()).filter(|i| !keys.contains(i)).collect(),
        };
        Ok(Self {
            schema: Arc::clone(input),
            kind,
            keys,
            rest,
            buffer: Vec::new(),
        })
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for &k in &self.keys {
            let ord = self.kind.compare(a.field(k), b.field(k));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        for &i in &self.rest {
            let ord = a.field(i).as_bytes().cmp(b.field(i).as_bytes());
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl RecordStage for Sort {
    fn process(&mut self, record: Record) -> Result<Vec<Record>> {
        self.buffer.push(record);
        Ok(vec![])
    }

    fn flush(&mut self) -> Result<Vec<Record>> {
        let mut rows = std::mem::take(&mut self.buffer);
        rows.sort_by(|a, b| self.compare(a, b));
        Ok(rows)
    }

    fn output_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn name(&self) -> &str {
        self.kind.operator_name()
    }
}
