//! Console rendering of statement results.
//!
//! Scripts use single-column results named `info` or `status` to print
//! section banners and messages; everything else is printed as a pipe
//! separated table.

use chrono::{DateTime, NaiveTime};
use duckdb::types::{TimeUnit, Value};
use std::io::{self, Write};

/// Upper bound for the dashed rule under a table header.
const MAX_RULE_WIDTH: usize = 80;
/// Lower bound for the dashed rule under a table header.
const MIN_RULE_WIDTH: usize = 40;

/// Rows returned by one statement, already converted to display strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Name of the only column, if the result has exactly one.
    fn single_column(&self) -> Option<&str> {
        match self.columns.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    fn first_cell(&self) -> &str {
        self.rows
            .first()
            .and_then(|row| row.first())
            .map(|cell| cell.as_str())
            .unwrap_or("")
    }
}

/// Write a result set to `out`. Empty results print nothing.
pub fn render<W: Write>(out: &mut W, result: &ResultSet) -> io::Result<()> {
    if result.is_empty() {
        return Ok(());
    }

    match result.single_column() {
        Some(name) if name.eq_ignore_ascii_case("info") => {
            let text = result.first_cell();
            if text.starts_with("===") {
                writeln!(out)?;
                writeln!(out, "{}", text)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{}", text)?;
            }
        }
        Some(name) if name.eq_ignore_ascii_case("status") => {
            writeln!(out, "{}", result.first_cell())?;
            writeln!(out)?;
        }
        _ => {
            if !result.columns.is_empty() {
                let header = result.columns.join(" | ");
                let width = header.chars().count().max(MIN_RULE_WIDTH).min(MAX_RULE_WIDTH);
                writeln!(out, "{}", header)?;
                writeln!(out, "{}", "-".repeat(width))?;
            }
            for row in &result.rows {
                writeln!(out, "{}", row.join(" | "))?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Human readable form of a DuckDB value.
#[allow(unreachable_patterns)]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::TinyInt(n) => n.to_string(),
        Value::SmallInt(n) => n.to_string(),
        Value::Int(n) => n.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::HugeInt(n) => n.to_string(),
        Value::UHugeInt(n) => n.to_string(),
        Value::UTinyInt(n) => n.to_string(),
        Value::USmallInt(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::UBigInt(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(f) => f.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => s.clone(),
        Value::Enum(s) => s.clone(),
        Value::Blob(bytes) => bytes.iter().map(|b| format!("\\x{:02X}", b)).collect(),
        Value::Date32(days) => format_date(*days),
        Value::Timestamp(unit, ts) => format_timestamp(*unit, *ts),
        Value::Time64(unit, t) => format_time(*unit, *t),
        Value::Interval { months, days, nanos } => {
            format!("{} months {} days {} us", months, days, nanos / 1_000)
        }
        Value::List(items) | Value::Array(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Struct(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        Value::Map(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}={}", format_value(k), format_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        Value::Union(inner) => format_value(inner),
        other => format!("{:?}", other),
    }
}

/// Like [`format_value`], with a `+00` offset on timestamps.
///
/// For columns whose type carries a time zone; the stored instant is UTC.
pub fn format_zoned_value(value: &Value) -> String {
    match value {
        Value::Timestamp(unit, ts) => format!("{}+00", format_timestamp(*unit, *ts)),
        other => format_value(other),
    }
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn format_date(days: i32) -> String {
    DateTime::from_timestamp(i64::from(days) * 86_400, 0)
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_else(|| days.to_string())
}

fn format_timestamp(unit: TimeUnit, value: i64) -> String {
    DateTime::from_timestamp_micros(to_micros(unit, value))
        .map(|dt| dt.naive_utc().to_string())
        .unwrap_or_else(|| value.to_string())
}

fn format_time(unit: TimeUnit, value: i64) -> String {
    let micros = to_micros(unit, value);
    let secs = u32::try_from(micros.div_euclid(1_000_000)).unwrap_or(0);
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).unwrap_or(0);
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .map(|t| t.to_string())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(result: &ResultSet) -> String {
        let mut out = Vec::new();
        render(&mut out, result).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn single(column: &str, cell: &str) -> ResultSet {
        ResultSet {
            columns: vec![column.to_string()],
            rows: vec![vec![cell.to_string()]],
        }
    }

    #[test]
    fn test_render_banner_info() {
        assert_eq!(rendered(&single("info", "=== SNAPSHOTS ===")), "\n=== SNAPSHOTS ===\n\n");
    }

    #[test]
    fn test_render_plain_info() {
        assert_eq!(rendered(&single("INFO", "Loading files")), "Loading files\n");
    }

    #[test]
    fn test_render_status() {
        assert_eq!(rendered(&single("status", "Compaction done")), "Compaction done\n\n");
    }

    #[test]
    fn test_render_table() {
        let result = ResultSet {
            columns: vec!["table_name".to_string(), "rows".to_string()],
            rows: vec![
                vec!["orders".to_string(), "150".to_string()],
                vec!["lineitem".to_string(), "600".to_string()],
            ],
        };
        let expected = format!(
            "table_name | rows\n{}\norders | 150\nlineitem | 600\n\n",
            "-".repeat(40)
        );
        assert_eq!(rendered(&result), expected);
    }

    #[test]
    fn test_render_single_other_column_is_table() {
        let text = rendered(&single("count_star()", "42"));
        assert!(text.starts_with("count_star()\n----"));
        assert!(text.contains("\n42\n"));
    }

    #[test]
    fn test_render_wide_header_rule_is_capped() {
        let columns: Vec<String> = (0..20).map(|i| format!("column_{}", i)).collect();
        let result = ResultSet {
            rows: vec![vec!["x".to_string(); columns.len()]],
            columns,
        };
        let text = rendered(&result);
        let rule = text.lines().nth(1).unwrap();
        assert_eq!(rule.len(), 80);
    }

    #[test]
    fn test_render_empty_prints_nothing() {
        let result = ResultSet {
            columns: vec!["info".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(rendered(&result), "");
    }

    #[test]
    fn test_format_values() {
        assert_eq!(format_value(&Value::Null), "NULL");
        assert_eq!(format_value(&Value::BigInt(7)), "7");
        assert_eq!(format_value(&Value::Text("abc".to_string())), "abc");
        assert_eq!(format_value(&Value::Date32(0)), "1970-01-01");
        assert_eq!(format_value(&Value::Date32(8035)), "1992-01-01");
        assert_eq!(
            format_value(&Value::Timestamp(TimeUnit::Second, 86_400 + 3_661)),
            "1970-01-02 01:01:01"
        );
        assert_eq!(format_value(&Value::Time64(TimeUnit::Microsecond, 3_600_000_000)), "01:00:00");
        assert_eq!(
            format_value(&Value::List(vec![Value::Int(1), Value::Int(2)])),
            "[1, 2]"
        );
        assert_eq!(
            format_value(&Value::UHugeInt(u128::MAX)),
            "340282366920938463463374607431768211455"
        );
    }

    #[test]
    fn test_format_zoned_value() {
        assert_eq!(
            format_zoned_value(&Value::Timestamp(TimeUnit::Microsecond, 1_500_000)),
            "1970-01-01 00:00:01.500+00"
        );
        assert_eq!(format_zoned_value(&Value::Int(3)), "3");
        assert_eq!(format_zoned_value(&Value::Null), "NULL");
    }
}
