//! Report formatting.
//!
//! Records are rendered with a fixed column set, in this order:
//! `timestamp, event_type, session_id, tool_name, outcome, rule_id, reason`.
//! The JSON form of records is JSON Lines and can be read back by the log
//! reader; the JSON form of stats deserializes back into [`Stats`].

use crate::stats::{EventTypeCount, SessionSummary, Stats};
use hookgate_core::{EventRecord, EventType, Outcome};
use std::fmt;
use std::str::FromStr;

pub const RECORD_COLUMNS: [&str; 7] = [
    "timestamp",
    "event_type",
    "session_id",
    "tool_name",
    "outcome",
    "rule_id",
    "reason",
];

const TABLE_CELL_MAX: usize = 60;

/// Output mode for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable aligned columns.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
    /// Comma-separated values with a header row.
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "json" | "jsonl" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format '{}' (expected table, json or csv)", other)),
        }
    }
}

/// The stable columns of one record.
pub fn record_row(record: &EventRecord) -> [String; 7] {
    let decision = record.decision.as_ref();
    [
        record.timestamp.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        record.event_type.to_string(),
        record.session_id.clone(),
        record.tool_name().unwrap_or_default().to_string(),
        decision.map(|d| d.outcome.to_string()).unwrap_or_default(),
        decision
            .and_then(|d| d.matched_rule_id.clone())
            .unwrap_or_default(),
        decision.and_then(|d| d.reason.clone()).unwrap_or_default(),
    ]
}

/// CSV header line for records, without a trailing newline.
pub fn csv_header() -> String {
    RECORD_COLUMNS.join(",")
}

/// One CSV line for a record, without a trailing newline.
pub fn csv_line(record: &EventRecord) -> String {
    csv_join(&record_row(record))
}

/// One JSON Lines entry for a record, without a trailing newline.
pub fn json_line(record: &EventRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

/// Render records. Every non-empty output ends with a newline.
pub fn format_records(records: &[EventRecord], format: OutputFormat) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            for record in records {
                out.push_str(&json_line(record)?);
                out.push('\n');
            }
        }
        OutputFormat::Csv => {
            out.push_str(&csv_header());
            out.push('\n');
            for record in records {
                out.push_str(&csv_line(record));
                out.push('\n');
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                out.push_str("No records found.\n");
            } else {
                let header = RECORD_COLUMNS.map(|c| c.to_uppercase());
                let rows: Vec<[String; 7]> = records
                    .iter()
                    .map(|r| record_row(r).map(|cell| compact(&cell)))
                    .collect();
                out.push_str(&render_table(&header, &rows));
            }
        }
    }
    Ok(out)
}

/// Render aggregate statistics.
pub fn format_stats(stats: &Stats, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(stats)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Csv => Ok(stats_csv(stats)),
        OutputFormat::Table => Ok(stats_table(stats)),
    }
}

fn stats_csv(stats: &Stats) -> String {
    let mut out = String::from("section,key,count\n");
    let mut row = |section: &str, key: &str, count: usize| {
        out.push_str(&csv_join(&[section.to_string(), key.to_string(), count.to_string()]));
        out.push('\n');
    };

    row("summary", "total", stats.total);
    row("summary", "parse_errors", stats.parse_errors);
    row("summary", "distinct_sessions", stats.distinct_sessions);
    for entry in &stats.by_event_type {
        row("event_type", entry.event_type.as_str(), entry.count);
    }
    for entry in &stats.top_tools {
        row("tool", &entry.tool, entry.count);
    }
    for outcome in Outcome::ALL {
        row("decision", outcome.as_str(), stats.decisions.get(outcome));
    }
    out
}

fn stats_table(stats: &Stats) -> String {
    let span = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    let mut out = String::new();
    out.push_str(&format!("Total records:      {}\n", stats.total));
    out.push_str(&format!("Distinct sessions:  {}\n", stats.distinct_sessions));
    out.push_str(&format!("First record:       {}\n", span(stats.first_timestamp)));
    out.push_str(&format!("Last record:        {}\n", span(stats.last_timestamp)));
    if stats.parse_errors > 0 {
        out.push_str(&format!("Skipped (unparseable): {}\n", stats.parse_errors));
    }

    out.push('\n');
    let rows: Vec<[String; 2]> = EventType::ALL
        .iter()
        .map(|t| [t.to_string(), stats.event_type_count(*t).to_string()])
        .collect();
    out.push_str(&render_table(&["EVENT TYPE".to_string(), "COUNT".to_string()], &rows));

    out.push('\n');
    if stats.top_tools.is_empty() {
        out.push_str("No tool usage recorded.\n");
    } else {
        let rows: Vec<[String; 2]> = stats
            .top_tools
            .iter()
            .map(|t| [t.tool.clone(), t.count.to_string()])
            .collect();
        out.push_str(&render_table(&["TOOL".to_string(), "COUNT".to_string()], &rows));
    }

    out.push('\n');
    let rows: Vec<[String; 2]> = Outcome::ALL
        .iter()
        .map(|o| [o.to_string(), stats.decisions.get(*o).to_string()])
        .collect();
    out.push_str(&render_table(&["DECISION".to_string(), "COUNT".to_string()], &rows));

    out
}

/// Render the session listing.
pub fn format_sessions(sessions: &[SessionSummary], format: OutputFormat) -> Result<String, serde_json::Error> {
    let rows: Vec<[String; 4]> = sessions
        .iter()
        .map(|s| {
            [
                s.session_id.clone(),
                s.events.to_string(),
                s.first_seen.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                s.last_seen.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            ]
        })
        .collect();
    let header = ["session_id", "events", "first_seen", "last_seen"].map(String::from);
    format_listing(sessions, &header, &rows, "No sessions found.\n", format)
}

/// Render the event type listing.
pub fn format_event_types(counts: &[EventTypeCount], format: OutputFormat) -> Result<String, serde_json::Error> {
    let rows: Vec<[String; 2]> = counts
        .iter()
        .map(|c| [c.event_type.to_string(), c.count.to_string()])
        .collect();
    let header = ["event_type", "count"].map(String::from);
    format_listing(counts, &header, &rows, "No events found.\n", format)
}

fn format_listing<T: serde::Serialize, const N: usize>(
    items: &[T],
    header: &[String; N],
    rows: &[[String; N]],
    empty: &str,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(items)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Csv => {
            let mut out = csv_join(header);
            out.push('\n');
            for row in rows {
                out.push_str(&csv_join(row));
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Table if rows.is_empty() => Ok(empty.to_string()),
        OutputFormat::Table => Ok(render_table(&header.each_ref().map(|h| h.to_uppercase()), rows)),
    }
}

fn render_table<const N: usize>(header: &[String; N], rows: &[[String; N]]) -> String {
    let mut widths = header.each_ref().map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(rule.join("  ").trim_end());
    out.push('\n');
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Single-line, bounded-width form of a table cell.
fn compact(value: &str) -> String {
    let single: String = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if single.chars().count() <= TABLE_CELL_MAX {
        return single;
    }
    let mut cut: String = single.chars().take(TABLE_CELL_MAX - 3).collect();
    cut.push_str("...");
    cut
}

fn csv_join(fields: &[String]) -> String {
    fields.iter().map(|f| csv_escape(f)).collect::<Vec<_>>().join(",")
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
