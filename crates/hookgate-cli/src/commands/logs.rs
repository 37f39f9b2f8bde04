//! `hookgate logs` command implementation.
//!
//! Queries recorded history: filters, statistics, listings and exports.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use hookgate_audit::report::{csv_header, csv_line, json_line};
use hookgate_audit::{
    FilterCriteria, FilterQuery, LogReader, LogStore, OutputFormat, StatsAccumulator, ViewRef, filter,
    format_event_types, format_records, format_sessions, format_stats, list_event_types, list_sessions,
};
use hookgate_core::EventRecord;
use std::collections::VecDeque;
use std::io::Write;

use crate::settings::Settings;

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Show aggregate statistics instead of records
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    /// List the sessions found in the matching records
    #[arg(long, default_value_t = false, conflicts_with_all = ["stats", "events"])]
    pub sessions: bool,

    /// List the event types found in the matching records, with counts
    #[arg(long, default_value_t = false, conflicts_with = "stats")]
    pub events: bool,

    /// Only records from the last N hours
    #[arg(long)]
    pub hours: Option<f64>,

    /// Only records at or after this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Only records before this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,

    /// Only records of this event type (e.g. PreToolUse)
    #[arg(long = "event-type")]
    pub event_type: Option<String>,

    /// Only records for this tool
    #[arg(long)]
    pub tool: Option<String>,

    /// Only records from this session
    #[arg(long)]
    pub session: Option<String>,

    /// Number of tools listed in statistics
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Show only the last N matching records
    #[arg(long)]
    pub limit: Option<usize>,

    /// View to read: all, daily:YYYY-MM-DD, type:<EventType> or a file path.
    /// Repeat to read several views back to back.
    #[arg(long = "view", default_value = "all")]
    pub views: Vec<ViewRef>,

    /// Output format: table, json or csv
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

impl LogsArgs {
    fn query(&self) -> FilterQuery {
        FilterQuery {
            hours: self.hours,
            since: self.since.clone(),
            until: self.until.clone(),
            event_type: self.event_type.clone(),
            tool: self.tool.clone(),
            session: self.session.clone(),
        }
    }
}

/// Run the `hookgate logs` command.
pub fn run(settings: &Settings, args: &LogsArgs) -> Result<()> {
    let config = settings.load_config().context("Failed to load configuration")?;
    let store = LogStore::new(settings.log_config(&config).directory);
    let criteria = FilterCriteria::from_query(&args.query(), Utc::now())?;

    tracing::debug!(root = %store.root().display(), views = ?args.views, "Querying logs");
    let reader = LogReader::new(store);
    let mut stream = reader.read(&args.views)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.sessions {
        let sessions = list_sessions(filter(stream.by_ref(), &criteria));
        out.write_all(format_sessions(&sessions, args.format)?.as_bytes())?;
        return Ok(());
    }

    if args.events {
        let counts = list_event_types(filter(stream.by_ref(), &criteria));
        out.write_all(format_event_types(&counts, args.format)?.as_bytes())?;
        return Ok(());
    }

    if args.stats {
        let mut acc = StatsAccumulator::new();
        for record in filter(stream.by_ref(), &criteria) {
            acc.observe(&record);
        }
        let stats = acc.finish(args.top, stream.parse_errors());
        out.write_all(format_stats(&stats, args.format)?.as_bytes())?;
        return Ok(());
    }

    match (args.format, args.limit) {
        (OutputFormat::Table, _) | (_, Some(_)) => {
            let records = last_n(filter(stream.by_ref(), &criteria), args.limit);
            out.write_all(format_records(&records, args.format)?.as_bytes())?;
        }
        (OutputFormat::Json, None) => {
            for record in filter(stream.by_ref(), &criteria) {
                writeln!(out, "{}", json_line(&record)?)?;
            }
        }
        (OutputFormat::Csv, None) => {
            writeln!(out, "{}", csv_header())?;
            for record in filter(stream.by_ref(), &criteria) {
                writeln!(out, "{}", csv_line(&record))?;
            }
        }
    }
    out.flush()?;

    if stream.parse_errors() > 0 {
        eprintln!("Skipped {} unparseable record(s)", stream.parse_errors());
    }

    Ok(())
}

/// Keep the last `limit` records (all of them when unset).
fn last_n(records: impl Iterator<Item = EventRecord>, limit: Option<usize>) -> Vec<EventRecord> {
    let Some(limit) = limit else {
        return records.collect();
    };

    let mut window = VecDeque::with_capacity(limit.min(1024));
    for record in records {
        if window.len() == limit {
            window.pop_front();
        }
        if limit > 0 {
            window.push_back(record);
        }
    }
    window.into()
}
