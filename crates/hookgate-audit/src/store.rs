//! Log store layout.
//!
//! Every record is appended to three views under one root directory:
//!
//! ```text
//! <root>/all_events.jsonl               every record
//! <root>/daily/YYYY-MM-DD.jsonl         records of one UTC day
//! <root>/events/<event_type>.jsonl      records of one event type
//! ```

use crate::error::FilterError;
use chrono::NaiveDate;
use hookgate_core::EventType;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const ALL_EVENTS_FILE: &str = "all_events.jsonl";
const DAILY_DIR: &str = "daily";
const EVENTS_DIR: &str = "events";
const VIEW_EXTENSION: &str = "jsonl";

/// Handle to a log root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStore {
    root: PathBuf,
}

impl LogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn all_events_path(&self) -> PathBuf {
        self.root.join(ALL_EVENTS_FILE)
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.root
            .join(DAILY_DIR)
            .join(format!("{}.{}", date.format("%Y-%m-%d"), VIEW_EXTENSION))
    }

    pub fn event_type_path(&self, event_type: EventType) -> PathBuf {
        self.root
            .join(EVENTS_DIR)
            .join(format!("{}.{}", event_type.slug(), VIEW_EXTENSION))
    }

    /// The three views a record of `event_type` stamped on `date` belongs to,
    /// in lock order.
    pub fn views_for(&self, date: NaiveDate, event_type: EventType) -> Vec<PathBuf> {
        let mut views = vec![
            self.all_events_path(),
            self.daily_path(date),
            self.event_type_path(event_type),
        ];
        views.sort();
        views
    }

    /// Resolve a view reference to a file path.
    pub fn path_for(&self, view: &ViewRef) -> PathBuf {
        match view {
            ViewRef::All => self.all_events_path(),
            ViewRef::Daily(date) => self.daily_path(*date),
            ViewRef::EventType(event_type) => self.event_type_path(*event_type),
            ViewRef::Path(path) => path.clone(),
        }
    }

    /// Days that have a daily view, oldest first.
    pub fn daily_dates(&self) -> std::io::Result<Vec<NaiveDate>> {
        let dir = self.root.join(DAILY_DIR);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VIEW_EXTENSION) {
                continue;
            }
            if let Some(date) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}

/// Which view to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewRef {
    /// The combined view.
    All,
    /// One UTC day.
    Daily(NaiveDate),
    /// One event type.
    EventType(EventType),
    /// An arbitrary file in view format.
    Path(PathBuf),
}

impl fmt::Display for ViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Daily(date) => write!(f, "daily:{}", date.format("%Y-%m-%d")),
            Self::EventType(event_type) => write!(f, "type:{}", event_type),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for ViewRef {
    type Err = FilterError;

    /// Parse `all`, `daily:YYYY-MM-DD`, `type:<EventType>`, or a file path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FilterError::InvalidView {
            value: s.to_string(),
        };

        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if let Some(date) = s.strip_prefix("daily:") {
            return NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map(Self::Daily)
                .map_err(|_| invalid());
        }
        if let Some(event_type) = s.strip_prefix("type:") {
            return event_type.parse().map(Self::EventType).map_err(|_| invalid());
        }
        if s.trim().is_empty() {
            return Err(invalid());
        }
        Ok(Self::Path(PathBuf::from(s)))
    }
}
