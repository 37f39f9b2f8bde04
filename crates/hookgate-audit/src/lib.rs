//! # hookgate-audit
//!
//! Event history for hookgate.
//!
//! This crate provides functionality for:
//! - Recording lifecycle events to three redundant JSON Lines views
//! - Reading views back, tolerating malformed and truncated records
//! - Filtering records and aggregating statistics
//! - Rendering reports as tables, JSON or CSV
//!
//! ## Log Layout
//!
//! | View | Contents |
//! |------|----------|
//! | `all_events.jsonl` | every record |
//! | `daily/YYYY-MM-DD.jsonl` | records stamped on one UTC day |
//! | `events/<event_type>.jsonl` | records of one event type |
//!
//! Writers lock every view of a record before stamping it, so concurrent
//! hook processes never interleave lines and timestamps never go backwards
//! within a view.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hookgate_audit::{EventRecorder, FilterCriteria, LogReader, LogStore, ViewRef, aggregate, filter};
//! use hookgate_core::{EventRecord, EventType, LogConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = EventRecorder::new(LogConfig::default());
//! recorder.record(EventRecord::new(EventType::SessionStart, "session-1", Default::default()))?;
//!
//! let reader = LogReader::new(LogStore::new("logs"));
//! let criteria = FilterCriteria::new().event_type(EventType::SessionStart);
//! let stats = aggregate(filter(reader.read(&[ViewRef::All])?, &criteria), 10);
//! println!("{} sessions started", stats.total);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod reader;
pub mod recorder;
pub mod report;
pub mod stats;
pub mod storage;
pub mod store;

pub use error::{FilterError, ParseError, ReadError, RecordError, ViewWriteError};
pub use filter::{FilterCriteria, FilterQuery, filter};
pub use reader::{AccumulatorState, LogReader, RecordAccumulator, RecordStream};
pub use recorder::EventRecorder;
pub use report::{OutputFormat, format_event_types, format_records, format_sessions, format_stats};
pub use stats::{
    DecisionCounts, EventTypeCount, SessionSummary, Stats, StatsAccumulator, ToolCount, aggregate,
    list_event_types, list_sessions,
};
pub use storage::{ConsoleStorage, DualStorage, EventStorage, NullStorage, ViewStorage};
pub use store::{LogStore, ViewRef};
