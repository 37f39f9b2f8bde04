//! Log reader.
//!
//! Views are normally JSON Lines, but the reader also accepts pretty-printed
//! multi-line records, blank lines and JSON array framing (`[`, `]`, trailing
//! commas). Malformed or truncated records are counted and skipped; they
//! never abort a read.

use crate::error::{ParseError, ReadError};
use crate::store::{LogStore, ViewRef};
use hookgate_core::EventRecord;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// How every compactly written record begins.
const RECORD_START: &str = r#"{"event_id":""#;
const UUID_LEN: usize = 36;
const AFTER_EVENT_ID: &str = r#"","event_type":""#;

/// Where the accumulator is between lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    /// Between records.
    Idle,
    /// Inside a record that has not closed yet.
    Accumulating,
    /// The last record closed and parsed.
    Complete,
    /// The last record or line was rejected.
    Error,
}

/// Line-fed state machine that reassembles records from a view.
///
/// A record starts at `{` and ends when its braces balance again; braces
/// inside strings are ignored. A `{` at the start of a line while a record
/// is still open means that record was cut short by a writer that died
/// mid-line: it is reported as truncated and the new record starts. The
/// same happens when the next writer appended directly after the cut, so
/// that a new record begins in the middle of the open one.
#[derive(Debug)]
pub struct RecordAccumulator {
    state: AccumulatorState,
    buffer: String,
    start_line: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    ready: VecDeque<Result<EventRecord, ParseError>>,
}

impl Default for RecordAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordAccumulator {
    pub fn new() -> Self {
        Self {
            state: AccumulatorState::Idle,
            buffer: String::new(),
            start_line: 0,
            depth: 0,
            in_string: false,
            escaped: false,
            ready: VecDeque::new(),
        }
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    /// Feed one line (without its terminator). `line_no` is 1-based.
    pub fn feed(&mut self, line_no: usize, line: &str) {
        if self.state == AccumulatorState::Accumulating && line.starts_with('{') {
            self.fail(ParseError::Truncated {
                line: self.start_line,
            });
        }

        let mut rest = line;
        loop {
            if self.state != AccumulatorState::Accumulating {
                let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | ','));
                if trimmed.is_empty() {
                    return;
                }
                if !trimmed.starts_with('{') {
                    self.fail(ParseError::Stray { line: line_no });
                    return;
                }
                self.begin(line_no);
                rest = trimmed;
            }

            match self.scan(rest) {
                Scan::Closed(end) => {
                    self.buffer.push_str(&rest[..end]);
                    self.complete();
                    rest = &rest[end..];
                }
                Scan::Restart(start) => {
                    self.fail(ParseError::Truncated {
                        line: self.start_line,
                    });
                    rest = &rest[start..];
                }
                Scan::Open => {
                    self.buffer.push_str(rest);
                    self.buffer.push('\n');
                    return;
                }
            }
        }
    }

    /// Signal end of input; an open record is reported as truncated.
    pub fn finish(&mut self) {
        if self.state == AccumulatorState::Accumulating {
            self.fail(ParseError::Truncated {
                line: self.start_line,
            });
        } else {
            self.state = AccumulatorState::Idle;
        }
    }

    /// Take the next parsed record or parse error.
    pub fn pop(&mut self) -> Option<Result<EventRecord, ParseError>> {
        self.ready.pop_front()
    }

    fn begin(&mut self, line_no: usize) {
        self.state = AccumulatorState::Accumulating;
        self.buffer.clear();
        self.start_line = line_no;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
    }

    /// Advance over `text` until the current record closes or another
    /// record starts inside it.
    fn scan(&mut self, text: &str) -> Scan {
        for (i, c) in text.char_indices() {
            if c == '{' && (self.depth > 0 || self.in_string) && is_record_start(&text[i..]) {
                return Scan::Restart(i);
            }
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match c {
                '"' => self.in_string = true,
                '{' => self.depth += 1,
                '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        return Scan::Closed(i + 1);
                    }
                }
                _ => {}
            }
        }
        Scan::Open
    }

    fn complete(&mut self) {
        match serde_json::from_str::<EventRecord>(&self.buffer) {
            Ok(record) => {
                self.state = AccumulatorState::Complete;
                self.ready.push_back(Ok(record));
            }
            Err(e) => self.fail(ParseError::Malformed {
                line: self.start_line,
                message: e.to_string(),
            }),
        }
        self.buffer.clear();
    }

    fn fail(&mut self, error: ParseError) {
        self.state = AccumulatorState::Error;
        self.buffer.clear();
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.ready.push_back(Err(error));
    }
}

enum Scan {
    /// Byte offset just past the closing brace.
    Closed(usize),
    /// Byte offset of a record that starts before the open one closed.
    Restart(usize),
    /// The record continues on the next line.
    Open,
}

/// An unescaped quote cannot occur inside a JSON string, so this prefix only
/// ever appears where a record begins.
fn is_record_start(text: &str) -> bool {
    text.strip_prefix(RECORD_START)
        .and_then(|rest| rest.get(UUID_LEN..))
        .is_some_and(|rest| rest.starts_with(AFTER_EVENT_ID))
}

struct OpenView {
    path: PathBuf,
    reader: BufReader<File>,
    line_no: usize,
}

/// Lazy sequence of records read from one or more views.
///
/// Parse errors are counted rather than yielded; check
/// [`RecordStream::parse_errors`] once the stream is drained.
pub struct RecordStream {
    pending: VecDeque<(PathBuf, File)>,
    current: Option<OpenView>,
    accumulator: RecordAccumulator,
    line: Vec<u8>,
    parse_errors: usize,
}

impl RecordStream {
    fn new(files: Vec<(PathBuf, File)>) -> Self {
        Self {
            pending: files.into(),
            current: None,
            accumulator: RecordAccumulator::new(),
            line: Vec::new(),
            parse_errors: 0,
        }
    }

    /// Records skipped so far because they could not be parsed.
    pub fn parse_errors(&self) -> usize {
        self.parse_errors
    }

    /// Read the next physical line of the current view into the accumulator.
    ///
    /// Returns `false` once the current view is exhausted.
    fn advance(&mut self) -> bool {
        let Some(view) = self.current.as_mut() else {
            return false;
        };

        self.line.clear();
        match view.reader.read_until(b'\n', &mut self.line) {
            Ok(0) => false,
            Ok(_) => {
                view.line_no += 1;
                let text = String::from_utf8_lossy(&self.line);
                let text = text.trim_end_matches(['\n', '\r']);
                self.accumulator.feed(view.line_no, text);
                true
            }
            Err(e) => {
                tracing::warn!(view = %view.path.display(), error = %e, "Failed to read log view");
                self.parse_errors += 1;
                false
            }
        }
    }
}

impl Iterator for RecordStream {
    type Item = EventRecord;

    fn next(&mut self) -> Option<EventRecord> {
        loop {
            if let Some(item) = self.accumulator.pop() {
                match item {
                    Ok(record) => return Some(record),
                    Err(e) => {
                        self.parse_errors += 1;
                        tracing::debug!(error = %e, "Skipping unparseable record");
                        continue;
                    }
                }
            }

            if self.current.is_some() {
                if !self.advance() {
                    self.accumulator.finish();
                    self.current = None;
                }
                continue;
            }

            let (path, file) = self.pending.pop_front()?;
            tracing::debug!(view = %path.display(), "Reading log view");
            self.current = Some(OpenView {
                path,
                reader: BufReader::new(file),
                line_no: 0,
            });
        }
    }
}

impl std::fmt::Debug for RecordStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("pending", &self.pending.len())
            .field("parse_errors", &self.parse_errors)
            .finish_non_exhaustive()
    }
}

/// Reads views of a [`LogStore`].
#[derive(Debug, Clone)]
pub struct LogReader {
    store: LogStore,
}

impl LogReader {
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Open views for reading, back to back in the given order. A view that
    /// does not exist reads as empty.
    pub fn read(&self, views: &[ViewRef]) -> Result<RecordStream, ReadError> {
        self.read_paths(views.iter().map(|view| self.store.path_for(view)))
    }

    /// Open several views, read back to back in the given order.
    pub fn read_paths(&self, paths: impl IntoIterator<Item = PathBuf>) -> Result<RecordStream, ReadError> {
        let mut files = Vec::new();
        for path in paths {
            if let Some(file) = open_view(&path)? {
                files.push((path, file));
            }
        }
        Ok(RecordStream::new(files))
    }

    /// Every daily view, oldest day first.
    pub fn read_daily(&self) -> Result<RecordStream, ReadError> {
        let dates = self.store.daily_dates().map_err(|source| ReadError::Open {
            path: self.store.root().join("daily"),
            source,
        })?;
        self.read_paths(dates.into_iter().map(|d| self.store.daily_path(d)))
    }
}

fn open_view(path: &Path) -> Result<Option<File>, ReadError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(view = %path.display(), "Log view does not exist yet");
            Ok(None)
        }
        Err(source) => Err(ReadError::Open {
            path: path.to_path_buf(),
            source,
        }),
    }
}
