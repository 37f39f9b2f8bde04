//! Event storage backends.

use crate::error::{RecordError, ViewWriteError};
use crate::store::LogStore;
use hookgate_core::{EventRecord, now_micros};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Stamping retries when the UTC date rolls over between choosing the
/// daily view and stamping the record.
const MAX_STAMP_ATTEMPTS: usize = 3;

/// Trait for event storage backends.
pub trait EventStorage: Send + Sync {
    /// Store a record.
    ///
    /// Backends that stamp the record update `record.timestamp` to the
    /// time it was written.
    fn store(&self, record: &mut EventRecord) -> Result<(), RecordError>;
}

/// Appends each record to its three views under a [`LogStore`].
///
/// All views of one record are locked (in path order) before the record is
/// stamped and released after the line is written, so within every view
/// timestamps never decrease and lines never interleave, across threads and
/// across processes.
#[derive(Debug, Clone)]
pub struct ViewStorage {
    store: LogStore,
}

impl ViewStorage {
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }

    pub fn log_store(&self) -> &LogStore {
        &self.store
    }
}

impl EventStorage for ViewStorage {
    fn store(&self, record: &mut EventRecord) -> Result<(), RecordError> {
        let mut attempt = 1;

        loop {
            let planned = now_micros();
            let paths = self.store.views_for(planned.date_naive(), record.event_type);
            let attempted = paths.len();

            let mut failures = Vec::new();
            let mut locked: Vec<(PathBuf, File)> = Vec::with_capacity(attempted);
            for path in paths {
                match open_locked(&path) {
                    Ok(file) => locked.push((path, file)),
                    Err(source) => failures.push(ViewWriteError { path, source }),
                }
            }

            let stamp = now_micros().max(planned);
            if stamp.date_naive() != planned.date_naive() && attempt < MAX_STAMP_ATTEMPTS {
                tracing::debug!(attempt, "Date changed while locking views, retrying");
                attempt += 1;
                continue;
            }

            record.timestamp = stamp;
            let mut line = serde_json::to_vec(&*record)?;
            line.push(b'\n');

            for (path, mut file) in locked {
                if let Err(source) = file.write_all(&line) {
                    failures.push(ViewWriteError { path, source });
                }
            }

            if failures.is_empty() {
                return Ok(());
            }

            for failure in &failures {
                tracing::warn!(view = %failure.path.display(), error = %failure.source, "Failed to write log view");
            }
            return Err(RecordError::Views {
                attempted,
                failures,
            });
        }
    }
}

/// Open a view for appending and take an exclusive lock on it.
///
/// The lock is released when the returned file is dropped.
fn open_locked(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    file.lock()?;
    Ok(file)
}

/// Writes a human-readable line per record to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleStorage;

impl ConsoleStorage {
    pub fn new() -> Self {
        Self
    }
}

impl EventStorage for ConsoleStorage {
    fn store(&self, record: &mut EventRecord) -> Result<(), RecordError> {
        eprintln!("{}", record.to_log_line());
        Ok(())
    }
}

/// View storage plus a console echo.
#[derive(Debug, Clone)]
pub struct DualStorage {
    views: ViewStorage,
    console: ConsoleStorage,
}

impl DualStorage {
    pub fn new(store: LogStore) -> Self {
        Self {
            views: ViewStorage::new(store),
            console: ConsoleStorage::new(),
        }
    }
}

impl EventStorage for DualStorage {
    fn store(&self, record: &mut EventRecord) -> Result<(), RecordError> {
        let result = self.views.store(record);
        self.console.store(record)?;
        result
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStorage;

impl NullStorage {
    pub fn new() -> Self {
        Self
    }
}

impl EventStorage for NullStorage {
    fn store(&self, _record: &mut EventRecord) -> Result<(), RecordError> {
        Ok(())
    }
}
