//! Event recorder.
//!
//! Provides the main `EventRecorder` type, which validates records and hands
//! them to the storage backend chosen by the logging configuration.

use hookgate_core::{EventRecord, LogConfig};
use std::sync::Arc;

use crate::error::RecordError;
use crate::storage::{DualStorage, EventStorage, NullStorage, ViewStorage};
use crate::store::LogStore;

/// The main event recorder.
pub struct EventRecorder {
    config: LogConfig,
    storage: Arc<dyn EventStorage>,
}

impl EventRecorder {
    /// Create a recorder from logging configuration.
    ///
    /// Nothing is opened until the first record is written.
    pub fn new(config: LogConfig) -> Self {
        let storage: Arc<dyn EventStorage> = if !config.enabled {
            Arc::new(NullStorage::new())
        } else {
            let store = LogStore::new(&config.directory);
            if config.stdout {
                Arc::new(DualStorage::new(store))
            } else {
                Arc::new(ViewStorage::new(store))
            }
        };

        Self { config, storage }
    }

    /// Create a recorder with a custom storage backend.
    pub fn with_storage(config: LogConfig, storage: Arc<dyn EventStorage>) -> Self {
        Self { config, storage }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Record an event.
    pub fn record(&self, mut event: EventRecord) -> Result<(), RecordError> {
        self.record_mut(&mut event)
    }

    /// Record an event, leaving `event` stamped with the time it was written.
    pub fn record_mut(&self, event: &mut EventRecord) -> Result<(), RecordError> {
        if !self.config.enabled {
            return Ok(());
        }

        event.validate()?;

        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            session = %event.session_id,
            "Recording event"
        );

        self.storage.store(event)
    }

    /// Record an event, logging any failure instead of returning it.
    ///
    /// Used on the hook path, where a recording failure must never change
    /// the decision handed back to the agent.
    pub fn record_or_warn(&self, event: EventRecord) {
        let event_type = event.event_type;
        if let Err(e) = self.record(event) {
            tracing::warn!(event_type = %event_type, error = %e, "Failed to record event");
        }
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookgate_core::{ActionDescriptor, Decision, EventType};
    use serde_json::{Map, json};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        records: Mutex<Vec<EventRecord>>,
    }

    impl EventStorage for MemoryStorage {
        fn store(&self, record: &mut EventRecord) -> Result<(), RecordError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn memory_recorder() -> (EventRecorder, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::default());
        let recorder = EventRecorder::with_storage(LogConfig::default(), storage.clone());
        (recorder, storage)
    }

    #[test]
    fn test_disabled_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = EventRecorder::new(LogConfig {
            enabled: false,
            directory: dir.path().to_path_buf(),
            stdout: false,
        });
        assert!(!recorder.is_enabled());

        // invalid records are not even validated when disabled
        recorder
            .record(EventRecord::new(EventType::PreToolUse, "s", Map::new()))
            .unwrap();
        assert!(!LogStore::new(dir.path()).all_events_path().exists());
    }

    #[test]
    fn test_record_passes_event_through() {
        let (recorder, storage) = memory_recorder();
        let action = ActionDescriptor::new("Bash", "s1").with_param("command", "rm -rf x");

        recorder
            .record(EventRecord::pre_tool_use(
                &action,
                json!({"command": "rm -rf x"}),
                Decision::block("r", "no"),
            ))
            .unwrap();
        let mut payload = Map::new();
        payload.insert("prompt".to_string(), json!("fix the tests"));
        recorder
            .record(EventRecord::new(EventType::UserPromptSubmit, "s1", payload))
            .unwrap();

        let records = storage.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tool_name(), Some("Bash"));
        assert_eq!(records[0].decision, Some(Decision::block("r", "no")));
        assert_eq!(records[1].payload["prompt"], "fix the tests");
    }

    #[test]
    fn test_invalid_record_is_rejected() {
        let (recorder, storage) = memory_recorder();

        let missing_decision = EventRecord::new(EventType::PreToolUse, "s", Map::new());
        assert!(matches!(
            recorder.record(missing_decision),
            Err(RecordError::Invalid(_))
        ));

        let mut allow_with_rule = Decision::allow();
        allow_with_rule.matched_rule_id = Some("r".to_string());
        let event = EventRecord::new(EventType::PreToolUse, "s", Map::new()).with_decision(allow_with_rule);
        assert!(recorder.record(event).is_err());

        assert!(storage.records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_record_or_warn_swallows_errors() {
        let (recorder, storage) = memory_recorder();
        recorder.record_or_warn(EventRecord::new(EventType::PreToolUse, "s", Map::new()));
        assert!(storage.records.lock().unwrap().is_empty());
    }

    #[test]
    fn test_new_writes_to_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = EventRecorder::new(LogConfig {
            enabled: true,
            directory: dir.path().to_path_buf(),
            stdout: false,
        });

        let mut event = EventRecord::new(EventType::SubagentStop, "s", Map::new());
        recorder.record_mut(&mut event).unwrap();

        let store = LogStore::new(dir.path());
        assert!(store.all_events_path().exists());
        assert!(store.daily_path(event.timestamp.date_naive()).exists());
        assert!(store.event_type_path(EventType::SubagentStop).exists());
    }
}
