//! Aggregate statistics over a record sequence.

use chrono::{DateTime, Utc};
use hookgate_core::{EventRecord, EventType, Outcome, UNKNOWN_SESSION};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Summary of a record sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: usize,
    /// Records skipped because they could not be parsed.
    pub parse_errors: usize,
    /// One entry per event type, in declaration order, including zeros.
    pub by_event_type: Vec<EventTypeCount>,
    /// Most used tools, count descending; ties keep first-seen order.
    pub top_tools: Vec<ToolCount>,
    pub distinct_sessions: usize,
    pub decisions: DecisionCounts,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeCount {
    pub event_type: EventType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCount {
    pub tool: String,
    pub count: usize,
}

/// One session seen in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub events: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub allow: usize,
    pub warn: usize,
    pub block: usize,
}

impl DecisionCounts {
    pub fn get(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Allow => self.allow,
            Outcome::Warn => self.warn,
            Outcome::Block => self.block,
        }
    }

    fn bump(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Allow => self.allow += 1,
            Outcome::Warn => self.warn += 1,
            Outcome::Block => self.block += 1,
        }
    }
}

impl Stats {
    /// Count for one event type.
    pub fn event_type_count(&self, event_type: EventType) -> usize {
        self.by_event_type
            .iter()
            .find(|c| c.event_type == event_type)
            .map_or(0, |c| c.count)
    }
}

/// Streaming aggregation; memory grows with distinct tools and sessions,
/// not with records.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    total: usize,
    by_type: [usize; EventType::ALL.len()],
    /// tool -> (count, first-seen index)
    tools: HashMap<String, (usize, usize)>,
    sessions: HashSet<String>,
    decisions: DecisionCounts,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl StatsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &EventRecord) {
        self.total += 1;

        if let Some(index) = EventType::ALL.iter().position(|t| *t == record.event_type) {
            self.by_type[index] += 1;
        }

        if let Some(tool) = record.tool_name() {
            let seen = self.tools.len();
            self.tools.entry(tool.to_string()).or_insert((0, seen)).0 += 1;
        }

        if !self.sessions.contains(&record.session_id) {
            self.sessions.insert(record.session_id.clone());
        }

        if let Some(decision) = &record.decision {
            self.decisions.bump(decision.outcome);
        }

        self.first = Some(self.first.map_or(record.timestamp, |t| t.min(record.timestamp)));
        self.last = Some(self.last.map_or(record.timestamp, |t| t.max(record.timestamp)));
    }

    /// Produce the summary, keeping at most `top_n` tools.
    pub fn finish(self, top_n: usize, parse_errors: usize) -> Stats {
        let mut tools: Vec<(String, usize, usize)> = self
            .tools
            .into_iter()
            .map(|(tool, (count, seen))| (tool, count, seen))
            .collect();
        tools.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        Stats {
            total: self.total,
            parse_errors,
            by_event_type: EventType::ALL
                .iter()
                .zip(self.by_type)
                .map(|(event_type, count)| EventTypeCount {
                    event_type: *event_type,
                    count,
                })
                .collect(),
            top_tools: tools
                .into_iter()
                .take(top_n)
                .map(|(tool, count, _)| ToolCount { tool, count })
                .collect(),
            distinct_sessions: self.sessions.len(),
            decisions: self.decisions,
            first_timestamp: self.first,
            last_timestamp: self.last,
        }
    }
}

/// Aggregate a record sequence in one pass.
pub fn aggregate<I>(records: I, top_n: usize) -> Stats
where
    I: IntoIterator<Item = EventRecord>,
{
    let mut acc = StatsAccumulator::new();
    for record in records {
        acc.observe(&record);
    }
    acc.finish(top_n, 0)
}

/// Sessions in the sequence, sorted by id. Records without a session are
/// left out.
pub fn list_sessions<I>(records: I) -> Vec<SessionSummary>
where
    I: IntoIterator<Item = EventRecord>,
{
    let mut sessions: BTreeMap<String, SessionSummary> = BTreeMap::new();
    for record in records {
        if record.session_id.is_empty() || record.session_id == UNKNOWN_SESSION {
            continue;
        }
        sessions
            .entry(record.session_id.clone())
            .and_modify(|s| {
                s.events += 1;
                s.first_seen = s.first_seen.min(record.timestamp);
                s.last_seen = s.last_seen.max(record.timestamp);
            })
            .or_insert_with(|| SessionSummary {
                session_id: record.session_id,
                events: 1,
                first_seen: record.timestamp,
                last_seen: record.timestamp,
            });
    }
    sessions.into_values().collect()
}

/// Event types present in the sequence, in declaration order.
pub fn list_event_types<I>(records: I) -> Vec<EventTypeCount>
where
    I: IntoIterator<Item = EventRecord>,
{
    let mut acc = StatsAccumulator::new();
    for record in records {
        acc.observe(&record);
    }
    acc.finish(0, 0)
        .by_event_type
        .into_iter()
        .filter(|c| c.count > 0)
        .collect()
}
