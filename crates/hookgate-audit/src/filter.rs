//! Record filtering.

use crate::error::FilterError;
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use hookgate_core::{EventRecord, EventType};

/// Criteria a record must meet to be kept. Unset criteria match everything.
///
/// `since` is inclusive and `until` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
    pub tool_name: Option<String>,
    pub session_id: Option<String>,
}

/// Raw query options as an operator typed them.
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    /// Look back this many hours from now.
    pub hours: Option<f64>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub event_type: Option<String>,
    pub tool: Option<String>,
    pub session: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    pub fn tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Validate a query and turn it into criteria, resolving `hours`
    /// against `now`.
    pub fn from_query(query: &FilterQuery, now: DateTime<Utc>) -> Result<Self, FilterError> {
        let mut criteria = Self::new();

        if query.hours.is_some() && query.since.is_some() {
            return Err(FilterError::ConflictingBounds("--hours and --since".to_string()));
        }

        if let Some(hours) = query.hours {
            criteria.since = Some(look_back(now, hours)?);
        }
        if let Some(since) = &query.since {
            criteria.since = Some(parse_time_bound(since)?);
        }
        if let Some(until) = &query.until {
            criteria.until = Some(parse_time_bound(until)?);
        }

        if let (Some(since), Some(until)) = (criteria.since, criteria.until)
            && since >= until
        {
            return Err(FilterError::EmptyWindow {
                since: since.to_rfc3339(),
                until: until.to_rfc3339(),
            });
        }

        if let Some(event_type) = &query.event_type {
            criteria.event_type = Some(event_type.parse()?);
        }
        criteria.tool_name = query.tool.clone();
        criteria.session_id = query.session.clone();

        Ok(criteria)
    }

    /// Whether a record meets every set criterion.
    pub fn matches(&self, record: &EventRecord) -> bool {
        if let Some(since) = self.since
            && record.timestamp < since
        {
            return false;
        }
        if let Some(until) = self.until
            && record.timestamp >= until
        {
            return false;
        }
        if let Some(event_type) = self.event_type
            && record.event_type != event_type
        {
            return false;
        }
        if let Some(tool) = &self.tool_name
            && record.tool_name() != Some(tool.as_str())
        {
            return false;
        }
        if let Some(session) = &self.session_id
            && &record.session_id != session
        {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Keep the records that meet `criteria`, preserving order.
pub fn filter<'a, I>(records: I, criteria: &'a FilterCriteria) -> impl Iterator<Item = EventRecord> + 'a
where
    I: IntoIterator<Item = EventRecord>,
    I::IntoIter: 'a,
{
    records.into_iter().filter(move |r| criteria.matches(r))
}

/// The instant `hours` before `now`; out-of-range values are rejected.
fn look_back(now: DateTime<Utc>, hours: f64) -> Result<DateTime<Utc>, FilterError> {
    let invalid = || FilterError::InvalidHours {
        value: hours.to_string(),
    };
    if !hours.is_finite() || hours <= 0.0 {
        return Err(invalid());
    }
    let millis = hours * 3_600_000.0;
    if millis > i64::MAX as f64 {
        return Err(invalid());
    }
    TimeDelta::try_milliseconds(millis as i64)
        .and_then(|delta| now.checked_sub_signed(delta))
        .ok_or_else(invalid)
}

/// Parse an RFC 3339 instant, or a bare date meaning midnight UTC.
pub fn parse_time_bound(value: &str) -> Result<DateTime<Utc>, FilterError> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| FilterError::InvalidTimeBound {
            value: value.to_string(),
        })
}
