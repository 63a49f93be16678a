use crate::model::{EventKind, TimelineEvent};
use chrono::{DateTime, Utc};
use std::fmt::Display;

/// Collects the audit events produced by one incident mutation.
///
/// Every event is stamped with the instant the recorder was opened with; the
/// events are committed together with the incident row they describe.
#[derive(Debug)]
pub struct TimelineRecorder {
    incident_id: String,
    at: DateTime<Utc>,
    events: Vec<TimelineEvent>,
}

impl TimelineRecorder {
    pub fn new(incident_id: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            incident_id: incident_id.into(),
            at,
            events: Vec::new(),
        }
    }

    pub fn append(&mut self, kind: EventKind, old_value: Option<String>, new_value: Option<String>) {
        self.events.push(TimelineEvent {
            id: uuid::Uuid::new_v4().to_string(),
            incident_id: self.incident_id.clone(),
            kind,
            created_at: self.at,
            old_value,
            new_value,
        });
    }

    /// Appends `old -> new` unless the two values are identical.
    pub fn append_change<T>(&mut self, kind: EventKind, old: T, new: T) -> bool
    where
        T: PartialEq + Display,
    {
        if old == new {
            return false;
        }
        self.append(kind, Some(old.to_string()), Some(new.to_string()));
        true
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<TimelineEvent> {
        self.events
    }
}
