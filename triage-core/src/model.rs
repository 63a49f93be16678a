use crate::error::TriageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Incident priority, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::P0, Priority::P1, Priority::P2, Priority::P3];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }

    pub fn is_most_severe(self) -> bool {
        self == Priority::P0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                TriageError::Validation(format!(
                    "invalid priority '{normalized}', must be one of {}",
                    join(Priority::ALL.iter())
                ))
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    Investigating,
    Mitigated,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Open,
        Status::Investigating,
        Status::Mitigated,
        Status::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Investigating => "investigating",
            Status::Mitigated => "mitigated",
            Status::Resolved => "resolved",
        }
    }

    pub fn is_resolved(self) -> bool {
        self == Status::Resolved
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| {
                TriageError::Validation(format!(
                    "invalid status '{normalized}', must be one of {}",
                    join(Status::ALL.iter())
                ))
            })
    }
}

/// Role credited with resolving an incident.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "On-call")]
    OnCall,
    #[serde(rename = "Ops Lead")]
    OpsLead,
    Support,
    Engineering,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::OnCall, Role::OpsLead, Role::Support, Role::Engineering];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::OnCall => "On-call",
            Role::OpsLead => "Ops Lead",
            Role::Support => "Support",
            Role::Engineering => "Engineering",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == trimmed)
            .ok_or_else(|| {
                TriageError::Validation(format!(
                    "invalid resolved_by '{trimmed}', must be one of {}",
                    join(Role::ALL.iter())
                ))
            })
    }
}

/// Kind of audit entry on an incident timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    StatusChanged,
    PriorityChanged,
    NoteAdded,
    ResolvedBy,
    ResolutionNotes,
    ResolvedAt,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Created,
        EventKind::StatusChanged,
        EventKind::PriorityChanged,
        EventKind::NoteAdded,
        EventKind::ResolvedBy,
        EventKind::ResolutionNotes,
        EventKind::ResolvedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::StatusChanged => "status_changed",
            EventKind::PriorityChanged => "priority_changed",
            EventKind::NoteAdded => "note_added",
            EventKind::ResolvedBy => "resolved_by",
            EventKind::ResolutionNotes => "resolution_notes",
            EventKind::ResolvedAt => "resolved_at",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TriageError::Validation(format!("unknown event kind '{s}'")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Role>,
    pub resolution_notes: Option<String>,
    /// Bumped on every applied mutation; the store rejects stale writes.
    pub revision: u64,
}

impl Incident {
    pub fn open(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            priority,
            status: Status::Open,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            revision: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_resolved()
    }

    /// resolved_at, falling back to updated_at for rows that never recorded one.
    pub fn resolution_instant(&self) -> DateTime<Utc> {
        self.resolved_at.unwrap_or(self.updated_at)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub incident_id: String,
    #[serde(rename = "event_type")]
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

fn join<'a, T: fmt::Display + 'a>(items: impl Iterator<Item = &'a T>) -> String {
    items.map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
