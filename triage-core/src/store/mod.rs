//! Durable storage for incidents and their timelines.
//!
//! Two backends share one contract:
//! - [`SqliteStore`]: the production store
//! - [`MemoryStore`]: in-process, for tests and embedding

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::model::{Incident, Status, TimelineEvent};
use chrono::{DateTime, Utc};

pub trait IncidentStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Incident>, StoreError>;

    /// Writes the incident row and its timeline events as one unit.
    fn commit(&self, change: &Change) -> Result<(), StoreError>;

    fn query(&self, query: &IncidentQuery) -> Result<Vec<Incident>, StoreError>;

    /// Events for one incident, newest first.
    fn timeline(&self, incident_id: &str) -> Result<Vec<TimelineEvent>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Clone, Debug)]
pub struct Change {
    pub incident: Incident,
    /// `None` inserts a new row; `Some(r)` updates only if the stored revision is still `r`.
    pub expected_revision: Option<u64>,
    pub events: Vec<TimelineEvent>,
}

impl Change {
    pub fn insert(incident: Incident, events: Vec<TimelineEvent>) -> Self {
        Self {
            incident,
            expected_revision: None,
            events,
        }
    }

    pub fn update(incident: Incident, expected_revision: u64, events: Vec<TimelineEvent>) -> Self {
        Self {
            incident,
            expected_revision: Some(expected_revision),
            events,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Only(Status),
    /// Everything not yet resolved.
    Active,
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::Any => true,
            StatusFilter::Only(s) => s == status,
            StatusFilter::Active => !status.is_resolved(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryOrder {
    CreatedDesc,
    /// By resolved_at, falling back to updated_at then created_at.
    ResolutionDesc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncidentQuery {
    pub status: StatusFilter,
    /// Keeps rows whose resolution timestamp is at or after this instant.
    pub resolved_since: Option<DateTime<Utc>>,
    pub order: QueryOrder,
    pub limit: Option<usize>,
}

impl IncidentQuery {
    pub fn all() -> Self {
        Self {
            status: StatusFilter::Any,
            resolved_since: None,
            order: QueryOrder::CreatedDesc,
            limit: None,
        }
    }

    pub fn active() -> Self {
        Self {
            status: StatusFilter::Active,
            ..Self::all()
        }
    }

    pub fn with_status(status: Status) -> Self {
        Self {
            status: StatusFilter::Only(status),
            ..Self::all()
        }
    }

    pub fn resolved_since(cutoff: DateTime<Utc>) -> Self {
        Self {
            status: StatusFilter::Only(Status::Resolved),
            resolved_since: Some(cutoff),
            order: QueryOrder::ResolutionDesc,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
