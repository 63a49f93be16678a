use super::{Change, IncidentQuery, IncidentStore, QueryOrder};
use crate::error::StoreError;
use crate::model::{Incident, TimelineEvent};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-process store. Not durable; contents are lost with the process.
#[derive(Default)]
pub struct MemoryStore {
    incidents: RwLock<BTreeMap<String, Incident>>,
    timeline: RwLock<Vec<TimelineEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IncidentStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        let incidents = self
            .incidents
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(incidents.get(id).cloned())
    }

    fn commit(&self, change: &Change) -> Result<(), StoreError> {
        // Lock order: incidents, then timeline.
        let mut incidents = self
            .incidents
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        let mut timeline = self
            .timeline
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))?;

        let id = &change.incident.id;
        let stored_revision = incidents.get(id).map(|i| i.revision);
        match (change.expected_revision, stored_revision) {
            (None, None) => {}
            (None, Some(_)) => {
                return Err(StoreError::Corrupt(format!("incident {id} already exists")));
            }
            (Some(expected), Some(actual)) if expected == actual => {}
            (Some(_), _) => return Err(StoreError::Conflict { id: id.clone() }),
        }

        incidents.insert(id.clone(), change.incident.clone());
        timeline.extend(change.events.iter().cloned());
        Ok(())
    }

    fn query(&self, query: &IncidentQuery) -> Result<Vec<Incident>, StoreError> {
        let incidents = self
            .incidents
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;

        let mut out: Vec<Incident> = incidents
            .values()
            .filter(|i| query.status.matches(i.status))
            .filter(|i| {
                query
                    .resolved_since
                    .map_or(true, |cutoff| i.resolution_instant() >= cutoff)
            })
            .cloned()
            .collect();

        match query.order {
            QueryOrder::CreatedDesc => out.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id))
            }),
            QueryOrder::ResolutionDesc => out.sort_by(|a, b| {
                b.resolution_instant()
                    .cmp(&a.resolution_instant())
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }

        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn timeline(&self, incident_id: &str) -> Result<Vec<TimelineEvent>, StoreError> {
        let timeline = self
            .timeline
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;

        // Reverse insertion order first so the stable sort keeps newest-appended first on ties.
        let mut events: Vec<TimelineEvent> = timeline
            .iter()
            .rev()
            .filter(|e| e.incident_id == incident_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, Priority, Status};
    use crate::timeline::TimelineRecorder;
    use chrono::{Duration, Utc};

    #[test]
    fn commit_is_all_or_nothing_on_conflict() {
        let store = MemoryStore::new();
        let inc = Incident::open("Activation delays", "pending > 10m", Priority::P1, Utc::now());
        store.commit(&Change::insert(inc.clone(), vec![])).expect("insert");

        let mut rec = TimelineRecorder::new(inc.id.clone(), Utc::now());
        rec.append(EventKind::NoteAdded, None, Some("stale".into()));
        let err = store
            .commit(&Change::update(inc.clone(), 7, rec.into_events()))
            .expect_err("conflict");
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert!(store.timeline(&inc.id).expect("timeline").is_empty());
    }

    #[test]
    fn active_query_orders_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let older = Incident::open("Older", "created first", Priority::P2, now - Duration::hours(2));
        let newer = Incident::open("Newer", "created second", Priority::P2, now);
        let mut done = Incident::open("Done", "already resolved", Priority::P2, now);
        done.status = Status::Resolved;
        for inc in [&older, &newer, &done] {
            store.commit(&Change::insert(inc.clone(), vec![])).expect("insert");
        }

        let ids: Vec<_> = store
            .query(&IncidentQuery::active())
            .expect("query")
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(store.backend_name(), "memory");
    }
}
