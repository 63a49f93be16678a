use super::{Change, IncidentQuery, IncidentStore, QueryOrder, StatusFilter};
use crate::clock::{format_instant, parse_instant};
use crate::error::{StoreError, TriageError};
use crate::model::{Incident, Status, TimelineEvent};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Resolution timestamp with the legacy fallback chain.
const RESOLUTION_TS: &str =
    "COALESCE(NULLIF(resolved_at, ''), NULLIF(updated_at, ''), created_at)";

const INCIDENT_COLUMNS: &str = "id, title, description, priority, status, created_at, updated_at, \
     resolved_at, resolved_by, resolution_notes, revision";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        tracing::info!(path = %path.display(), "incident store opened");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys=ON;
            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                priority TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT '',
                resolved_at TEXT,
                resolved_by TEXT,
                resolution_notes TEXT,
                revision INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_incidents_status ON incidents(status);
            CREATE INDEX IF NOT EXISTS idx_incidents_created ON incidents(created_at);
            CREATE TABLE IF NOT EXISTS timeline (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                incident_id TEXT NOT NULL REFERENCES incidents(id),
                event_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                old_value TEXT,
                new_value TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_timeline_incident ON timeline(incident_id, created_at);
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl IncidentStore for SqliteStore {
    fn get(&self, id: &str) -> Result<Option<Incident>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1");
        Ok(conn.query_row(&sql, params![id], map_incident).optional()?)
    }

    fn commit(&self, change: &Change) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inc = &change.incident;
        let revision = to_sql_revision(inc.revision)?;

        match change.expected_revision {
            None => {
                tx.execute(
                    &format!(
                        "INSERT INTO incidents ({INCIDENT_COLUMNS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                    ),
                    params![
                        inc.id,
                        inc.title,
                        inc.description,
                        inc.priority.as_str(),
                        inc.status.as_str(),
                        format_instant(inc.created_at),
                        format_instant(inc.updated_at),
                        inc.resolved_at.map(format_instant),
                        inc.resolved_by.map(|r| r.as_str()),
                        inc.resolution_notes,
                        revision,
                    ],
                )?;
            }
            Some(expected) => {
                let updated = tx.execute(
                    "UPDATE incidents
                     SET title = ?2, description = ?3, priority = ?4, status = ?5,
                         updated_at = ?6, resolved_at = ?7, resolved_by = ?8,
                         resolution_notes = ?9, revision = ?10
                     WHERE id = ?1 AND revision = ?11",
                    params![
                        inc.id,
                        inc.title,
                        inc.description,
                        inc.priority.as_str(),
                        inc.status.as_str(),
                        format_instant(inc.updated_at),
                        inc.resolved_at.map(format_instant),
                        inc.resolved_by.map(|r| r.as_str()),
                        inc.resolution_notes,
                        revision,
                        to_sql_revision(expected)?,
                    ],
                )?;
                if updated == 0 {
                    return Err(StoreError::Conflict { id: inc.id.clone() });
                }
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO timeline (id, incident_id, event_type, created_at, old_value, new_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for event in &change.events {
                stmt.execute(params![
                    event.id,
                    event.incident_id,
                    event.kind.as_str(),
                    format_instant(event.created_at),
                    event.old_value,
                    event.new_value,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn query(&self, query: &IncidentQuery) -> Result<Vec<Incident>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        match query.status {
            StatusFilter::Any => {}
            StatusFilter::Only(status) => {
                clauses.push("status = ?".into());
                args.push(Value::Text(status.as_str().into()));
            }
            StatusFilter::Active => {
                clauses.push("status != ?".into());
                args.push(Value::Text(Status::Resolved.as_str().into()));
            }
        }

        if let Some(cutoff) = query.resolved_since {
            clauses.push(format!("{RESOLUTION_TS} >= ?"));
            args.push(Value::Text(format_instant(cutoff)));
        }

        let mut sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        match query.order {
            QueryOrder::CreatedDesc => sql.push_str(" ORDER BY created_at DESC, id ASC"),
            QueryOrder::ResolutionDesc => {
                sql.push_str(&format!(" ORDER BY {RESOLUTION_TS} DESC, id ASC"));
            }
        }
        sql.push_str(" LIMIT ?");
        args.push(Value::Integer(
            query
                .limit
                .and_then(|l| i64::try_from(l).ok())
                .unwrap_or(-1),
        ));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), map_incident)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn timeline(&self, incident_id: &str) -> Result<Vec<TimelineEvent>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, incident_id, event_type, created_at, old_value, new_value
             FROM timeline
             WHERE incident_id = ?1
             ORDER BY created_at DESC, seq DESC",
        )?;
        let rows = stmt.query_map(params![incident_id], map_event)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn to_sql_revision(revision: u64) -> Result<i64, StoreError> {
    i64::try_from(revision).map_err(|_| StoreError::Corrupt(format!("revision {revision} overflows")))
}

fn map_incident(row: &rusqlite::Row<'_>) -> rusqlite::Result<Incident> {
    let created_at = required_instant(row, 5)?;
    let updated_at = optional_instant(row, 6)?.unwrap_or(created_at);
    let resolved_by: Option<String> = row.get(8)?;
    let revision: i64 = row.get(10)?;

    Ok(Incident {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority: parse_column(row, 3)?,
        status: parse_column(row, 4)?,
        created_at,
        updated_at,
        resolved_at: optional_instant(row, 7)?,
        resolved_by: resolved_by
            .filter(|r| !r.trim().is_empty())
            .map(|r| r.parse().map_err(|e: TriageError| conversion(8, e)))
            .transpose()?,
        resolution_notes: row.get(9)?,
        revision: u64::try_from(revision).map_err(|e| conversion(10, e))?,
    })
}

fn map_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimelineEvent> {
    Ok(TimelineEvent {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        kind: parse_column(row, 2)?,
        created_at: required_instant(row, 3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
    })
}

fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = TriageError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion(idx, e))
}

fn optional_instant(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<chrono::DateTime<chrono::Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => parse_instant(text)
            .map(Some)
            .ok_or_else(|| conversion(idx, StoreError::Corrupt(format!("bad timestamp '{text}'")))),
    }
}

fn required_instant(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    optional_instant(row, idx)?
        .ok_or_else(|| conversion(idx, StoreError::Corrupt("missing timestamp".into())))
}

fn conversion<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, Priority, Role};
    use crate::timeline::TimelineRecorder;
    use chrono::{Duration, Utc};

    fn db_path(name: &str) -> String {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        format!("/tmp/ops-triage-tests/{name}-{nanos}.db")
    }

    fn created(inc: &Incident) -> Change {
        let mut rec = TimelineRecorder::new(inc.id.clone(), inc.created_at);
        rec.append(EventKind::Created, None, Some(format!("{} open", inc.priority)));
        Change::insert(inc.clone(), rec.into_events())
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let store = SqliteStore::open(db_path("roundtrip")).expect("open");
        let inc = Incident::open("Checkout failing", "500s on /checkout", Priority::P0, Utc::now());
        store.commit(&created(&inc)).expect("commit");

        let loaded = store.get(&inc.id).expect("get").expect("present");
        assert_eq!(loaded.id, inc.id);
        assert_eq!(loaded.priority, Priority::P0);
        assert_eq!(loaded.status, Status::Open);
        assert_eq!(loaded.created_at, inc.created_at);
        assert!(store.get("missing").expect("get").is_none());

        let events = store.timeline(&inc.id).expect("timeline");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Created);
        assert_eq!(events[0].new_value.as_deref(), Some("P0 open"));
    }

    #[test]
    fn stale_revision_is_rejected_and_nothing_is_written() {
        let store = SqliteStore::open_in_memory().expect("open");
        let inc = Incident::open("Invoice job stuck", "step 3/7", Priority::P2, Utc::now());
        store.commit(&created(&inc)).expect("commit");

        let mut next = inc.clone();
        next.priority = Priority::P1;
        next.revision = 1;
        let mut rec = TimelineRecorder::new(inc.id.clone(), Utc::now());
        rec.append_change(EventKind::PriorityChanged, Priority::P2, Priority::P1);
        let events = rec.into_events();

        store
            .commit(&Change::update(next.clone(), 0, events.clone()))
            .expect("first update");
        let err = store
            .commit(&Change::update(next, 0, events))
            .expect_err("stale update");
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.timeline(&inc.id).expect("timeline").len(), 2);
    }

    #[test]
    fn timeline_is_newest_first_with_insertion_tiebreak() {
        let store = SqliteStore::open_in_memory().expect("open");
        let t0 = Utc::now();
        let inc = Incident::open("Roaming mismatch", "subset of devices", Priority::P1, t0);
        store.commit(&created(&inc)).expect("commit");

        let t1 = t0 + Duration::minutes(5);
        let mut rec = TimelineRecorder::new(inc.id.clone(), t1);
        rec.append(EventKind::NoteAdded, None, Some("first".into()));
        rec.append(EventKind::NoteAdded, None, Some("second".into()));
        let mut next = inc.clone();
        next.updated_at = t1;
        next.revision = 1;
        store
            .commit(&Change::update(next, 0, rec.into_events()))
            .expect("update");

        let values: Vec<_> = store
            .timeline(&inc.id)
            .expect("timeline")
            .into_iter()
            .map(|e| e.new_value.unwrap_or_default())
            .collect();
        assert_eq!(values, vec!["second", "first", "P1 open"]);
    }

    #[test]
    fn query_filters_by_status_and_resolution_window() {
        let store = SqliteStore::open_in_memory().expect("open");
        let now = Utc::now();

        let active = Incident::open("Webhook retries", "429s from partner", Priority::P2, now - Duration::days(1));
        store.commit(&created(&active)).expect("active");

        let mut recent = Incident::open("Queue backlog", "support queue", Priority::P3, now - Duration::days(3));
        recent.status = Status::Resolved;
        recent.resolved_at = Some(now - Duration::days(1));
        recent.resolved_by = Some(Role::Support);
        recent.resolution_notes = Some("drained".into());
        recent.updated_at = now - Duration::days(1);
        store.commit(&created(&recent)).expect("recent");

        let mut old = Incident::open("Old outage", "long gone", Priority::P0, now - Duration::days(30));
        old.status = Status::Resolved;
        old.resolved_at = Some(now - Duration::days(20));
        old.resolved_by = Some(Role::OnCall);
        old.resolution_notes = Some("fixed".into());
        store.commit(&created(&old)).expect("old");

        let actives = store.query(&IncidentQuery::active()).expect("active");
        assert_eq!(actives.len(), 1);
        assert_eq!(actives[0].id, active.id);

        let window = store
            .query(&IncidentQuery::resolved_since(now - Duration::days(7)))
            .expect("window");
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, recent.id);
        assert_eq!(window[0].resolved_by, Some(Role::Support));

        let all = store.query(&IncidentQuery::all().limit(2)).expect("all");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, active.id);
    }

    #[test]
    fn legacy_rows_fall_back_to_created_at() {
        let store = SqliteStore::open_in_memory().expect("open");
        {
            let conn = store.lock().expect("lock");
            conn.execute(
                "INSERT INTO incidents (id, title, description, priority, status, created_at, updated_at)
                 VALUES ('legacy-1', 'Legacy', 'imported row', 'P2', 'resolved', '2026-01-05T08:00:00', '')",
                [],
            )
            .expect("insert legacy");
        }

        let inc = store.get("legacy-1").expect("get").expect("present");
        assert_eq!(inc.updated_at, inc.created_at);
        assert!(inc.resolved_at.is_none());
        assert_eq!(inc.resolution_instant(), inc.created_at);

        let cutoff = parse_instant("2026-01-01T00:00:00Z").expect("cutoff");
        let found = store
            .query(&IncidentQuery::resolved_since(cutoff))
            .expect("query");
        assert_eq!(found.len(), 1);
    }
}
