//! Service facade over the lifecycle engine.
//!
//! `OpsDesk` owns the store, the clock and the configuration. Each operation
//! samples the clock once and reuses that instant for every timestamp and
//! computation it performs.

use crate::clock::Clock;
use crate::config::TriageConfig;
use crate::error::TriageError;
use crate::health::{self, HealthReport, HealthStatus};
use crate::kpi::{self, KpiReport};
use crate::lifecycle::{apply_plan, check_transition, plan_patch, IncidentPatch, PatchFields};
use crate::model::{EventKind, Incident, Priority, Status, TimelineEvent};
use crate::recommend::{self, RecommendationReport};
use crate::store::{Change, IncidentQuery, IncidentStore};
use crate::timeline::TimelineRecorder;
use crate::triage::{self, TriageSuggestion};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info};

pub const LIST_WINDOW_DAYS: RangeInclusive<i64> = 1..=365;
pub const LIST_LIMIT: RangeInclusive<usize> = 1..=200;
pub const ACTIVE_LIMIT: RangeInclusive<usize> = 1..=500;
pub const TOP_N: RangeInclusive<usize> = 1..=10;
pub const KPI_WINDOW_DAYS: RangeInclusive<i64> = 1..=90;

pub const DEFAULT_LIST_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const DEFAULT_ACTIVE_LIMIT: usize = 200;
pub const DEFAULT_TOP_N: usize = 3;
pub const DEFAULT_KPI_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub generated_at: DateTime<Utc>,
    pub health_status: HealthStatus,
    pub summary: String,
}

#[derive(Clone)]
pub struct OpsDesk {
    store: Arc<dyn IncidentStore>,
    clock: Arc<dyn Clock>,
    config: TriageConfig,
}

impl OpsDesk {
    pub fn new(store: Arc<dyn IncidentStore>, clock: Arc<dyn Clock>, config: TriageConfig) -> Self {
        Self { store, clock, config }
    }

    pub fn config(&self) -> &TriageConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn IncidentStore> {
        &self.store
    }

    /// Opens a new incident and records its creation event.
    pub fn create(
        &self,
        title: &str,
        description: &str,
        priority: Priority,
    ) -> Result<Incident, TriageError> {
        let now = self.clock.now();
        let incident = Incident::open(title.trim(), description.trim(), priority, now);

        let mut timeline = TimelineRecorder::new(incident.id.clone(), now);
        timeline.append(
            EventKind::Created,
            None,
            Some(format!("{} {}", incident.priority, incident.status)),
        );
        self.store
            .commit(&Change::insert(incident.clone(), timeline.into_events()))?;

        info!(incident_id = %incident.id, priority = %incident.priority, "incident created");
        Ok(incident)
    }

    /// Lists incidents, newest first. With `status = resolved` the list is
    /// limited to incidents resolved within the trailing window and ordered
    /// by resolution time.
    pub fn list_incidents(
        &self,
        status: Option<Status>,
        window_days: i64,
        limit: usize,
    ) -> Result<Vec<Incident>, TriageError> {
        check_range("days", window_days, &LIST_WINDOW_DAYS)?;
        check_range("limit", limit, &LIST_LIMIT)?;

        let query = match status {
            Some(Status::Resolved) => {
                IncidentQuery::resolved_since(self.clock.now() - Duration::days(window_days))
            }
            Some(other) => IncidentQuery::with_status(other),
            None => IncidentQuery::all(),
        };
        let incidents = self.store.query(&query.limit(limit))?;
        debug!(count = incidents.len(), status = ?status, "listed incidents");
        Ok(incidents)
    }

    pub fn list_active(&self, limit: usize) -> Result<Vec<Incident>, TriageError> {
        check_range("limit", limit, &ACTIVE_LIMIT)?;
        let incidents = self.store.query(&IncidentQuery::active().limit(limit))?;
        debug!(count = incidents.len(), "listed active incidents");
        Ok(incidents)
    }

    /// Validates and applies a patch. Nothing is written unless every check
    /// passes; the incident row and its new events commit together.
    pub fn apply_patch(&self, id: &str, patch: &IncidentPatch) -> Result<Incident, TriageError> {
        let current = self.require(id)?;
        self.commit_patch(current, patch)
    }

    /// Like [`OpsDesk::apply_patch`] for a patch still in text form. The
    /// incident must exist and the transition must be allowed before the
    /// priority and role values are looked at.
    pub fn apply_patch_fields(&self, id: &str, fields: PatchFields) -> Result<Incident, TriageError> {
        let current = self.require(id)?;
        check_transition(current.status, fields.status)?;
        let patch = fields.into_patch()?;
        self.commit_patch(current, &patch)
    }

    fn commit_patch(&self, current: Incident, patch: &IncidentPatch) -> Result<Incident, TriageError> {
        let plan = plan_patch(&current, patch)?;

        let now = self.clock.now();
        let mut timeline = TimelineRecorder::new(current.id.clone(), now);
        let next = apply_plan(&current, plan, now, &mut timeline);
        let recorded = timeline.len();

        self.store
            .commit(&Change::update(next.clone(), current.revision, timeline.into_events()))?;

        info!(
            incident_id = %next.id,
            status = %next.status,
            priority = %next.priority,
            events = recorded,
            "incident patched"
        );
        Ok(next)
    }

    pub fn timeline(&self, id: &str) -> Result<Vec<TimelineEvent>, TriageError> {
        self.require(id)?;
        Ok(self.store.timeline(id)?)
    }

    pub fn health(&self) -> Result<HealthReport, TriageError> {
        let now = self.clock.now();
        self.health_at(now)
    }

    pub fn recommendations(&self, top_n: usize) -> Result<RecommendationReport, TriageError> {
        check_range("top_n", top_n, &TOP_N)?;
        let now = self.clock.now();
        let report = self.health_at(now)?;
        let recommendations = recommend::recommend(&report, top_n);
        debug!(
            status = %report.status(),
            count = recommendations.len(),
            "built recommendations"
        );
        Ok(RecommendationReport {
            generated_at: now,
            health_status: report.status(),
            recommendations,
        })
    }

    pub fn recommendation_summary(&self) -> Result<RecommendationSummary, TriageError> {
        let now = self.clock.now();
        let report = self.health_at(now)?;
        Ok(RecommendationSummary {
            generated_at: now,
            health_status: report.status(),
            summary: recommend::summarize(&report.score),
        })
    }

    pub fn kpis(&self, window_days: i64) -> Result<KpiReport, TriageError> {
        check_range("days", window_days, &KPI_WINDOW_DAYS)?;
        let now = self.clock.now();
        let resolved = self
            .store
            .query(&IncidentQuery::resolved_since(now - Duration::days(window_days)))?;
        let report = kpi::compute(now, window_days, &resolved);
        debug!(window_days, resolved = report.resolved_count, "computed kpis");
        Ok(report)
    }

    pub fn classify(&self, title: &str, description: &str) -> TriageSuggestion {
        let suggestion = triage::classify(title, description);
        debug!(priority = %suggestion.suggested_priority, "classified incident text");
        suggestion
    }

    fn health_at(&self, now: DateTime<Utc>) -> Result<HealthReport, TriageError> {
        let active = self.store.query(&IncidentQuery::active())?;
        let window = Duration::try_days(self.config.mttr_window_days).ok_or_else(|| {
            TriageError::Validation(format!(
                "mttr_window_days {} is out of range",
                self.config.mttr_window_days
            ))
        })?;
        let resolved = self.store.query(&IncidentQuery::resolved_since(now - window))?;

        let report = health::assess(now, &active, &resolved, &self.config);
        debug!(
            status = %report.status(),
            active = report.active_total,
            breached = report.breached_total,
            "assessed health"
        );
        Ok(report)
    }

    fn require(&self, id: &str) -> Result<Incident, TriageError> {
        self.store
            .get(id)?
            .ok_or_else(|| TriageError::NotFound(id.to_string()))
    }
}

fn check_range<T>(name: &str, value: T, range: &RangeInclusive<T>) -> Result<(), TriageError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        return Ok(());
    }
    Err(TriageError::Validation(format!(
        "{name} must be between {} and {}, got {value}",
        range.start(),
        range.end()
    )))
}
