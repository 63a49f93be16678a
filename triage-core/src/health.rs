//! Operational health scoring.
//!
//! Turns the SLA engine's breach list and aging buckets into a tri-level
//! status with labeled reasons. Reasons are evaluated independently:
//!
//! | code                 | fires when                                   |
//! |----------------------|----------------------------------------------|
//! | `sla_breach_p0`      | any P0 breach exists                         |
//! | `sla_breaches_total` | breach count >= `breach_threshold_total`     |
//! | `aging_24h`          | incidents aged 24h+ >= `aging_threshold_24h` |
//!
//! Status is `red` when `sla_breach_p0` fires, `amber` when anything else
//! fires, `green` otherwise.

use crate::clock::whole_minutes;
use crate::config::{SlaBudgets, TriageConfig};
use crate::model::Incident;
use crate::sla::{aging_buckets, find_breaches, AgingBuckets, Breach};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Amber,
    Red,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Green => "green",
            HealthStatus::Amber => "amber",
            HealthStatus::Red => "red",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonCode {
    #[serde(rename = "sla_breach_p0")]
    SlaBreachP0,
    #[serde(rename = "sla_breaches_total")]
    SlaBreachesTotal,
    #[serde(rename = "aging_24h")]
    Aging24h,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub code: ReasonCode,
    pub label: String,
    pub top_incidents: Vec<Breach>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthScore {
    pub status: HealthStatus,
    pub reasons: Vec<Reason>,
}

impl HealthScore {
    pub fn reason(&self, code: ReasonCode) -> Option<&Reason> {
        self.reasons.iter().find(|r| r.code == code)
    }
}

pub fn score(breaches: &[Breach], buckets: &AgingBuckets, config: &TriageConfig) -> HealthScore {
    let top = config.reason_top_incidents;
    let mut reasons = Vec::new();

    let p0: Vec<&Breach> = breaches
        .iter()
        .filter(|b| b.priority.is_most_severe())
        .collect();
    if !p0.is_empty() {
        reasons.push(Reason {
            code: ReasonCode::SlaBreachP0,
            label: format!("{} P0 SLA breach(es)", p0.len()),
            top_incidents: p0.into_iter().take(top).cloned().collect(),
        });
    }

    if breaches.len() >= config.breach_threshold_total {
        reasons.push(Reason {
            code: ReasonCode::SlaBreachesTotal,
            label: format!(
                "{} total SLA breaches (>= {})",
                breaches.len(),
                config.breach_threshold_total
            ),
            top_incidents: breaches.iter().take(top).cloned().collect(),
        });
    }

    if buckets.gte_24h >= config.aging_threshold_24h {
        reasons.push(Reason {
            code: ReasonCode::Aging24h,
            label: format!(
                "{} incidents aged 24h+ (>= {})",
                buckets.gte_24h, config.aging_threshold_24h
            ),
            top_incidents: breaches.iter().take(top).cloned().collect(),
        });
    }

    let status = if reasons.iter().any(|r| r.code == ReasonCode::SlaBreachP0) {
        HealthStatus::Red
    } else if !reasons.is_empty() {
        HealthStatus::Amber
    } else {
        HealthStatus::Green
    };

    HealthScore { status, reasons }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mttr {
    pub window_days: i64,
    pub resolved_count: usize,
    pub avg_minutes: Option<i64>,
}

/// Mean whole minutes from creation to resolution for incidents resolved
/// since `now - window_days`. Pairs with resolved_at before created_at are skipped.
pub fn mean_time_to_resolve(now: DateTime<Utc>, window_days: i64, resolved: &[Incident]) -> Mttr {
    let cutoff = now - Duration::days(window_days);
    let durations: Vec<i64> = resolved
        .iter()
        .filter_map(|inc| inc.resolved_at.map(|at| (inc.created_at, at)))
        .filter(|(created, resolved_at)| *resolved_at >= cutoff && resolved_at >= created)
        .map(|(created, resolved_at)| whole_minutes(created, resolved_at))
        .collect();

    Mttr {
        window_days,
        resolved_count: durations.len(),
        avg_minutes: average(&durations),
    }
}

pub(crate) fn average(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let len = i64::try_from(values.len()).ok()?;
    Some(values.iter().sum::<i64>().div_euclid(len))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub active_total: usize,
    pub aging_buckets: AgingBuckets,
    pub sla: SlaBudgets,
    pub breached_total: usize,
    pub breached: Vec<Breach>,
    pub mttr: Mttr,
    pub score: HealthScore,
}

impl HealthReport {
    pub fn status(&self) -> HealthStatus {
        self.score.status
    }
}

/// Runs the full pipeline: SLA engine, then scorer, then MTTR.
pub fn assess(
    now: DateTime<Utc>,
    active: &[Incident],
    resolved: &[Incident],
    config: &TriageConfig,
) -> HealthReport {
    let breaches = find_breaches(now, active, &config.sla);
    let buckets = aging_buckets(now, active);
    let score = score(&breaches, &buckets, config);

    HealthReport {
        generated_at: now,
        active_total: active.iter().filter(|i| i.is_active()).count(),
        aging_buckets: buckets,
        sla: config.sla,
        breached_total: breaches.len(),
        breached: breaches.into_iter().take(config.breach_report_limit).collect(),
        mttr: mean_time_to_resolve(now, config.mttr_window_days, resolved),
        score,
    }
}
