//! Resolution KPIs over a trailing window.

use crate::clock::whole_minutes;
use crate::health::average;
use crate::model::Incident;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNASSIGNED: &str = "Unassigned";
const TOP_RESOLVERS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverCount {
    pub role: String,
    pub resolved: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiReport {
    pub generated_at: DateTime<Utc>,
    pub window_days: i64,
    pub resolved_count: usize,
    pub p0_resolved_count: usize,
    pub avg_mttr_minutes: Option<i64>,
    pub top_resolvers: Vec<ResolverCount>,
}

/// `resolved` is expected to be the window's resolved incidents already
/// (see `IncidentQuery::resolved_since`).
pub fn compute(now: DateTime<Utc>, window_days: i64, resolved: &[Incident]) -> KpiReport {
    let mut by_role: BTreeMap<&str, usize> = BTreeMap::new();
    let mut durations = Vec::new();
    let mut p0_resolved_count = 0;

    for inc in resolved {
        if inc.priority.is_most_severe() {
            p0_resolved_count += 1;
        }
        if let Some(at) = inc.resolved_at.filter(|at| *at >= inc.created_at) {
            durations.push(whole_minutes(inc.created_at, at));
        }
        let role = inc.resolved_by.map_or(UNASSIGNED, |r| r.as_str());
        *by_role.entry(role).or_default() += 1;
    }

    let mut top_resolvers: Vec<ResolverCount> = by_role
        .into_iter()
        .map(|(role, resolved)| ResolverCount {
            role: role.to_string(),
            resolved,
        })
        .collect();
    // BTreeMap yields names ascending; a stable sort keeps that on count ties.
    top_resolvers.sort_by(|a, b| b.resolved.cmp(&a.resolved));
    top_resolvers.truncate(TOP_RESOLVERS);

    KpiReport {
        generated_at: now,
        window_days,
        resolved_count: resolved.len(),
        p0_resolved_count,
        avg_mttr_minutes: average(&durations),
        top_resolvers,
    }
}
