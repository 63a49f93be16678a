//! SLA breach detection and backlog aging for active incidents.

use crate::clock::whole_minutes;
use crate::config::SlaBudgets;
use crate::model::{Incident, Priority, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breach {
    pub id: String,
    pub title: String,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub age_minutes: i64,
    pub sla_minutes: i64,
    pub overdue_minutes: i64,
}

/// Breaches among non-resolved incidents, worst first.
///
/// Ties on overdue minutes go to the more severe priority, then to the lower
/// incident id, so the order never depends on scan order.
pub fn find_breaches(now: DateTime<Utc>, incidents: &[Incident], budgets: &SlaBudgets) -> Vec<Breach> {
    let mut out: Vec<Breach> = incidents
        .iter()
        .filter(|inc| inc.is_active())
        .filter_map(|inc| {
            let age = whole_minutes(inc.created_at, now);
            let sla = budgets.minutes_for(inc.priority);
            let overdue = (age - sla).max(0);
            (overdue > 0).then(|| Breach {
                id: inc.id.clone(),
                title: inc.title.clone(),
                priority: inc.priority,
                status: inc.status,
                created_at: inc.created_at,
                age_minutes: age,
                sla_minutes: sla,
                overdue_minutes: overdue,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.overdue_minutes
            .cmp(&a.overdue_minutes)
            .then_with(|| a.priority.cmp(&b.priority))
            .then_with(|| a.id.cmp(&b.id))
    });
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AgeBucket {
    Under15m,
    From15To60m,
    From1To4h,
    From4To24h,
    Over24h,
}

impl AgeBucket {
    /// Buckets are closed-open: `[0,15) [15,60) [60,240) [240,1440) [1440,inf)`.
    pub fn for_age(age_minutes: i64) -> Self {
        match age_minutes {
            i64::MIN..=14 => AgeBucket::Under15m,
            15..=59 => AgeBucket::From15To60m,
            60..=239 => AgeBucket::From1To4h,
            240..=1439 => AgeBucket::From4To24h,
            _ => AgeBucket::Over24h,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingBuckets {
    pub lt_15m: usize,
    pub m15_60: usize,
    pub h1_4: usize,
    pub h4_24: usize,
    pub gte_24h: usize,
}

impl AgingBuckets {
    pub fn record(&mut self, bucket: AgeBucket) {
        let slot = match bucket {
            AgeBucket::Under15m => &mut self.lt_15m,
            AgeBucket::From15To60m => &mut self.m15_60,
            AgeBucket::From1To4h => &mut self.h1_4,
            AgeBucket::From4To24h => &mut self.h4_24,
            AgeBucket::Over24h => &mut self.gte_24h,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.lt_15m + self.m15_60 + self.h1_4 + self.h4_24 + self.gte_24h
    }
}

pub fn aging_buckets(now: DateTime<Utc>, incidents: &[Incident]) -> AgingBuckets {
    let mut buckets = AgingBuckets::default();
    for inc in incidents.iter().filter(|inc| inc.is_active()) {
        buckets.record(AgeBucket::for_age(whole_minutes(inc.created_at, now)));
    }
    buckets
}
