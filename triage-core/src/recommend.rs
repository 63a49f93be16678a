//! Ranked remediation actions derived from a health snapshot.

use crate::health::{HealthReport, HealthScore, HealthStatus, ReasonCode};
use crate::sla::Breach;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ResolveP0Breaches,
    ResolveTopBreaches,
    CleanupAgedBacklog,
    ImproveClosureHygiene,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    pub action_type: ActionType,
    pub title: String,
    pub why: String,
    pub expected_impact: String,
    pub suggested_owner_role: String,
    pub playbook: Vec<String>,
    pub target_incidents: Vec<Breach>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub generated_at: DateTime<Utc>,
    pub health_status: HealthStatus,
    pub recommendations: Vec<Recommendation>,
}

/// Builds the action list from the report's reasons. The closure hygiene
/// action is always present and always last.
pub fn recommend(report: &HealthReport, top_n: usize) -> Vec<Recommendation> {
    let score = &report.score;
    let top_overdue = || -> Vec<Breach> { report.breached.iter().take(top_n).cloned().collect() };
    let mut recs = Vec::new();

    if let Some(reason) = score.reason(ReasonCode::SlaBreachP0) {
        let targets: Vec<Breach> = reason.top_incidents.iter().take(top_n).cloned().collect();
        recs.push(action(
            ActionType::ResolveP0Breaches,
            format!("Triage top {} P0 SLA breach(es)", targets.len()),
            "P0 SLA breaches are the strongest driver of RED status and should be handled immediately.",
            "High (often RED to AMBER when cleared)",
            "On-call / Incident Commander",
            &[
                "Assign an owner",
                "Confirm blast radius",
                "Mitigate (rollback/flag/shift traffic)",
                "Communicate updates",
                "Resolve + write resolution notes",
            ],
            targets,
        ));
    }

    if score.reason(ReasonCode::SlaBreachesTotal).is_some() {
        let targets = top_overdue();
        recs.push(action(
            ActionType::ResolveTopBreaches,
            format!("Clear the top {} most overdue SLA breaches", targets.len()),
            "Reducing the largest overdue breaches lowers risk quickly and stabilizes throughput.",
            "Medium-High",
            "Ops Lead / Triage Captain",
            &[
                "Confirm each breach is real work (dedupe noise)",
                "Escalate blockers",
                "Convert repeats into Problem tickets",
                "Resolve or reclassify with clear notes",
            ],
            targets,
        ));
    }

    if score.reason(ReasonCode::Aging24h).is_some() {
        recs.push(action(
            ActionType::CleanupAgedBacklog,
            "Reduce the 24h+ backlog (close, downgrade, or convert to Problems)".to_string(),
            "Aged incidents often represent stalled work or unclear ownership; cleaning these improves signal quality.",
            "Medium",
            "Ops / Support Lead",
            &[
                "Backlog triage",
                "Close duplicates / invalids",
                "Downgrade low-impact items",
                "Assign owner + next action",
                "Convert systemic repeats into Problems",
            ],
            top_overdue(),
        ));
    }

    recs.push(action(
        ActionType::ImproveClosureHygiene,
        "Improve closure hygiene (resolution notes + valid transitions)".to_string(),
        "Consistent notes/transitions improve learning loops and KPI confidence.",
        "Low-Medium",
        "Ops Lead",
        &[
            "Require resolution notes on resolve",
            "Encourage investigating/mitigated steps",
            "Review repeats weekly",
        ],
        Vec::new(),
    ));

    for (i, rec) in recs.iter_mut().enumerate() {
        rec.rank = i + 1;
    }
    recs
}

fn action(
    action_type: ActionType,
    title: String,
    why: &str,
    expected_impact: &str,
    owner: &str,
    playbook: &[&str],
    target_incidents: Vec<Breach>,
) -> Recommendation {
    Recommendation {
        rank: 0,
        action_type,
        title,
        why: why.to_string(),
        expected_impact: expected_impact.to_string(),
        suggested_owner_role: owner.to_string(),
        playbook: playbook.iter().map(|s| s.to_string()).collect(),
        target_incidents,
    }
}

/// One-line digest of the score, e.g.
/// `Operational health is RED: 2 P0 SLA breach(es). Immediate action required.`
pub fn summarize(score: &HealthScore) -> String {
    let status = score.status.as_str().to_ascii_uppercase();
    if score.reasons.is_empty() {
        return format!("Operational health is {status}: no key risk triggers detected.");
    }

    let labels: Vec<&str> = score.reasons.iter().map(|r| r.label.as_str()).collect();
    let mut summary = format!("Operational health is {status}: {}.", labels.join("; "));
    if score.status == HealthStatus::Red {
        summary.push_str(" Immediate action required.");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriageConfig;
    use crate::health::assess;
    use crate::model::{Incident, Priority};
    use chrono::Duration;

    fn aged(priority: Priority, minutes: i64, now: DateTime<Utc>) -> Incident {
        Incident::open("Payments failing", "card auth 500s", priority, now - Duration::minutes(minutes))
    }

    #[test]
    fn healthy_snapshot_still_gets_hygiene_action() {
        let now = Utc::now();
        let report = assess(now, &[], &[], &TriageConfig::default());
        let recs = recommend(&report, 3);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].rank, 1);
        assert_eq!(recs[0].action_type, ActionType::ImproveClosureHygiene);
        assert!(recs[0].target_incidents.is_empty());
        assert_eq!(
            summarize(&report.score),
            "Operational health is GREEN: no key risk triggers detected."
        );
    }

    #[test]
    fn every_reason_maps_to_an_action_in_rank_order() {
        let now = Utc::now();
        let config = TriageConfig {
            aging_threshold_24h: 1,
            ..TriageConfig::default()
        };
        let mut active = vec![aged(Priority::P0, 100, now), aged(Priority::P0, 90, now)];
        active.extend((0..4).map(|i| aged(Priority::P3, 1500 + i, now)));
        let report = assess(now, &active, &[], &config);
        let recs = recommend(&report, 1);

        let kinds: Vec<_> = recs.iter().map(|r| r.action_type).collect();
        assert_eq!(
            kinds,
            vec![
                ActionType::ResolveP0Breaches,
                ActionType::ResolveTopBreaches,
                ActionType::CleanupAgedBacklog,
                ActionType::ImproveClosureHygiene,
            ]
        );
        let ranks: Vec<_> = recs.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);

        assert_eq!(recs[0].title, "Triage top 1 P0 SLA breach(es)");
        assert_eq!(recs[0].target_incidents[0].id, active[0].id);
        assert_eq!(recs[1].target_incidents.len(), 1);
        assert_eq!(recs[2].target_incidents.len(), 1);
    }

    #[test]
    fn red_summary_lists_labels_and_escalates() {
        let now = Utc::now();
        let report = assess(now, &[aged(Priority::P0, 45, now)], &[], &TriageConfig::default());
        assert_eq!(
            summarize(&report.score),
            "Operational health is RED: 1 P0 SLA breach(es). Immediate action required."
        );
    }

    #[test]
    fn targets_never_exceed_top_n() {
        let now = Utc::now();
        let active: Vec<_> = (0..8).map(|i| aged(Priority::P1, 200 + i, now)).collect();
        let report = assess(now, &active, &[], &TriageConfig::default());
        let recs = recommend(&report, 2);

        let top = recs
            .iter()
            .find(|r| r.action_type == ActionType::ResolveTopBreaches)
            .expect("top breaches action");
        assert_eq!(top.target_incidents.len(), 2);
        assert_eq!(top.title, "Clear the top 2 most overdue SLA breaches");
        assert_eq!(top.target_incidents[0].overdue_minutes, 87);
    }
}
