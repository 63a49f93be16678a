//! Keyword heuristic that suggests a priority and first-response steps.
//!
//! Fixed and explainable on purpose: identical text always yields the same
//! suggestion.

use crate::model::Priority;
use serde::{Deserialize, Serialize};

const P0_KEYWORDS: &[&str] = &[
    "checkout", "payment", "outage", "500", "down", "failed", "critical", "sev0", "p0",
];
const P1_KEYWORDS: &[&str] = &[
    "activation", "delay", "degraded", "latency", "timeout", "sev1", "p1",
];
const P2_KEYWORDS: &[&str] = &["slow", "backlog", "retry", "webhook", "billing", "p2"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageSuggestion {
    pub suggested_priority: Priority,
    pub next_steps: Vec<String>,
    pub rationale: String,
}

pub fn classify(title: &str, description: &str) -> TriageSuggestion {
    let text = format!("{title}\n{description}").to_lowercase();
    let has = |word: &str| text.contains(word);
    let hits = |keywords: &[&str]| keywords.iter().filter(|&&k| has(k)).count();

    let priority = if hits(P0_KEYWORDS) >= 2 || has("outage") || (has("payment") && has("failed")) {
        Priority::P0
    } else if hits(P1_KEYWORDS) >= 2 || (has("activation") && has("delay")) {
        Priority::P1
    } else if hits(P2_KEYWORDS) >= 1 {
        Priority::P2
    } else {
        Priority::P3
    };

    let (steps, rationale) = playbook(priority);
    TriageSuggestion {
        suggested_priority: priority,
        next_steps: steps.iter().map(|s| s.to_string()).collect(),
        rationale: rationale.to_string(),
    }
}

fn playbook(priority: Priority) -> (&'static [&'static str], &'static str) {
    match priority {
        Priority::P0 => (
            &[
                "Assign an owner (On-call)",
                "Confirm blast radius + impacted customers",
                "Mitigate (rollback/feature flag/traffic shift)",
                "Post status update + next update time",
                "Resolve with notes + follow-ups",
            ],
            "Signals indicate critical customer impact / outage risk.",
        ),
        Priority::P1 => (
            &[
                "Confirm symptoms + metrics (latency/errors)",
                "Engage owning team; check recent changes",
                "Apply mitigation and monitor recovery",
                "Communicate externally if needed",
                "Create follow-up if recurring",
            ],
            "Signals indicate degraded service impacting user experience and SLAs.",
        ),
        Priority::P2 => (
            &[
                "Validate incident is actionable (not duplicate/noise)",
                "Assign ownership + next action",
                "Check breach risk and adjust priority if needed",
                "Convert repeats into Problem ticket",
            ],
            "Signals suggest operational risk/backlog pressure rather than immediate outage.",
        ),
        Priority::P3 => (
            &[
                "Capture context + repro steps",
                "Assign to backlog with acceptance criteria",
                "Review in weekly ops cadence",
            ],
            "Signals suggest low urgency; track for hygiene and prevent future issues.",
        ),
    }
}
