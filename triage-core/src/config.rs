//! Engine configuration.
//!
//! A [`TriageConfig`] is built once (defaults or a `[triage]` TOML table) and
//! handed to [`crate::desk::OpsDesk`]; nothing reads configuration globally.

use crate::desk::{LIST_WINDOW_DAYS, TOP_N};
use crate::model::Priority;
use serde::{Deserialize, Serialize};

/// SLA budget per priority, in minutes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaBudgets {
    #[serde(rename = "P0", alias = "p0")]
    pub p0: i64,
    #[serde(rename = "P1", alias = "p1")]
    pub p1: i64,
    #[serde(rename = "P2", alias = "p2")]
    pub p2: i64,
    #[serde(rename = "P3", alias = "p3")]
    pub p3: i64,
}

impl Default for SlaBudgets {
    fn default() -> Self {
        Self {
            p0: 30,
            p1: 120,
            p2: 480,
            p3: 1440,
        }
    }
}

impl SlaBudgets {
    pub fn minutes_for(&self, priority: Priority) -> i64 {
        match priority {
            Priority::P0 => self.p0,
            Priority::P1 => self.p1,
            Priority::P2 => self.p2,
            Priority::P3 => self.p3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub sla: SlaBudgets,
    /// Total breaches at or above this raise `sla_breaches_total`.
    pub breach_threshold_total: usize,
    /// Incidents aged 24h+ at or above this raise `aging_24h`.
    pub aging_threshold_24h: usize,
    pub mttr_window_days: i64,
    /// Cap on breaches listed in a health report.
    pub breach_report_limit: usize,
    /// Breaches attached to each health reason.
    pub reason_top_incidents: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            sla: SlaBudgets::default(),
            breach_threshold_total: 5,
            aging_threshold_24h: 5,
            mttr_window_days: 7,
            breach_report_limit: 100,
            reason_top_incidents: 3,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl TriageConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for priority in Priority::ALL {
            if self.sla.minutes_for(priority) <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "sla budget for {priority} must be positive"
                )));
            }
        }
        if self.breach_threshold_total == 0 {
            return Err(ConfigError::Invalid("breach_threshold_total must be >= 1".into()));
        }
        if self.aging_threshold_24h == 0 {
            return Err(ConfigError::Invalid("aging_threshold_24h must be >= 1".into()));
        }
        if !LIST_WINDOW_DAYS.contains(&self.mttr_window_days) {
            return Err(ConfigError::Invalid(format!(
                "mttr_window_days must be between {} and {}",
                LIST_WINDOW_DAYS.start(),
                LIST_WINDOW_DAYS.end()
            )));
        }
        if self.breach_report_limit < *TOP_N.end() {
            return Err(ConfigError::Invalid(format!(
                "breach_report_limit must be >= {}",
                TOP_N.end()
            )));
        }
        if self.reason_top_incidents == 0 {
            return Err(ConfigError::Invalid("reason_top_incidents must be >= 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_budgets() {
        let cfg = TriageConfig::default();
        assert_eq!(cfg.sla.minutes_for(Priority::P0), 30);
        assert_eq!(cfg.sla.minutes_for(Priority::P1), 120);
        assert_eq!(cfg.sla.minutes_for(Priority::P2), 480);
        assert_eq!(cfg.sla.minutes_for(Priority::P3), 1440);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let cfg = TriageConfig::from_toml_str(
            r#"
            breach_threshold_total = 2
            [sla]
            P0 = 15
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.breach_threshold_total, 2);
        assert_eq!(cfg.sla.p0, 15);
        assert_eq!(cfg.sla.p1, 120);
        assert_eq!(cfg.aging_threshold_24h, 5);
    }

    #[test]
    fn rejects_zero_budget() {
        let err = TriageConfig::from_toml_str("[sla]\nP2 = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_oversized_window() {
        let err = TriageConfig::from_toml_str("mttr_window_days = 9223372036854775807").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = TriageConfig::from_toml_str("mttr_window_days = 366").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(TriageConfig::from_toml_str("mttr_window_days = 365").is_ok());
    }

    #[test]
    fn rejects_breach_limit_below_largest_top_n() {
        for limit in [0, 9] {
            let err = TriageConfig::from_toml_str(&format!("breach_report_limit = {limit}")).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
        }
        assert!(TriageConfig::from_toml_str("breach_report_limit = 10").is_ok());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = TriageConfig::from_toml_str("breach_threshold_total = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
