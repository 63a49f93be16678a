//! Versioned request payloads accepted at the HTTP boundary.
//!
//! Fields stay loosely typed here; enum values are parsed by the core so a
//! bad priority or role surfaces as the core's validation error.

use serde::{Deserialize, Serialize};

pub const TITLE_CHARS: (usize, usize) = (3, 120);
pub const DESCRIPTION_CHARS: (usize, usize) = (10, 5000);
pub const DEFAULT_PRIORITY: &str = "P2";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIncidentV1 {
    pub title: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchIncidentV1 {
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRequestV1 {
    pub title: String,
    pub description: String,
}

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

pub fn validate_create_v1(req: &CreateIncidentV1) -> Result<(), String> {
    check_text("title", &req.title, TITLE_CHARS)?;
    check_text("description", &req.description, DESCRIPTION_CHARS)?;
    if req.priority.trim().is_empty() {
        return Err("priority must not be empty".into());
    }
    Ok(())
}

pub fn validate_patch_v1(req: &PatchIncidentV1) -> Result<(), String> {
    if req.status.trim().is_empty() {
        return Err("status is required".into());
    }
    if let Some(priority) = &req.priority {
        if priority.trim().is_empty() {
            return Err("priority must not be empty when present".into());
        }
    }
    Ok(())
}

pub fn validate_triage_v1(req: &TriageRequestV1) -> Result<(), String> {
    check_text("title", &req.title, TITLE_CHARS)?;
    check_text("description", &req.description, DESCRIPTION_CHARS)
}

fn check_text(field: &str, value: &str, (min, max): (usize, usize)) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(format!(
            "{field} must be between {min} and {max} characters, got {len}"
        ));
    }
    Ok(())
}
