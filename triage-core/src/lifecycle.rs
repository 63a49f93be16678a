//! Incident lifecycle state machine.
//!
//! ```text
//! open -> investigating -> mitigated -> resolved
//!                       \------------->/
//! ```
//!
//! `resolved` is terminal. Requesting the current status is always allowed and
//! acts as a carrier for a priority change or a note.

use crate::clock::format_instant;
use crate::error::TriageError;
use crate::model::{EventKind, Incident, Priority, Role, Status};
use crate::timeline::TimelineRecorder;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncidentPatch {
    pub status: Status,
    pub priority: Option<Priority>,
    pub resolved_by: Option<Role>,
    pub resolution_notes: Option<String>,
    pub note: Option<String>,
}

impl IncidentPatch {
    pub fn to(status: Status) -> Self {
        Self {
            status,
            priority: None,
            resolved_by: None,
            resolution_notes: None,
            note: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn resolved(mut self, by: Role, notes: impl Into<String>) -> Self {
        self.resolved_by = Some(by);
        self.resolution_notes = Some(notes.into());
        self
    }
}

/// Patch as received from a client: priority and role still in text form.
/// Blank optional fields count as absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchFields {
    pub status: Status,
    pub priority: Option<String>,
    pub resolved_by: Option<String>,
    pub resolution_notes: Option<String>,
    pub note: Option<String>,
}

impl PatchFields {
    pub fn to(status: Status) -> Self {
        Self {
            status,
            priority: None,
            resolved_by: None,
            resolution_notes: None,
            note: None,
        }
    }

    pub fn into_patch(self) -> Result<IncidentPatch, TriageError> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        Ok(IncidentPatch {
            status: self.status,
            priority: present(self.priority).map(|p| p.parse::<Priority>()).transpose()?,
            resolved_by: present(self.resolved_by).map(|r| r.parse::<Role>()).transpose()?,
            resolution_notes: self.resolution_notes,
            note: self.note,
        })
    }
}

pub fn allowed_transitions(from: Status) -> &'static [Status] {
    match from {
        Status::Open => &[Status::Investigating],
        Status::Investigating => &[Status::Mitigated, Status::Resolved],
        Status::Mitigated => &[Status::Resolved],
        Status::Resolved => &[],
    }
}

pub fn can_transition(from: Status, to: Status) -> bool {
    from == to || allowed_transitions(from).contains(&to)
}

pub fn check_transition(from: Status, to: Status) -> Result<(), TriageError> {
    if can_transition(from, to) {
        return Ok(());
    }
    Err(TriageError::Transition {
        from,
        to,
        allowed: allowed_transitions(from).to_vec(),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub resolved_by: Role,
    pub notes: String,
}

/// A validated patch: only the parts that actually change something.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatchPlan {
    pub status: Option<(Status, Status)>,
    pub priority: Option<(Priority, Priority)>,
    pub note: Option<String>,
    pub resolution: Option<Resolution>,
}

/// Validates `patch` against `current` without touching anything.
pub fn plan_patch(current: &Incident, patch: &IncidentPatch) -> Result<PatchPlan, TriageError> {
    check_transition(current.status, patch.status)?;

    let resolution = if patch.status.is_resolved() && !current.status.is_resolved() {
        let Some(resolved_by) = patch.resolved_by else {
            return Err(TriageError::Precondition(
                "resolved_by is required when resolving".into(),
            ));
        };
        let notes = patch
            .resolution_notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                TriageError::Precondition("resolution_notes is required when resolving".into())
            })?;
        Some(Resolution {
            resolved_by,
            notes: notes.to_string(),
        })
    } else {
        None
    };

    Ok(PatchPlan {
        status: (patch.status != current.status).then_some((current.status, patch.status)),
        priority: patch
            .priority
            .filter(|p| *p != current.priority)
            .map(|p| (current.priority, p)),
        note: patch
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(ToString::to_string),
        resolution,
    })
}

/// Applies a validated plan, recording one timeline event per discrete change.
pub fn apply_plan(
    current: &Incident,
    plan: PatchPlan,
    now: DateTime<Utc>,
    timeline: &mut TimelineRecorder,
) -> Incident {
    let mut next = current.clone();

    if let Some((old, new)) = plan.priority {
        timeline.append_change(EventKind::PriorityChanged, old, new);
        next.priority = new;
    }

    if let Some(note) = plan.note {
        timeline.append(EventKind::NoteAdded, None, Some(note));
    }

    if let Some(resolution) = plan.resolution {
        timeline.append(
            EventKind::ResolvedBy,
            current.resolved_by.map(|r| r.to_string()),
            Some(resolution.resolved_by.to_string()),
        );
        timeline.append(EventKind::ResolutionNotes, None, Some("added".into()));
        timeline.append(
            EventKind::ResolvedAt,
            current.resolved_at.map(format_instant),
            Some(format_instant(now)),
        );
        next.resolved_by = Some(resolution.resolved_by);
        next.resolution_notes = Some(resolution.notes);
        next.resolved_at = Some(now);
    }

    if let Some((old, new)) = plan.status {
        timeline.append_change(EventKind::StatusChanged, old, new);
        next.status = new;
    }

    next.updated_at = now;
    next.revision = current.revision + 1;
    next
}
