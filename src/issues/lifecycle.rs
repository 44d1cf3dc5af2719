//! Issue lifecycle engine.
//!
//! Validates every status transition before any row is touched: edge
//! membership in the transition table, actor role, ownership/assignment
//! scope, and per-edge preconditions. All checks are pure functions over
//! snapshots, so the whole policy is unit-testable without a database.
//!
//! State machine:
//!
//! ```text
//! created -> assigned -> in_progress -> completed | rejected -> closed
//!    \            \________/    |
//!     \______________________ escalated -> in_progress | completed | rejected
//! ```
//!
//! `completed`, `rejected` and `closed` are terminal. The single exception is
//! the administrative `completed/rejected -> closed` edge; everything else on
//! a terminal issue fails with a locked-issue error.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::shared::enums::{
    EscalationReason, IssueStatus, UpdateType, UserRole,
};

/// Citizens may escalate without a structured reason once the issue is this old.
pub const ESCALATION_MIN_AGE_DAYS: i64 = 30;
/// Mandatory comments (progress notes, resolutions, rejections, escalation notes).
pub const MIN_COMMENT_LENGTH: usize = 10;
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// The slice of an issue the policy needs to decide anything.
#[derive(Debug, Clone)]
pub struct IssueSnapshot {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub status: IssueStatus,
    pub assigned_to: Option<Uuid>,
    pub category_department: String,
    pub created_at: DateTime<Utc>,
}

/// The acting user, with the department resolved for officials.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
    pub citizen_id: Option<Uuid>,
    pub department: Option<String>,
}

/// The target of an assignment, resolved from the users table.
#[derive(Debug, Clone)]
pub struct AssigneeSnapshot {
    pub user_id: Uuid,
    pub role: UserRole,
    pub department: Option<String>,
}

// ============================================================================
// Transition table
// ============================================================================

/// Roles allowed to drive a given edge. `None` means the edge does not exist.
/// This is the single authoritative copy of the transition table; anything
/// not listed here is rejected.
fn allowed_roles(from: IssueStatus, to: IssueStatus) -> Option<&'static [UserRole]> {
    use IssueStatus::*;
    use UserRole::*;

    const OFFICIALS: &[UserRole] = &[Official, HigherOfficial];
    const CITIZEN: &[UserRole] = &[Citizen];
    const HIGHER: &[UserRole] = &[HigherOfficial];

    match (from, to) {
        (Created, Assigned) => Some(OFFICIALS),
        (Created | Assigned | InProgress, InProgress) => Some(OFFICIALS),
        (Created | InProgress, Escalated) => Some(CITIZEN),
        (Escalated, InProgress | Completed | Rejected) => Some(HIGHER),
        (InProgress, Completed | Rejected) => Some(OFFICIALS),
        (Completed | Rejected, Closed) => Some(OFFICIALS),
        _ => None,
    }
}

/// Whether this edge requires a comment of at least [`MIN_COMMENT_LENGTH`].
fn requires_comment(from: IssueStatus, to: IssueStatus) -> bool {
    use IssueStatus::*;
    match (from, to) {
        // Assignment and the administrative close are the only quiet edges.
        (Created, Assigned) => false,
        (Completed | Rejected, Closed) => false,
        _ => true,
    }
}

fn update_type_for(to: IssueStatus) -> UpdateType {
    match to {
        IssueStatus::Assigned => UpdateType::Assignment,
        IssueStatus::Escalated => UpdateType::Escalation,
        _ => UpdateType::StatusChange,
    }
}

// ============================================================================
// Authorization guard
// ============================================================================

/// Read access: citizens see their own issues, officials their department or
/// assignments, higher officials everything.
pub fn authorize_read(issue: &IssueSnapshot, actor: &Actor) -> Result<(), ApiError> {
    match actor.role {
        UserRole::Citizen => {
            if actor.citizen_id == Some(issue.citizen_id) {
                Ok(())
            } else {
                Err(ApiError::Forbidden(
                    "You can only view your own issues".into(),
                ))
            }
        }
        UserRole::Official => {
            let assigned = issue.assigned_to == Some(actor.user_id);
            let department_match = actor.department.as_deref() == Some(&issue.category_department);
            if assigned || department_match {
                Ok(())
            } else {
                Err(ApiError::Forbidden(
                    "Issue is outside your department".into(),
                ))
            }
        }
        UserRole::HigherOfficial => Ok(()),
    }
}

/// Write scope for officials and higher officials. Citizens never pass; their
/// only mutations (escalate, comment) carry their own ownership checks.
fn authorize_write(issue: &IssueSnapshot, actor: &Actor) -> Result<(), ApiError> {
    match actor.role {
        UserRole::Citizen => Err(ApiError::Forbidden(
            "Citizens cannot change issue status".into(),
        )),
        UserRole::Official => {
            let assigned = issue.assigned_to == Some(actor.user_id);
            // Unassigned issues are writable department-wide so triage can
            // happen before anyone is assigned.
            let department_claim = issue.assigned_to.is_none()
                && actor.department.as_deref() == Some(&issue.category_department);
            if assigned || department_claim {
                Ok(())
            } else {
                Err(ApiError::Forbidden(
                    "You are not assigned to this issue".into(),
                ))
            }
        }
        UserRole::HigherOfficial => {
            // Higher officials own the escalated pool outright; elsewhere
            // they fall back to the same department scoping as officials.
            if issue.status == IssueStatus::Escalated {
                Ok(())
            } else {
                let department_match =
                    actor.department.as_deref() == Some(&issue.category_department);
                if department_match || issue.assigned_to == Some(actor.user_id) {
                    Ok(())
                } else {
                    Err(ApiError::Forbidden(
                        "Issue is outside your department".into(),
                    ))
                }
            }
        }
    }
}

// ============================================================================
// Transition validation
// ============================================================================

/// Validate a status transition end to end. Returns the audit-log entry type
/// to record when the transition is applied.
pub fn validate_transition(
    issue: &IssueSnapshot,
    actor: &Actor,
    target: IssueStatus,
    comment: &str,
) -> Result<UpdateType, ApiError> {
    // Terminal states absorb everything except the administrative close.
    if issue.status.is_terminal() && !(target == IssueStatus::Closed && allowed_roles(issue.status, target).is_some()) {
        return Err(ApiError::LockedIssue(issue.status));
    }

    let roles = allowed_roles(issue.status, target).ok_or(ApiError::InvalidTransition {
        from: issue.status,
        to: target,
    })?;

    if !roles.contains(&actor.role) {
        return Err(ApiError::Forbidden(format!(
            "Role {} cannot move an issue from {} to {}",
            actor.role, issue.status, target
        )));
    }

    authorize_write(issue, actor)?;

    if requires_comment(issue.status, target) {
        validate_comment(comment)?;
    }

    Ok(update_type_for(target))
}

/// Validate an assignment: the engine only ever assigns to working officials
/// in the issue's department.
pub fn validate_assignment(
    issue: &IssueSnapshot,
    actor: &Actor,
    assignee: &AssigneeSnapshot,
) -> Result<UpdateType, ApiError> {
    let update_type = validate_transition(issue, actor, IssueStatus::Assigned, "")?;

    if assignee.role != UserRole::Official {
        return Err(ApiError::Validation(
            "Assignee must be an official".into(),
        ));
    }
    if assignee.department.as_deref() != Some(&issue.category_department) {
        return Err(ApiError::Validation(format!(
            "Assignee is not in the {} department",
            issue.category_department
        )));
    }

    Ok(update_type)
}

// ============================================================================
// Escalation policy
// ============================================================================

/// Escalation eligibility: owning citizen only, from `created` or
/// `in_progress`, and either the issue is old enough or a structured reason
/// plus note is supplied.
pub fn validate_escalation(
    issue: &IssueSnapshot,
    actor: &Actor,
    reason: Option<EscalationReason>,
    note: &str,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    if actor.role != UserRole::Citizen {
        return Err(ApiError::Forbidden("Only citizens can escalate".into()));
    }
    if actor.citizen_id != Some(issue.citizen_id) {
        return Err(ApiError::Forbidden(
            "You can only escalate your own issues".into(),
        ));
    }

    if issue.status.is_terminal() {
        return Err(ApiError::LockedIssue(issue.status));
    }
    if !matches!(issue.status, IssueStatus::Created | IssueStatus::InProgress) {
        // Covers escalated -> escalated and assigned -> escalated.
        return Err(ApiError::InvalidTransition {
            from: issue.status,
            to: IssueStatus::Escalated,
        });
    }

    let age_days = (now - issue.created_at).num_days();
    if age_days >= ESCALATION_MIN_AGE_DAYS {
        // Old enough: the note is still recorded but a reason is not required.
        if !note.is_empty() {
            validate_comment(note)?;
        }
        return Ok(());
    }

    if reason.is_none() {
        return Err(ApiError::Validation(format!(
            "Issues younger than {ESCALATION_MIN_AGE_DAYS} days need an escalation reason"
        )));
    }
    validate_comment(note)?;

    Ok(())
}

/// Shared note/comment validation for mandatory-comment edges.
pub fn validate_comment(comment: &str) -> Result<(), ApiError> {
    let trimmed = comment.trim();
    if trimmed.chars().count() < MIN_COMMENT_LENGTH {
        return Err(ApiError::Validation(format!(
            "Comment must be at least {MIN_COMMENT_LENGTH} characters"
        )));
    }
    if trimmed.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ApiError::Validation(format!(
            "Comment cannot exceed {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ALL_STATUSES: [IssueStatus; 7] = [
        IssueStatus::Created,
        IssueStatus::Assigned,
        IssueStatus::InProgress,
        IssueStatus::Escalated,
        IssueStatus::Completed,
        IssueStatus::Rejected,
        IssueStatus::Closed,
    ];

    const ALL_ROLES: [UserRole; 3] = [
        UserRole::Citizen,
        UserRole::Official,
        UserRole::HigherOfficial,
    ];

    fn issue_in(status: IssueStatus) -> IssueSnapshot {
        IssueSnapshot {
            id: Uuid::new_v4(),
            citizen_id: Uuid::new_v4(),
            status,
            assigned_to: None,
            category_department: "Water Supply".into(),
            created_at: Utc::now() - Duration::days(1),
        }
    }

    fn official_for(issue: &IssueSnapshot) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role: UserRole::Official,
            citizen_id: None,
            department: Some(issue.category_department.clone()),
        }
    }

    fn higher_official() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role: UserRole::HigherOfficial,
            citizen_id: None,
            department: Some("Water Supply".into()),
        }
    }

    fn owner_of(issue: &IssueSnapshot) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role: UserRole::Citizen,
            citizen_id: Some(issue.citizen_id),
            department: None,
        }
    }

    #[test]
    fn test_transition_table_is_total() {
        // Every (from, to, role) triple outside the declared table must be
        // rejected, and never silently accepted.
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                for role in ALL_ROLES {
                    let issue = issue_in(from);
                    let actor = match role {
                        UserRole::Citizen => owner_of(&issue),
                        UserRole::Official => official_for(&issue),
                        UserRole::HigherOfficial => higher_official(),
                    };
                    let result = validate_transition(
                        &issue,
                        &actor,
                        to,
                        "a perfectly valid comment",
                    );

                    let declared = allowed_roles(from, to)
                        .map(|roles| roles.contains(&role))
                        .unwrap_or(false);
                    // Citizens drive escalation through validate_escalation,
                    // not the status endpoint.
                    let expected_ok = declared && role != UserRole::Citizen;
                    assert_eq!(
                        result.is_ok(),
                        expected_ok,
                        "from={from} to={to} role={role}: got {result:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_happy_path_edges() {
        let issue = issue_in(IssueStatus::InProgress);
        let actor = official_for(&issue);

        let kind = validate_transition(&issue, &actor, IssueStatus::Completed, "fixed the main valve")
            .expect("completion should validate");
        assert_eq!(kind, UpdateType::StatusChange);

        let issue = issue_in(IssueStatus::Created);
        let actor = official_for(&issue);
        let kind = validate_transition(&issue, &actor, IssueStatus::InProgress, "crew dispatched on site")
            .expect("progress should validate");
        assert_eq!(kind, UpdateType::StatusChange);
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [IssueStatus::Completed, IssueStatus::Rejected, IssueStatus::Closed] {
            let issue = issue_in(terminal);
            let actor = higher_official();

            for target in [
                IssueStatus::Assigned,
                IssueStatus::InProgress,
                IssueStatus::Escalated,
                IssueStatus::Completed,
            ] {
                let result = validate_transition(&issue, &actor, target, "trying to reopen this one");
                assert!(
                    matches!(result, Err(ApiError::LockedIssue(_))),
                    "terminal={terminal} target={target}: got {result:?}"
                );
            }
        }

        // The one exception: completed/rejected admit the administrative close.
        for closable in [IssueStatus::Completed, IssueStatus::Rejected] {
            let issue = issue_in(closable);
            let actor = official_for(&issue);
            assert!(validate_transition(&issue, &actor, IssueStatus::Closed, "").is_ok());
        }

        // Closed is fully absorbing: even close-again fails.
        let issue = issue_in(IssueStatus::Closed);
        let actor = official_for(&issue);
        assert!(matches!(
            validate_transition(&issue, &actor, IssueStatus::Closed, ""),
            Err(ApiError::LockedIssue(_))
        ));
    }

    #[test]
    fn test_mandatory_comment_enforced() {
        let issue = issue_in(IssueStatus::InProgress);
        let actor = official_for(&issue);

        for comment in ["", "short", "         "] {
            let result = validate_transition(&issue, &actor, IssueStatus::Completed, comment);
            assert!(
                matches!(result, Err(ApiError::Validation(_))),
                "comment={comment:?}: got {result:?}"
            );
        }
    }

    #[test]
    fn test_unassigned_official_cannot_write_foreign_department() {
        let issue = issue_in(IssueStatus::Created);
        let actor = Actor {
            department: Some("Roads".into()),
            ..official_for(&issue)
        };
        let result = validate_transition(&issue, &actor, IssueStatus::InProgress, "looking into it now");
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_assigned_official_keeps_write_access() {
        let mut issue = issue_in(IssueStatus::InProgress);
        let actor = Actor {
            department: Some("Roads".into()),
            ..official_for(&issue)
        };
        issue.assigned_to = Some(actor.user_id);
        assert!(
            validate_transition(&issue, &actor, IssueStatus::Completed, "patched and verified").is_ok()
        );
    }

    #[test]
    fn test_department_official_cannot_write_issue_assigned_to_peer() {
        let mut issue = issue_in(IssueStatus::InProgress);
        issue.assigned_to = Some(Uuid::new_v4());
        // Same department, but the issue belongs to a colleague now.
        let actor = official_for(&issue);
        let result = validate_transition(&issue, &actor, IssueStatus::Completed, "wrapping this one up");
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_official_cannot_touch_escalated_issue() {
        let issue = issue_in(IssueStatus::Escalated);
        let actor = official_for(&issue);
        let result = validate_transition(&issue, &actor, IssueStatus::Completed, "done with this one");
        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn test_higher_official_resolves_escalated_issue() {
        let issue = issue_in(IssueStatus::Escalated);
        let actor = higher_official();
        assert!(
            validate_transition(&issue, &actor, IssueStatus::Completed, "resolved after review").is_ok()
        );
        assert!(
            validate_transition(&issue, &actor, IssueStatus::InProgress, "reassigned to field crew")
                .is_ok()
        );
    }

    #[test]
    fn test_assignment_requires_matching_department_official() {
        let issue = issue_in(IssueStatus::Created);
        let actor = official_for(&issue);

        let good = AssigneeSnapshot {
            user_id: Uuid::new_v4(),
            role: UserRole::Official,
            department: Some("Water Supply".into()),
        };
        assert_eq!(
            validate_assignment(&issue, &actor, &good).expect("should validate"),
            UpdateType::Assignment
        );

        let wrong_department = AssigneeSnapshot {
            department: Some("Roads".into()),
            ..good.clone()
        };
        assert!(matches!(
            validate_assignment(&issue, &actor, &wrong_department),
            Err(ApiError::Validation(_))
        ));

        let not_an_official = AssigneeSnapshot {
            role: UserRole::Citizen,
            ..good
        };
        assert!(matches!(
            validate_assignment(&issue, &actor, &not_an_official),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_escalation_with_reason_and_note() {
        let issue = issue_in(IssueStatus::InProgress);
        let actor = owner_of(&issue);

        validate_escalation(
            &issue,
            &actor,
            Some(EscalationReason::NoProgress),
            "15+ days no action taken",
            Utc::now(),
        )
        .expect("escalation should validate");
    }

    #[test]
    fn test_escalation_by_age_alone() {
        let mut issue = issue_in(IssueStatus::Created);
        issue.created_at = Utc::now() - Duration::days(ESCALATION_MIN_AGE_DAYS + 1);
        let actor = owner_of(&issue);

        validate_escalation(&issue, &actor, None, "", Utc::now())
            .expect("old issues escalate without a reason");
    }

    #[test]
    fn test_young_escalation_needs_reason_and_note() {
        let issue = issue_in(IssueStatus::Created);
        let actor = owner_of(&issue);

        // No reason at all.
        assert!(matches!(
            validate_escalation(&issue, &actor, None, "", Utc::now()),
            Err(ApiError::Validation(_))
        ));
        // Reason but the note is too short.
        assert!(matches!(
            validate_escalation(&issue, &actor, Some(EscalationReason::Urgent), "help", Utc::now()),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_escalation_is_not_repeatable() {
        let issue = issue_in(IssueStatus::Escalated);
        let actor = owner_of(&issue);
        assert!(matches!(
            validate_escalation(
                &issue,
                &actor,
                Some(EscalationReason::NoProgress),
                "still nothing happening",
                Utc::now()
            ),
            Err(ApiError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_escalating_terminal_issue_is_locked() {
        let issue = issue_in(IssueStatus::Completed);
        let actor = owner_of(&issue);
        assert!(matches!(
            validate_escalation(
                &issue,
                &actor,
                Some(EscalationReason::Other),
                "not actually fixed at all",
                Utc::now()
            ),
            Err(ApiError::LockedIssue(_))
        ));
    }

    #[test]
    fn test_non_owner_cannot_escalate() {
        let issue = issue_in(IssueStatus::Created);
        let stranger = Actor {
            user_id: Uuid::new_v4(),
            role: UserRole::Citizen,
            citizen_id: Some(Uuid::new_v4()),
            department: None,
        };
        assert!(matches!(
            validate_escalation(
                &issue,
                &stranger,
                Some(EscalationReason::Urgent),
                "this is not even my issue",
                Utc::now()
            ),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_read_scoping() {
        let issue = issue_in(IssueStatus::Created);

        assert!(authorize_read(&issue, &owner_of(&issue)).is_ok());
        assert!(authorize_read(&issue, &official_for(&issue)).is_ok());
        assert!(authorize_read(&issue, &higher_official()).is_ok());

        let stranger = Actor {
            user_id: Uuid::new_v4(),
            role: UserRole::Citizen,
            citizen_id: Some(Uuid::new_v4()),
            department: None,
        };
        assert!(matches!(
            authorize_read(&issue, &stranger),
            Err(ApiError::Forbidden(_))
        ));

        let foreign_official = Actor {
            department: Some("Roads".into()),
            ..official_for(&issue)
        };
        assert!(matches!(
            authorize_read(&issue, &foreign_official),
            Err(ApiError::Forbidden(_))
        ));
    }
}
