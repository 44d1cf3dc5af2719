//! Database enum types for the civic schema.
//!
//! Enums map to PostgreSQL SMALLINT columns. The numeric discriminant is also
//! the fixed sort rank, so SQL-level `ORDER BY` and in-memory ordering agree
//! by construction.

use diesel::deserialize::{self, FromSql};
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::SmallInt;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use std::io::Write;

// ============================================================================
// USER ROLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UserRole {
    Citizen = 0,
    Official = 1,
    HigherOfficial = 2,
}

impl ToSql<SmallInt, Pg> for UserRole {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let v = *self as i16;
        out.write_all(&v.to_be_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<SmallInt, Pg> for UserRole {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match i16::from_sql(bytes)? {
            0 => Ok(Self::Citizen),
            1 => Ok(Self::Official),
            2 => Ok(Self::HigherOfficial),
            v => Err(format!("Unknown UserRole: {v}").into()),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Citizen => write!(f, "citizen"),
            Self::Official => write!(f, "official"),
            Self::HigherOfficial => write!(f, "higher_official"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "citizen" => Ok(Self::Citizen),
            "official" => Ok(Self::Official),
            // Legacy clients sent the role without the underscore.
            "higher_official" | "higherofficial" | "higher official" => Ok(Self::HigherOfficial),
            _ => Err(format!("Unknown user role: {s}")),
        }
    }
}

impl UserRole {
    pub fn is_official(&self) -> bool {
        matches!(self, Self::Official | Self::HigherOfficial)
    }
}

// ============================================================================
// ISSUE STATUS
// ============================================================================

/// Lifecycle states for an issue. The discriminant order is the status rank
/// used for sorting: earlier in the pipeline sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum IssueStatus {
    Created = 0,
    Assigned = 1,
    InProgress = 2,
    Escalated = 3,
    Completed = 4,
    Rejected = 5,
    Closed = 6,
}

impl ToSql<SmallInt, Pg> for IssueStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let v = *self as i16;
        out.write_all(&v.to_be_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<SmallInt, Pg> for IssueStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match i16::from_sql(bytes)? {
            0 => Ok(Self::Created),
            1 => Ok(Self::Assigned),
            2 => Ok(Self::InProgress),
            3 => Ok(Self::Escalated),
            4 => Ok(Self::Completed),
            5 => Ok(Self::Rejected),
            6 => Ok(Self::Closed),
            v => Err(format!("Unknown IssueStatus: {v}").into()),
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Assigned => write!(f, "assigned"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Escalated => write!(f, "escalated"),
            Self::Completed => write!(f, "completed"),
            Self::Rejected => write!(f, "rejected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older clients and the legacy database used several spellings per
        // state; all of them normalize here, at the boundary.
        match s.to_lowercase().as_str() {
            "created" | "pending" | "open" => Ok(Self::Created),
            "assigned" => Ok(Self::Assigned),
            "in_progress" | "in progress" | "inprogress" => Ok(Self::InProgress),
            "escalated" => Ok(Self::Escalated),
            "completed" | "resolved" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown issue status: {s}")),
        }
    }
}

impl IssueStatus {
    /// Terminal states are absorbing: no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Closed)
    }

    pub fn rank(&self) -> i16 {
        *self as i16
    }
}

// ============================================================================
// ISSUE PRIORITY
// ============================================================================

/// Priority tiers. Discriminant doubles as the rank: urgent > high > medium > low.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum IssuePriority {
    Low = 0,
    Medium = 1,
    High = 2,
    Urgent = 3,
}

impl Default for IssuePriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl ToSql<SmallInt, Pg> for IssuePriority {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let v = *self as i16;
        out.write_all(&v.to_be_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<SmallInt, Pg> for IssuePriority {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match i16::from_sql(bytes)? {
            0 => Ok(Self::Low),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            3 => Ok(Self::Urgent),
            v => Err(format!("Unknown IssuePriority: {v}").into()),
        }
    }
}

impl std::fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for IssuePriority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Unknown issue priority: {s}")),
        }
    }
}

impl IssuePriority {
    pub fn rank(&self) -> i16 {
        *self as i16
    }
}

// ============================================================================
// UPDATE TYPES (audit log)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = SmallInt)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum UpdateType {
    StatusChange = 0,
    Assignment = 1,
    Escalation = 2,
    Comment = 3,
}

impl ToSql<SmallInt, Pg> for UpdateType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let v = *self as i16;
        out.write_all(&v.to_be_bytes())?;
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<SmallInt, Pg> for UpdateType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        match i16::from_sql(bytes)? {
            0 => Ok(Self::StatusChange),
            1 => Ok(Self::Assignment),
            2 => Ok(Self::Escalation),
            3 => Ok(Self::Comment),
            v => Err(format!("Unknown UpdateType: {v}").into()),
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusChange => write!(f, "status_change"),
            Self::Assignment => write!(f, "assignment"),
            Self::Escalation => write!(f, "escalation"),
            Self::Comment => write!(f, "comment"),
        }
    }
}

// ============================================================================
// ESCALATION REASONS
// ============================================================================

/// Structured reason codes a citizen can give when escalating early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    NoResponse,
    NoProgress,
    Urgent,
    NotAssigned,
    Other,
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoResponse => write!(f, "no_response"),
            Self::NoProgress => write!(f, "no_progress"),
            Self::Urgent => write!(f, "urgent"),
            Self::NotAssigned => write!(f, "not_assigned"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for EscalationReason {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_response" => Ok(Self::NoResponse),
            "no_progress" => Ok(Self::NoProgress),
            "urgent" => Ok(Self::Urgent),
            "not_assigned" => Ok(Self::NotAssigned),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown escalation reason: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_vocabulary_normalization() {
        assert_eq!(IssueStatus::from_str("pending").unwrap(), IssueStatus::Created);
        assert_eq!(IssueStatus::from_str("open").unwrap(), IssueStatus::Created);
        assert_eq!(IssueStatus::from_str("in progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(IssueStatus::from_str("In_Progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(IssueStatus::from_str("resolved").unwrap(), IssueStatus::Completed);
        assert!(IssueStatus::from_str("unknown").is_err());
    }

    #[test]
    fn test_role_vocabulary_normalization() {
        assert_eq!(UserRole::from_str("higherofficial").unwrap(), UserRole::HigherOfficial);
        assert_eq!(UserRole::from_str("higher_official").unwrap(), UserRole::HigherOfficial);
        assert!(UserRole::from_str("admin").is_err());
    }

    #[test]
    fn test_priority_rank_total_order() {
        assert!(IssuePriority::Urgent.rank() > IssuePriority::High.rank());
        assert!(IssuePriority::High.rank() > IssuePriority::Medium.rank());
        assert!(IssuePriority::Medium.rank() > IssuePriority::Low.rank());
        assert!(IssuePriority::Urgent > IssuePriority::Low);
    }

    #[test]
    fn test_terminal_states() {
        assert!(IssueStatus::Completed.is_terminal());
        assert!(IssueStatus::Rejected.is_terminal());
        assert!(IssueStatus::Closed.is_terminal());
        assert!(!IssueStatus::Created.is_terminal());
        assert!(!IssueStatus::Escalated.is_terminal());
    }

    #[test]
    fn test_display_round_trip() {
        for status in [
            IssueStatus::Created,
            IssueStatus::Assigned,
            IssueStatus::InProgress,
            IssueStatus::Escalated,
            IssueStatus::Completed,
            IssueStatus::Rejected,
            IssueStatus::Closed,
        ] {
            assert_eq!(IssueStatus::from_str(&status.to_string()).unwrap(), status);
        }
    }

    #[test]
    fn test_escalation_reason_codes() {
        assert_eq!(EscalationReason::from_str("no_progress").unwrap(), EscalationReason::NoProgress);
        assert!(EscalationReason::from_str("because").is_err());
    }
}
