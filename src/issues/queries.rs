//! Query and filter assembly for issue listings.
//!
//! Sorting uses the enum discriminant rank from `core::shared::enums`, so the
//! SQL `ORDER BY` and any in-memory ordering can never diverge. Pagination
//! reports the full filtered count, not the page length.

use diesel::prelude::*;
use diesel::PgConnection;
use serde::Deserialize;
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::shared::enums::{IssuePriority, IssueStatus};
use crate::core::shared::schema::{issue_categories, issues};
use crate::issues::Issue;

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Newest,
    Oldest,
    Priority,
    Status,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Newest
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "priority" => Ok(Self::Priority),
            "status" => Ok(Self::Status),
            _ => Err(format!("Unknown sort order: {s}")),
        }
    }
}

/// Validated filter set for a listing request.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    /// Excluded status, applied after `status` (used to keep escalated
    /// issues out of the official queue).
    pub not_status: Option<IssueStatus>,
    pub category_id: Option<Uuid>,
    pub priority: Option<IssuePriority>,
    pub sort_by: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl IssueFilter {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Clamp raw pagination inputs into the valid window.
pub fn normalize_page(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

/// Who the listing is for; decides the base row set before filters apply.
#[derive(Debug, Clone)]
pub enum ListScope {
    /// A citizen sees only their own issues.
    Citizen(Uuid),
    /// An official sees issues in their department plus their assignments.
    Official {
        user_id: Uuid,
        category_ids: Vec<Uuid>,
    },
    /// A higher official reads everything.
    HigherOfficial,
    /// The escalated pool (higher-official dashboard).
    Escalated,
}

/// Resolve the category ids belonging to a department. Used to build the
/// official scope without a join in the hot listing query.
pub fn department_category_ids(
    conn: &mut PgConnection,
    department: &str,
) -> Result<Vec<Uuid>, ApiError> {
    let ids = issue_categories::table
        .filter(issue_categories::department.eq(department))
        .select(issue_categories::id)
        .load(conn)?;
    Ok(ids)
}

fn scoped_filtered<'a>(scope: &ListScope, filter: &IssueFilter) -> issues::BoxedQuery<'a, diesel::pg::Pg> {
    let mut q = issues::table.into_boxed();

    match scope {
        ListScope::Citizen(citizen_id) => {
            q = q.filter(issues::citizen_id.eq(*citizen_id));
        }
        ListScope::Official {
            user_id,
            category_ids,
        } => {
            q = q.filter(
                issues::assigned_to
                    .eq(Some(*user_id))
                    .or(issues::category_id.eq_any(category_ids.clone())),
            );
        }
        ListScope::HigherOfficial => {}
        ListScope::Escalated => {
            q = q.filter(issues::status.eq(IssueStatus::Escalated));
        }
    }

    if let Some(status) = filter.status {
        q = q.filter(issues::status.eq(status));
    }
    if let Some(not_status) = filter.not_status {
        q = q.filter(issues::status.ne(not_status));
    }
    if let Some(category_id) = filter.category_id {
        q = q.filter(issues::category_id.eq(category_id));
    }
    if let Some(priority) = filter.priority {
        q = q.filter(issues::priority.eq(priority));
    }

    q
}

/// Run the listing: one page of rows plus the total count over the same
/// filtered scope. The count intentionally ignores LIMIT/OFFSET.
pub fn list_issues(
    conn: &mut PgConnection,
    scope: &ListScope,
    filter: &IssueFilter,
) -> Result<(Vec<Issue>, i64), ApiError> {
    let total: i64 = scoped_filtered(scope, filter)
        .count()
        .get_result(conn)?;

    let mut q = scoped_filtered(scope, filter);
    q = match filter.sort_by {
        SortOrder::Newest => q.order(issues::created_at.desc()),
        SortOrder::Oldest => q.order(issues::created_at.asc()),
        SortOrder::Priority => q.order((issues::priority.desc(), issues::created_at.desc())),
        SortOrder::Status => q.order((issues::status.asc(), issues::created_at.desc())),
    };

    let rows = q
        .limit(filter.limit)
        .offset(filter.offset())
        .load(conn)?;

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(SortOrder::from_str("newest").unwrap(), SortOrder::Newest);
        assert_eq!(SortOrder::from_str("Priority").unwrap(), SortOrder::Priority);
        assert!(SortOrder::from_str("random").is_err());
    }

    #[test]
    fn test_normalize_page_defaults() {
        assert_eq!(normalize_page(None, None), (1, DEFAULT_PAGE_LIMIT));
    }

    #[test]
    fn test_normalize_page_clamps() {
        assert_eq!(normalize_page(Some(0), Some(0)), (1, 1));
        assert_eq!(normalize_page(Some(-3), Some(10_000)), (1, MAX_PAGE_LIMIT));
        assert_eq!(normalize_page(Some(2), Some(10)), (2, 10));
    }

    #[test]
    fn test_offset_computation() {
        let filter = IssueFilter {
            page: 2,
            limit: 10,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 10);

        let filter = IssueFilter {
            page: 1,
            limit: 25,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 0);

        let filter = IssueFilter {
            page: 5,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 80);
    }
}
