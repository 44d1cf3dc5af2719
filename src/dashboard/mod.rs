//! Role-scoped dashboard feeds: issue pages and per-status statistics for
//! the three dashboards (citizen, official, higher official).

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::enums::{IssueStatus, UserRole};
use crate::core::shared::schema::issues;
use crate::core::shared::state::AppState;
use crate::issues::queries::{self, normalize_page, IssueFilter, ListScope, SortOrder};
use crate::issues::{resolve_actor, IssueListResponse, Pagination};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Per-status issue counts for one dashboard scope.
#[derive(Debug, Default, Serialize)]
pub struct IssueStatistics {
    pub total: i64,
    pub created: i64,
    pub assigned: i64,
    pub in_progress: i64,
    pub escalated: i64,
    pub completed: i64,
    pub rejected: i64,
    pub closed: i64,
}

impl IssueStatistics {
    fn from_counts(counts: Vec<(IssueStatus, i64)>) -> Self {
        let mut stats = Self::default();
        for (status, count) in counts {
            stats.total += count;
            match status {
                IssueStatus::Created => stats.created = count,
                IssueStatus::Assigned => stats.assigned = count,
                IssueStatus::InProgress => stats.in_progress = count,
                IssueStatus::Escalated => stats.escalated = count,
                IssueStatus::Completed => stats.completed = count,
                IssueStatus::Rejected => stats.rejected = count,
                IssueStatus::Closed => stats.closed = count,
            }
        }
        stats
    }
}

fn dashboard_filter(query: &DashboardQuery) -> Result<IssueFilter, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(IssueStatus::from_str)
        .transpose()
        .map_err(ApiError::Validation)?;
    let (page, limit) = normalize_page(query.page, query.limit);
    Ok(IssueFilter {
        status,
        not_status: None,
        category_id: None,
        priority: None,
        sort_by: SortOrder::Newest,
        page,
        limit,
    })
}

fn citizen_scope(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
) -> Result<(ListScope, Uuid), ApiError> {
    let actor = resolve_actor(conn, user)?;
    let citizen_id = actor
        .citizen_id
        .ok_or_else(|| ApiError::Forbidden("Citizen profile required".into()))?;
    Ok((ListScope::Citizen(citizen_id), citizen_id))
}

/// `GET /api/dashboard/citizen/issues`
pub async fn citizen_issues(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<IssueListResponse>, ApiError> {
    user.require_role(&[UserRole::Citizen])?;
    let mut conn = state.conn.get()?;
    let (scope, _) = citizen_scope(&mut conn, &user)?;

    let filter = dashboard_filter(&query)?;
    let (rows, total) = queries::list_issues(&mut conn, &scope, &filter)?;

    Ok(Json(IssueListResponse {
        pagination: Pagination::new(filter.page, filter.limit, total),
        data: rows,
    }))
}

/// `GET /api/dashboard/citizen/statistics`
pub async fn citizen_statistics(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<IssueStatistics>, ApiError> {
    user.require_role(&[UserRole::Citizen])?;
    let mut conn = state.conn.get()?;
    let (_, citizen_id) = citizen_scope(&mut conn, &user)?;

    let counts: Vec<(IssueStatus, i64)> = issues::table
        .filter(issues::citizen_id.eq(citizen_id))
        .group_by(issues::status)
        .select((issues::status, count_star()))
        .load(&mut conn)?;

    Ok(Json(IssueStatistics::from_counts(counts)))
}

/// `GET /api/dashboard/official/issues` — the official's department queue,
/// excluding the escalated pool (that belongs to higher officials).
pub async fn official_issues(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<IssueListResponse>, ApiError> {
    user.require_role(&[UserRole::Official, UserRole::HigherOfficial])?;
    let mut conn = state.conn.get()?;

    let actor = resolve_actor(&mut conn, &user)?;
    let department = actor
        .department
        .ok_or_else(|| ApiError::Forbidden("Official has no department".into()))?;

    let scope = ListScope::Official {
        user_id: actor.user_id,
        category_ids: queries::department_category_ids(&mut conn, &department)?,
    };

    // Escalated issues leave the official queue until a higher official
    // hands them back.
    let mut filter = dashboard_filter(&query)?;
    filter.not_status = Some(IssueStatus::Escalated);
    if filter.status == Some(IssueStatus::Escalated) {
        filter.status = None;
    }
    let (rows, total) = queries::list_issues(&mut conn, &scope, &filter)?;

    Ok(Json(IssueListResponse {
        pagination: Pagination::new(filter.page, filter.limit, total),
        data: rows,
    }))
}

/// `GET /api/dashboard/higher-official/issues` — the escalated pool.
pub async fn higher_official_issues(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<IssueListResponse>, ApiError> {
    user.require_role(&[UserRole::HigherOfficial])?;
    let mut conn = state.conn.get()?;

    let filter = dashboard_filter(&query)?;
    let (rows, total) = queries::list_issues(&mut conn, &ListScope::Escalated, &filter)?;

    Ok(Json(IssueListResponse {
        pagination: Pagination::new(filter.page, filter.limit, total),
        data: rows,
    }))
}

pub fn configure_dashboard_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard/citizen/issues", get(citizen_issues))
        .route("/api/dashboard/citizen/statistics", get(citizen_statistics))
        .route("/api/dashboard/official/issues", get(official_issues))
        .route(
            "/api/dashboard/higher-official/issues",
            get(higher_official_issues),
        )
}
