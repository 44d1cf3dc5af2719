//! Issue tracking: models, HTTP handlers, and the transactional glue between
//! the lifecycle engine and the store.
//!
//! Every applied transition mutates the issue row and appends exactly one
//! audit-log row inside a single database transaction, with a
//! compare-and-swap on the expected current status so concurrent writers
//! serialize instead of clobbering each other.

pub mod lifecycle;
pub mod queries;
pub mod timeline;

use axum::extract::multipart::Multipart;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::attachments::{self, AttachmentMeta};
use crate::core::error::ApiError;
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::enums::{
    EscalationReason, IssuePriority, IssueStatus, UpdateType, UserRole,
};
use crate::core::shared::schema::{
    attachments as attachments_table, citizens, issue_categories, issue_updates, issues, users,
};
use crate::core::shared::state::AppState;
use lifecycle::{Actor, AssigneeSnapshot, IssueSnapshot};
use queries::{normalize_page, IssueFilter, ListScope, SortOrder};
use timeline::{timeline_for, Timeline};

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = issues)]
pub struct Issue {
    pub id: Uuid,
    pub citizen_id: Uuid,
    pub title: String,
    pub description: String,
    pub category_id: Uuid,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    pub assigned_to: Option<Uuid>,
    pub remarks: Option<String>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub modified_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Append-only audit-log row. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = issue_updates)]
pub struct IssueUpdate {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author_id: Uuid,
    pub old_status: Option<IssueStatus>,
    pub new_status: Option<IssueStatus>,
    pub comment: String,
    pub update_type: UpdateType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = issue_categories)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub department: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request / response types
// ============================================================================

// Missing fields surface as 400 validation errors, not deserialization
// rejections, so the fields stay optional here and are checked in handlers.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangeStatusRequest {
    pub status: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AssignRequest {
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EscalateRequest {
    pub reason: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<Uuid>,
    pub priority: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IssueListResponse {
    pub data: Vec<Issue>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct IssueUpdateView {
    #[serde(flatten)]
    pub update: IssueUpdate,
    pub author_name: String,
    pub author_role: UserRole,
}

#[derive(Debug, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: Issue,
    pub category_name: String,
    pub timeline: Timeline,
    pub attachments: Vec<AttachmentMeta>,
    pub updates: Vec<IssueUpdateView>,
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub category: String,
    #[serde(flatten)]
    pub timeline: Timeline,
}

// ============================================================================
// Shared lookups
// ============================================================================

/// Load the issue plus the policy snapshot (with the category's department
/// resolved). 404 when the id is unknown.
pub fn load_snapshot(
    conn: &mut PgConnection,
    issue_id: Uuid,
) -> Result<(IssueSnapshot, Issue), ApiError> {
    let issue: Issue = issues::table
        .find(issue_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Issue not found".into()))?;

    let department: String = issue_categories::table
        .find(issue.category_id)
        .select(issue_categories::department)
        .first(conn)?;

    let snapshot = IssueSnapshot {
        id: issue.id,
        citizen_id: issue.citizen_id,
        status: issue.status,
        assigned_to: issue.assigned_to,
        category_department: department,
        created_at: issue.created_at,
    };
    Ok((snapshot, issue))
}

/// Build the policy actor for the authenticated user, resolving the
/// department for officials from the store.
pub fn resolve_actor(
    conn: &mut PgConnection,
    user: &AuthenticatedUser,
) -> Result<Actor, ApiError> {
    let department = if user.role.is_official() {
        users::table
            .find(user.user_id)
            .select(users::department)
            .first::<Option<String>>(conn)
            .optional()?
            .flatten()
    } else {
        None
    };

    let citizen_id = match (user.role, user.citizen_id) {
        (UserRole::Citizen, Some(id)) => Some(id),
        (UserRole::Citizen, None) => citizens::table
            .filter(citizens::user_id.eq(user.user_id))
            .select(citizens::id)
            .first(conn)
            .optional()?,
        _ => None,
    };

    Ok(Actor {
        user_id: user.user_id,
        role: user.role,
        citizen_id,
        department,
    })
}

// ============================================================================
// Transition application
// ============================================================================

/// Apply a validated transition: CAS on the expected status, target-specific
/// column updates, one audit-log row, and any comment attachments, all in one
/// transaction. A lost race rolls back and surfaces as a conflict.
#[allow(clippy::too_many_arguments)]
fn apply_transition(
    conn: &mut PgConnection,
    snapshot: &IssueSnapshot,
    actor: &Actor,
    target: IssueStatus,
    comment: &str,
    update_type: UpdateType,
    assigned_to: Option<Uuid>,
    force_priority: Option<IssuePriority>,
) -> Result<Issue, ApiError> {
    let now = Utc::now();
    let issue_id = snapshot.id;
    let expected = snapshot.status;

    conn.transaction::<Issue, ApiError, _>(|conn| {
        let updated = diesel::update(
            issues::table
                .filter(issues::id.eq(issue_id))
                .filter(issues::status.eq(expected)),
        )
        .set((
            issues::status.eq(target),
            issues::modified_at.eq(now),
            issues::modified_by.eq(Some(actor.user_id)),
        ))
        .execute(conn)?;

        if updated == 0 {
            warn!(%issue_id, %expected, %target, "Concurrent transition lost the race");
            return Err(ApiError::Conflict(
                "Issue was modified by another request; reload and retry".into(),
            ));
        }

        if !comment.is_empty() {
            diesel::update(issues::table.find(issue_id))
                .set(issues::remarks.eq(Some(comment.to_string())))
                .execute(conn)?;
        }

        if let Some(assignee) = assigned_to {
            diesel::update(issues::table.find(issue_id))
                .set(issues::assigned_to.eq(Some(assignee)))
                .execute(conn)?;
        }

        if let Some(priority) = force_priority {
            diesel::update(issues::table.find(issue_id))
                .set(issues::priority.eq(priority))
                .execute(conn)?;
        }

        match target {
            IssueStatus::Completed => {
                diesel::update(issues::table.find(issue_id))
                    .set((
                        issues::resolution_note.eq(Some(comment.to_string())),
                        issues::resolved_at.eq(Some(now)),
                    ))
                    .execute(conn)?;
            }
            IssueStatus::Rejected => {
                diesel::update(issues::table.find(issue_id))
                    .set(issues::resolution_note.eq(Some(comment.to_string())))
                    .execute(conn)?;
            }
            IssueStatus::Closed => {
                diesel::update(issues::table.find(issue_id))
                    .set(issues::closed_at.eq(Some(now)))
                    .execute(conn)?;
            }
            _ => {}
        }

        let update = IssueUpdate {
            id: Uuid::new_v4(),
            issue_id,
            author_id: actor.user_id,
            old_status: Some(expected),
            new_status: Some(target),
            comment: comment.to_string(),
            update_type,
            created_at: now,
        };
        diesel::insert_into(issue_updates::table)
            .values(&update)
            .execute(conn)?;

        issues::table.find(issue_id).first(conn).map_err(Into::into)
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /api/issues` — multipart form: title, description, category_id,
/// optional priority, up to five `attachments` files.
pub async fn create_issue(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Issue>), ApiError> {
    user.require_role(&[UserRole::Citizen])?;

    let (fields, files) =
        attachments::collect_multipart(&mut multipart, &state.config.uploads).await?;

    let title = fields
        .get("title")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Title is required".into()))?;
    if title.chars().count() > 255 {
        return Err(ApiError::Validation("Title cannot exceed 255 characters".into()));
    }

    let description = fields
        .get("description")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Description is required".into()))?;
    if description.chars().count() > 2000 {
        return Err(ApiError::Validation(
            "Description cannot exceed 2000 characters".into(),
        ));
    }

    let category_id = fields
        .get("category_id")
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ApiError::Validation("Category is required".into()))?;

    let priority = match fields.get("priority") {
        Some(raw) => IssuePriority::from_str(raw).map_err(ApiError::Validation)?,
        None => IssuePriority::default(),
    };

    let mut conn = state.conn.get()?;

    let category: Category = issue_categories::table
        .find(category_id)
        .filter(issue_categories::active.eq(true))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::Validation("Invalid category selected".into()))?;

    let actor = resolve_actor(&mut conn, &user)?;
    let citizen_id = actor
        .citizen_id
        .ok_or_else(|| ApiError::Forbidden("Citizen profile required".into()))?;

    let now = Utc::now();
    let issue = Issue {
        id: Uuid::new_v4(),
        citizen_id,
        title,
        description,
        category_id,
        priority,
        status: IssueStatus::Created,
        assigned_to: None,
        remarks: None,
        resolution_note: None,
        created_at: now,
        modified_at: now,
        modified_by: Some(user.user_id),
        resolved_at: None,
        closed_at: None,
    };

    let created = conn.transaction::<Issue, ApiError, _>(|conn| {
        diesel::insert_into(issues::table)
            .values(&issue)
            .execute(conn)?;

        // Birth certificate in the audit log so the status projection always
        // has a matching latest entry.
        let update = IssueUpdate {
            id: Uuid::new_v4(),
            issue_id: issue.id,
            author_id: user.user_id,
            old_status: None,
            new_status: Some(IssueStatus::Created),
            comment: "Issue reported".into(),
            update_type: UpdateType::StatusChange,
            created_at: now,
        };
        diesel::insert_into(issue_updates::table)
            .values(&update)
            .execute(conn)?;

        for file in files {
            diesel::insert_into(attachments_table::table)
                .values(&file.into_issue_attachment(issue.id, now))
                .execute(conn)?;
        }

        Ok(issue)
    })?;

    info!(issue_id = %created.id, %citizen_id, category = %category.name, "Issue created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/issues` — filtered, sorted, paginated listing scoped to the
/// caller's role.
pub async fn list_issues(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<IssueListResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let actor = resolve_actor(&mut conn, &user)?;

    let scope = match actor.role {
        UserRole::Citizen => ListScope::Citizen(
            actor
                .citizen_id
                .ok_or_else(|| ApiError::Forbidden("Citizen profile required".into()))?,
        ),
        UserRole::Official => {
            let department = actor
                .department
                .clone()
                .ok_or_else(|| ApiError::Forbidden("Official has no department".into()))?;
            ListScope::Official {
                user_id: actor.user_id,
                category_ids: queries::department_category_ids(&mut conn, &department)?,
            }
        }
        UserRole::HigherOfficial => ListScope::HigherOfficial,
    };

    let filter = build_filter(&query)?;
    let (rows, total) = queries::list_issues(&mut conn, &scope, &filter)?;

    Ok(Json(IssueListResponse {
        pagination: Pagination::new(filter.page, filter.limit, total),
        data: rows,
    }))
}

fn build_filter(query: &ListQuery) -> Result<IssueFilter, ApiError> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(IssueStatus::from_str)
        .transpose()
        .map_err(ApiError::Validation)?;
    let priority = query
        .priority
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(IssuePriority::from_str)
        .transpose()
        .map_err(ApiError::Validation)?;
    let sort_by = query
        .sort_by
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(SortOrder::from_str)
        .transpose()
        .map_err(ApiError::Validation)?
        .unwrap_or_default();
    let (page, limit) = normalize_page(query.page, query.limit);

    Ok(IssueFilter {
        status,
        not_status: None,
        category_id: query.category,
        priority,
        sort_by,
        page,
        limit,
    })
}

/// `GET /api/issues/:id` — full detail: issue, category, advisory timeline,
/// attachments and the audit trail.
pub async fn get_issue(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(issue_id): Path<Uuid>,
) -> Result<Json<IssueDetail>, ApiError> {
    let mut conn = state.conn.get()?;
    let (snapshot, issue) = load_snapshot(&mut conn, issue_id)?;
    let actor = resolve_actor(&mut conn, &user)?;
    lifecycle::authorize_read(&snapshot, &actor)?;

    let category_name: String = issue_categories::table
        .find(issue.category_id)
        .select(issue_categories::name)
        .first(&mut conn)?;

    let updates = load_updates(&mut conn, issue_id)?;

    let comment_ids: Vec<Uuid> = issue_updates::table
        .filter(issue_updates::issue_id.eq(issue_id))
        .select(issue_updates::id)
        .load(&mut conn)?;

    let attachment_rows: Vec<AttachmentMeta> = attachments_table::table
        .filter(
            attachments_table::issue_id
                .eq(Some(issue_id))
                .or(attachments_table::comment_id.eq_any(comment_ids.into_iter().map(Some))),
        )
        .select(attachments::meta_columns())
        .order(attachments_table::created_at.asc())
        .load(&mut conn)?;

    Ok(Json(IssueDetail {
        timeline: timeline_for(&category_name),
        category_name,
        issue,
        attachments: attachment_rows,
        updates,
    }))
}

fn load_updates(
    conn: &mut PgConnection,
    issue_id: Uuid,
) -> Result<Vec<IssueUpdateView>, ApiError> {
    let rows: Vec<(IssueUpdate, String, UserRole)> = issue_updates::table
        .inner_join(users::table)
        .filter(issue_updates::issue_id.eq(issue_id))
        .select((
            issue_updates::all_columns,
            users::name,
            users::role,
        ))
        .order(issue_updates::created_at.asc())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(update, author_name, author_role)| IssueUpdateView {
            update,
            author_name,
            author_role,
        })
        .collect())
}

/// `PUT /api/issues/:id/status` — drive one edge of the state machine.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(issue_id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<Issue>, ApiError> {
    let target = req
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Status is required".into()))
        .and_then(|s| IssueStatus::from_str(s).map_err(ApiError::Validation))?;
    let comment = req.comment.unwrap_or_default();

    let mut conn = state.conn.get()?;
    let (snapshot, _) = load_snapshot(&mut conn, issue_id)?;
    let actor = resolve_actor(&mut conn, &user)?;

    let update_type = lifecycle::validate_transition(&snapshot, &actor, target, &comment)?;
    let issue = apply_transition(
        &mut conn,
        &snapshot,
        &actor,
        target,
        comment.trim(),
        update_type,
        None,
        None,
    )?;

    info!(
        %issue_id,
        actor = %actor.user_id,
        from = %snapshot.status,
        to = %target,
        "Status transition applied"
    );
    Ok(Json(issue))
}

/// `PUT /api/issues/:id/assign` — assign an unassigned issue to a department
/// official.
pub async fn assign_issue(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(issue_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Issue>, ApiError> {
    let mut conn = state.conn.get()?;
    let (snapshot, _) = load_snapshot(&mut conn, issue_id)?;
    let actor = resolve_actor(&mut conn, &user)?;

    let assignee_id = req
        .assignee_id
        .ok_or_else(|| ApiError::Validation("Assignee is required".into()))?;

    let assignee_row: (Uuid, String, UserRole, Option<String>) = users::table
        .find(assignee_id)
        .select((users::id, users::name, users::role, users::department))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Assignee not found".into()))?;

    let assignee = AssigneeSnapshot {
        user_id: assignee_row.0,
        role: assignee_row.2,
        department: assignee_row.3,
    };

    let update_type = lifecycle::validate_assignment(&snapshot, &actor, &assignee)?;
    let comment = format!("Assigned to {}", assignee_row.1);
    let issue = apply_transition(
        &mut conn,
        &snapshot,
        &actor,
        IssueStatus::Assigned,
        &comment,
        update_type,
        Some(assignee.user_id),
        None,
    )?;

    info!(%issue_id, assignee = %assignee.user_id, actor = %actor.user_id, "Issue assigned");
    Ok(Json(issue))
}

/// `POST /api/issues/:id/escalate` — owner-only escalation to the higher
/// official pool. Forces the priority to urgent.
pub async fn escalate_issue(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(issue_id): Path<Uuid>,
    Json(req): Json<EscalateRequest>,
) -> Result<Json<Issue>, ApiError> {
    let reason = req
        .reason
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(EscalationReason::from_str)
        .transpose()
        .map_err(ApiError::Validation)?;
    let note = req.note.unwrap_or_default();

    let mut conn = state.conn.get()?;
    let (snapshot, _) = load_snapshot(&mut conn, issue_id)?;
    let actor = resolve_actor(&mut conn, &user)?;

    lifecycle::validate_escalation(&snapshot, &actor, reason, &note, Utc::now())?;

    let comment = match reason {
        Some(reason) => format!("[{reason}] {}", note.trim()),
        None => {
            if note.trim().is_empty() {
                "Escalated after response deadline passed".to_string()
            } else {
                note.trim().to_string()
            }
        }
    };

    let issue = apply_transition(
        &mut conn,
        &snapshot,
        &actor,
        IssueStatus::Escalated,
        &comment,
        UpdateType::Escalation,
        None,
        Some(IssuePriority::Urgent),
    )?;

    info!(%issue_id, citizen = %snapshot.citizen_id, "Issue escalated");
    Ok(Json(issue))
}

/// `POST /api/issues/:id/comments` — append a pure comment, optionally with
/// attachments. Terminal issues are locked.
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(issue_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IssueUpdate>), ApiError> {
    let (fields, files) =
        attachments::collect_multipart(&mut multipart, &state.config.uploads).await?;

    let comment = fields
        .get("comment")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Comment is required".into()))?;
    lifecycle::validate_comment(&comment)?;

    let mut conn = state.conn.get()?;
    let (snapshot, _) = load_snapshot(&mut conn, issue_id)?;
    let actor = resolve_actor(&mut conn, &user)?;

    lifecycle::authorize_read(&snapshot, &actor)?;
    if snapshot.status.is_terminal() {
        return Err(ApiError::LockedIssue(snapshot.status));
    }

    let now = Utc::now();
    let update = IssueUpdate {
        id: Uuid::new_v4(),
        issue_id,
        author_id: actor.user_id,
        old_status: None,
        new_status: None,
        comment,
        update_type: UpdateType::Comment,
        created_at: now,
    };

    let stored = conn.transaction::<IssueUpdate, ApiError, _>(|conn| {
        diesel::insert_into(issue_updates::table)
            .values(&update)
            .execute(conn)?;

        for file in files {
            diesel::insert_into(attachments_table::table)
                .values(&file.into_comment_attachment(update.id, now))
                .execute(conn)?;
        }

        Ok(update)
    })?;

    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /api/issues/:id/comments` — the full audit trail, oldest first.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(issue_id): Path<Uuid>,
) -> Result<Json<Vec<IssueUpdateView>>, ApiError> {
    let mut conn = state.conn.get()?;
    let (snapshot, _) = load_snapshot(&mut conn, issue_id)?;
    let actor = resolve_actor(&mut conn, &user)?;
    lifecycle::authorize_read(&snapshot, &actor)?;

    Ok(Json(load_updates(&mut conn, issue_id)?))
}

/// `GET /api/issues/categories` — active categories for the report form.
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let mut conn = state.conn.get()?;
    let rows = issue_categories::table
        .filter(issue_categories::active.eq(true))
        .order(issue_categories::name.asc())
        .load(&mut conn)?;
    Ok(Json(rows))
}

/// `GET /api/issues/:id/timeline` — advisory SLA projection for the issue's
/// category.
pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(issue_id): Path<Uuid>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let mut conn = state.conn.get()?;
    let (snapshot, issue) = load_snapshot(&mut conn, issue_id)?;
    let actor = resolve_actor(&mut conn, &user)?;
    lifecycle::authorize_read(&snapshot, &actor)?;

    let category: String = issue_categories::table
        .find(issue.category_id)
        .select(issue_categories::name)
        .first(&mut conn)?;

    Ok(Json(TimelineResponse {
        timeline: timeline_for(&category),
        category,
    }))
}

// ============================================================================
// Routes
// ============================================================================

pub fn configure_issues_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/issues", get(list_issues).post(create_issue))
        .route("/api/issues/categories", get(list_categories))
        .route("/api/issues/:id", get(get_issue))
        .route("/api/issues/:id/status", put(update_status))
        .route("/api/issues/:id/assign", put(assign_issue))
        .route("/api/issues/:id/escalate", post(escalate_issue))
        .route("/api/issues/:id/comments", get(list_comments).post(add_comment))
        .route("/api/issues/:id/timeline", get(get_timeline))
        .route(
            "/api/issues/:id/attachment/:attachment_id",
            get(attachments::download_attachment),
        )
}
