//! Attachment handling: multipart validation, storage, and download.
//!
//! Every attachment belongs to exactly one owner (an issue or an audit-log
//! comment) and is only ever removed by cascade when the owner goes away.
//! Mimetype and size rejections are validation failures, reported before any
//! lifecycle logic runs.

use axum::extract::multipart::Multipart;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::core::config::UploadConfig;
use crate::core::error::ApiError;
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::schema::{attachments, issue_updates};
use crate::core::shared::state::AppState;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "application/pdf",
];

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = attachments)]
pub struct Attachment {
    pub id: Uuid,
    pub issue_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub filename: String,
    pub mimetype: String,
    pub data: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Attachment listing row; the payload stays in the database.
#[derive(Debug, Clone, Serialize, Queryable)]
pub struct AttachmentMeta {
    pub id: Uuid,
    pub filename: String,
    pub mimetype: String,
    pub created_at: DateTime<Utc>,
}

pub fn meta_columns() -> (
    attachments::id,
    attachments::filename,
    attachments::mimetype,
    attachments::created_at,
) {
    (
        attachments::id,
        attachments::filename,
        attachments::mimetype,
        attachments::created_at,
    )
}

/// A file pulled out of a multipart request, validated but not yet stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mimetype: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn into_issue_attachment(self, issue_id: Uuid, now: DateTime<Utc>) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            issue_id: Some(issue_id),
            comment_id: None,
            filename: self.filename,
            mimetype: self.mimetype,
            data: self.data,
            created_at: now,
        }
    }

    pub fn into_comment_attachment(self, comment_id: Uuid, now: DateTime<Utc>) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            issue_id: None,
            comment_id: Some(comment_id),
            filename: self.filename,
            mimetype: self.mimetype,
            data: self.data,
            created_at: now,
        }
    }
}

pub fn validate_file(
    filename: &str,
    mimetype: &str,
    size: usize,
    config: &UploadConfig,
) -> Result<(), ApiError> {
    if !ALLOWED_MIME_TYPES.contains(&mimetype) {
        return Err(ApiError::Validation(format!(
            "File type {mimetype} is not allowed; only JPEG, PNG, GIF and PDF are accepted"
        )));
    }
    if size > config.max_file_bytes {
        return Err(ApiError::Validation(format!(
            "File {filename} exceeds the {}MB size limit",
            config.max_file_bytes / (1024 * 1024)
        )));
    }
    if filename.is_empty() {
        return Err(ApiError::Validation("Attachment filename is required".into()));
    }
    Ok(())
}

/// Drain a multipart body into text fields and validated files. Files arrive
/// under the `attachments` field name; everything else is treated as text.
pub async fn collect_multipart(
    multipart: &mut Multipart,
    config: &UploadConfig,
) -> Result<(HashMap<String, String>, Vec<UploadedFile>), ApiError> {
    let mut fields = HashMap::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(filename) = field.file_name().map(String::from) {
            if files.len() >= config.max_files_per_request {
                return Err(ApiError::Validation(format!(
                    "At most {} attachments per request",
                    config.max_files_per_request
                )));
            }

            let mimetype = field.content_type().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Failed to read attachment: {e}")))?;

            validate_file(&filename, &mimetype, data.len(), config)?;
            files.push(UploadedFile {
                filename,
                mimetype,
                data: data.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Malformed field {name}: {e}")))?;
            fields.insert(name, value);
        }
    }

    Ok((fields, files))
}

/// `GET /api/issues/:id/attachment/:attachment_id` — stream the stored blob.
pub async fn download_attachment(
    State(state): State<Arc<AppState>>,
    Path((issue_id, attachment_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let mut conn = state.conn.get()?;

    // The viewer must be allowed to read the owning issue.
    let (snapshot, _) = crate::issues::load_snapshot(&mut conn, issue_id)?;
    let actor = crate::issues::resolve_actor(&mut conn, &user)?;
    crate::issues::lifecycle::authorize_read(&snapshot, &actor)?;

    // Attached directly to the issue, or to one of its audit-log comments.
    let comment_ids: Vec<Uuid> = issue_updates::table
        .filter(issue_updates::issue_id.eq(issue_id))
        .select(issue_updates::id)
        .load(&mut conn)?;

    let attachment: Attachment = attachments::table
        .filter(attachments::id.eq(attachment_id))
        .filter(
            attachments::issue_id
                .eq(Some(issue_id))
                .or(attachments::comment_id.eq_any(comment_ids.into_iter().map(Some))),
        )
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| {
            warn!(%issue_id, %attachment_id, "Attachment lookup failed");
            ApiError::NotFound("Attachment not found".into())
        })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.filename.replace('"', "")
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, attachment.mimetype),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        attachment.data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UploadConfig {
        UploadConfig::default()
    }

    #[test]
    fn test_allowed_mime_types() {
        for mime in ["image/jpeg", "image/png", "image/gif", "application/pdf"] {
            assert!(validate_file("a.bin", mime, 100, &config()).is_ok());
        }
    }

    #[test]
    fn test_disallowed_mime_type_is_validation_error() {
        let result = validate_file("evil.exe", "application/x-msdownload", 100, &config());
        assert!(matches!(result, Err(ApiError::Validation(_))));
        let result = validate_file("notes.txt", "text/plain", 100, &config());
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_oversize_file_rejected() {
        let config = config();
        let result = validate_file("big.pdf", "application/pdf", config.max_file_bytes + 1, &config);
        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert!(validate_file("ok.pdf", "application/pdf", config.max_file_bytes, &config).is_ok());
    }

    #[test]
    fn test_attachment_single_owner() {
        let file = UploadedFile {
            filename: "leak.jpg".into(),
            mimetype: "image/jpeg".into(),
            data: vec![1, 2, 3],
        };
        let now = Utc::now();

        let on_issue = file.clone().into_issue_attachment(Uuid::new_v4(), now);
        assert!(on_issue.issue_id.is_some());
        assert!(on_issue.comment_id.is_none());

        let on_comment = file.into_comment_attachment(Uuid::new_v4(), now);
        assert!(on_comment.issue_id.is_none());
        assert!(on_comment.comment_id.is_some());
    }
}
