//! Registration, login, and profile endpoints.
//!
//! Registration always creates a citizen: the user row and its citizen
//! profile are inserted in one transaction. Officials and higher officials
//! are provisioned by administrators, never by self-registration, and a role
//! is immutable once created.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::middleware::AuthenticatedUser;
use crate::core::shared::enums::UserRole;
use crate::core::shared::schema::{citizens, users};
use crate::core::shared::state::AppState;
use crate::security::password::{hash_password, validate_password, verify_password};

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub address: String,
    pub role: UserRole,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = citizens)]
pub struct Citizen {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request / response types
// ============================================================================

// Defaulted so missing fields become field-level 400s instead of
// deserialization rejections.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizen_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

// ============================================================================
// Validation
// ============================================================================

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s]+$").expect("valid name pattern"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{10}$").expect("valid phone pattern"));

/// Field-level registration validation; all problems reported at once.
pub fn validate_registration(req: &RegisterRequest) -> Vec<String> {
    let mut errors = Vec::new();

    let name = req.name.trim();
    if name.is_empty() {
        errors.push("name: Name is required".into());
    } else if !(2..=255).contains(&name.chars().count()) {
        errors.push("name: Name must be between 2-255 characters".into());
    } else if !NAME_RE.is_match(name) {
        errors.push("name: Name can only contain letters and spaces".into());
    }

    let email = req.email.trim();
    if email.is_empty() {
        errors.push("email: Email is required".into());
    } else if email.chars().count() > 255 || !EMAIL_RE.is_match(email) {
        errors.push("email: Invalid email format".into());
    }

    for issue in validate_password(&req.password) {
        errors.push(format!("password: {}", issue.message()));
    }

    if !PHONE_RE.is_match(req.phone.trim()) {
        errors.push("phone: Phone must be exactly 10 digits".into());
    }

    let address = req.address.trim();
    if !(10..=500).contains(&address.chars().count()) {
        errors.push("address: Address must be between 10-500 characters".into());
    }

    errors
}

// ============================================================================
// Handlers
// ============================================================================

/// `POST /api/auth/register` — create a citizen account. The user row and the
/// citizen profile land atomically.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let errors = validate_registration(&req);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors.join("; ")));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| {
            warn!("Password hashing failed: {e}");
            ApiError::Validation("Unable to process password".into())
        })?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_lowercase(),
        password_hash,
        phone: req.phone.trim().to_string(),
        address: req.address.trim().to_string(),
        role: UserRole::Citizen,
        department: None,
        created_at: now,
    };
    let citizen = Citizen {
        id: Uuid::new_v4(),
        user_id: user.id,
        created_at: now,
    };

    let mut conn = state.conn.get()?;
    let result = conn.transaction::<(), diesel::result::Error, _>(|conn| {
        diesel::insert_into(users::table).values(&user).execute(conn)?;
        diesel::insert_into(citizens::table).values(&citizen).execute(conn)?;
        Ok(())
    });

    match result {
        Ok(()) => {}
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            return Err(ApiError::Validation("Email is already registered".into()));
        }
        Err(e) => return Err(e.into()),
    }

    info!(user_id = %user.id, "Citizen registered");

    let token = state
        .jwt
        .issue_token(
            user.id,
            UserRole::Citizen,
            Some(citizen.id),
            Some(user.email.clone()),
        )
        .map_err(|e| {
            warn!("Token issuance failed: {e}");
            ApiError::Unauthorized("Unable to issue token".into())
        })?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            token_type: "Bearer".into(),
            expires_in: state.jwt.expiry_hours() * 3600,
            user: UserInfo {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role,
                citizen_id: Some(citizen.id),
                department: None,
            },
        }),
    ))
}

/// `POST /api/auth/login` — verify credentials and mint a bearer token
/// carrying {user_id, role, citizen_id}.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut conn = state.conn.get()?;

    let user: User = users::table
        .filter(users::email.eq(req.email.trim().to_lowercase()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".into()))?;

    let verified = verify_password(&req.password, &user.password_hash).map_err(|e| {
        warn!(user_id = %user.id, "Password verification failed: {e}");
        ApiError::Unauthorized("Invalid email or password".into())
    })?;
    if !verified {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    let citizen_id = if user.role == UserRole::Citizen {
        citizens::table
            .filter(citizens::user_id.eq(user.id))
            .select(citizens::id)
            .first(&mut conn)
            .optional()?
    } else {
        None
    };

    let token = state
        .jwt
        .issue_token(user.id, user.role, citizen_id, Some(user.email.clone()))
        .map_err(|e| {
            warn!("Token issuance failed: {e}");
            ApiError::Unauthorized("Unable to issue token".into())
        })?;

    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(AuthResponse {
        token,
        token_type: "Bearer".into(),
        expires_in: state.jwt.expiry_hours() * 3600,
        user: UserInfo {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            citizen_id,
            department: user.department,
        },
    }))
}

/// `GET /api/auth/me` — current profile from the bearer token.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<Json<UserInfo>, ApiError> {
    let mut conn = state.conn.get()?;

    let user: User = users::table
        .find(auth.user_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserInfo {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        citizen_id: auth.citizen_id,
        department: user.department,
    }))
}

// ============================================================================
// Routes
// ============================================================================

/// Public routes: no bearer token required.
pub fn configure_public_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Protected routes layered behind the authentication middleware.
pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            name: "Asha Verma".into(),
            email: "asha@example.com".into(),
            password: "Str0ngpass".into(),
            phone: "9876543210".into(),
            address: "12 Gandhi Road, Ward 7".into(),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(validate_registration(&valid_request()).is_empty());
    }

    #[test]
    fn test_name_validation() {
        let mut req = valid_request();
        req.name = "A".into();
        assert!(validate_registration(&req)
            .iter()
            .any(|e| e.starts_with("name:")));

        req.name = "R2D2!".into();
        assert!(validate_registration(&req)
            .iter()
            .any(|e| e.contains("letters and spaces")));
    }

    #[test]
    fn test_email_validation() {
        let mut req = valid_request();
        req.email = "not-an-email".into();
        assert!(validate_registration(&req)
            .iter()
            .any(|e| e.contains("Invalid email format")));
    }

    #[test]
    fn test_phone_validation() {
        let mut req = valid_request();
        req.phone = "12345".into();
        assert!(validate_registration(&req)
            .iter()
            .any(|e| e.contains("exactly 10 digits")));

        req.phone = "98765432101".into();
        assert!(!validate_registration(&req).is_empty());
    }

    #[test]
    fn test_address_validation() {
        let mut req = valid_request();
        req.address = "short".into();
        assert!(validate_registration(&req)
            .iter()
            .any(|e| e.starts_with("address:")));
    }

    #[test]
    fn test_password_policy_applied() {
        let mut req = valid_request();
        req.password = "weak".into();
        let errors = validate_registration(&req);
        assert!(errors.iter().any(|e| e.starts_with("password:")));
    }

    #[test]
    fn test_all_errors_reported_at_once() {
        let req = RegisterRequest {
            name: "".into(),
            email: "bad".into(),
            password: "x".into(),
            phone: "abc".into(),
            address: "".into(),
        };
        let errors = validate_registration(&req);
        assert!(errors.len() >= 5);
    }
}
