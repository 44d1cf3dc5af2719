use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::shared::enums::UserRole;
use crate::core::shared::state::AppState;
use crate::security::jwt::extract_bearer_token;

// ============================================================================
// Authenticated user context
// ============================================================================

/// Identity decoded from the bearer token, attached to every protected
/// request. Handlers trust this; credentials are not re-verified per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
    pub citizen_id: Option<Uuid>,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn is_citizen(&self) -> bool {
        self.role == UserRole::Citizen
    }

    pub fn is_official(&self) -> bool {
        self.role.is_official()
    }

    pub fn is_higher_official(&self) -> bool {
        self.role == UserRole::HigherOfficial
    }

    /// The citizen profile id, required for owner-scoped operations.
    pub fn require_citizen_id(&self) -> Result<Uuid, ApiError> {
        self.citizen_id
            .ok_or_else(|| ApiError::Forbidden("Citizen profile required".into()))
    }

    pub fn require_role(&self, roles: &[UserRole]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Requires one of the roles: {}",
                roles
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Validate the bearer token and attach the decoded identity to the request.
/// Requests without a valid token are rejected with 401 before any handler
/// runs.
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = match extract_and_validate_user(&request, &state) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    debug!(user_id = %user.user_id, role = %user.role, "Authenticated request");
    request.extensions_mut().insert(user);
    next.run(request).await
}

fn extract_and_validate_user(
    request: &Request<Body>,
    state: &AppState,
) -> Result<AuthenticatedUser, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization token".into()))?;

    let token = extract_bearer_token(auth_header)
        .ok_or_else(|| ApiError::Unauthorized("Invalid authorization format".into()))?;

    let claims = state
        .jwt
        .validate_token(token)
        .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {e}")))?;

    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".into()))?;

    Ok(AuthenticatedUser {
        user_id,
        role: claims.role,
        citizen_id: claims.citizen_id,
        email: claims.email,
    })
}

// ============================================================================
// Extractor
// ============================================================================

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citizen() -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Citizen,
            citizen_id: Some(Uuid::new_v4()),
            email: None,
        }
    }

    #[test]
    fn test_role_helpers() {
        let user = citizen();
        assert!(user.is_citizen());
        assert!(!user.is_official());
        assert!(user.require_citizen_id().is_ok());

        let official = AuthenticatedUser {
            role: UserRole::Official,
            citizen_id: None,
            ..citizen()
        };
        assert!(official.is_official());
        assert!(!official.is_higher_official());
        assert!(official.require_citizen_id().is_err());
    }

    #[test]
    fn test_require_role() {
        let user = citizen();
        assert!(user.require_role(&[UserRole::Citizen]).is_ok());
        assert!(user
            .require_role(&[UserRole::Official, UserRole::HigherOfficial])
            .is_err());
    }
}
