use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub expiry_hours: i64,
    pub leeway_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "civicserver".into(),
            audience: "civicserver-api".into(),
            expiry_hours: 24,
            leeway_seconds: 60,
        }
    }
}

/// Bearer-token claims. The engine trusts the decoded identity and role on
/// every protected call; credentials are never re-verified per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citizen_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        role: UserRole,
        issuer: &str,
        audience: &str,
        expiry: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
            exp: expiry.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            role,
            citizen_id: None,
            email: None,
        }
    }

    pub fn with_citizen_id(mut self, citizen_id: Uuid) -> Self {
        self.citizen_id = Some(citizen_id);
        self
    }

    pub fn with_email(mut self, email: String) -> Self {
        self.email = Some(email);
        self
    }

    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|e| anyhow!("Invalid user ID in claims: {e}"))
    }
}

pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig, secret: &str) -> Result<Self> {
        if secret.len() < 32 {
            return Err(anyhow!("JWT secret must be at least 32 characters"));
        }
        Ok(Self {
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn from_secret(secret: &str) -> Result<Self> {
        Self::new(JwtConfig::default(), secret)
    }

    pub fn issue_token(
        &self,
        user_id: Uuid,
        role: UserRole,
        citizen_id: Option<Uuid>,
        email: Option<String>,
    ) -> Result<String> {
        let expiry = Utc::now() + Duration::hours(self.config.expiry_hours);
        let mut claims = Claims::new(
            user_id,
            role,
            &self.config.issuer,
            &self.config.audience,
            expiry,
        );
        if let Some(cid) = citizen_id {
            claims = claims.with_citizen_id(cid);
        }
        if let Some(mail) = email {
            claims = claims.with_email(mail);
        }

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode token: {e}"))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = self.config.leeway_seconds;
        validation.set_required_spec_claims(&["sub", "exp", "iss", "aud"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }

    pub fn expiry_hours(&self) -> i64 {
        self.config.expiry_hours
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_manager() -> JwtManager {
        JwtManager::from_secret("this-is-a-very-long-secret-key-for-testing-purposes-only")
            .expect("Failed to create manager")
    }

    #[test]
    fn test_issue_and_validate() {
        let manager = create_test_manager();
        let user_id = Uuid::new_v4();
        let citizen_id = Uuid::new_v4();

        let token = manager
            .issue_token(
                user_id,
                UserRole::Citizen,
                Some(citizen_id),
                Some("test@example.com".into()),
            )
            .expect("Failed to issue");

        let claims = manager.validate_token(&token).expect("Validation failed");
        assert_eq!(claims.user_id().expect("Invalid user ID"), user_id);
        assert_eq!(claims.role, UserRole::Citizen);
        assert_eq!(claims.citizen_id, Some(citizen_id));
        assert_eq!(claims.email, Some("test@example.com".into()));
    }

    #[test]
    fn test_official_token_has_no_citizen_id() {
        let manager = create_test_manager();
        let token = manager
            .issue_token(Uuid::new_v4(), UserRole::HigherOfficial, None, None)
            .expect("Failed to issue");

        let claims = manager.validate_token(&token).expect("Validation failed");
        assert_eq!(claims.role, UserRole::HigherOfficial);
        assert!(claims.citizen_id.is_none());
    }

    #[test]
    fn test_invalid_token_rejected() {
        let manager = create_test_manager();
        assert!(manager.validate_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = create_test_manager();
        let other = JwtManager::from_secret("another-equally-long-secret-key-that-differs!!")
            .expect("Failed to create manager");

        let token = manager
            .issue_token(Uuid::new_v4(), UserRole::Official, None, None)
            .expect("Failed to issue");
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtManager::from_secret("too-short").is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer_token("Basic abc123"), None);
    }
}
