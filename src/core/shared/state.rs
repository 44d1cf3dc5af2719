use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;
use crate::security::jwt::JwtManager;
use std::sync::Arc;

/// Shared application state handed to every handler via axum `State`.
///
/// The server holds no per-user mutable state between requests; everything a
/// request needs beyond its own inputs lives in the persistent store.
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub jwt: Arc<JwtManager>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            config: self.config.clone(),
            jwt: Arc::clone(&self.jwt),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("config", &self.config)
            .field("jwt", &"Arc<JwtManager>")
            .finish()
    }
}
