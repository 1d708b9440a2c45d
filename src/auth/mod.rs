use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::models::User;
use crate::storage::Storage;

/// The authenticated dashboard user, inserted into request extensions by
/// the middleware.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

pub struct AuthService {
    storage: Arc<dyn Storage>,
}

impl AuthService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Resolve a bearer token to its user; None for unknown tokens.
    pub async fn authenticate(&self, token: &str) -> Option<User> {
        if token.is_empty() {
            return None;
        }
        match self.storage.get_user_by_token(token).await {
            Ok(user) => user,
            Err(err) => {
                tracing::error!(error = %err, "token lookup failed");
                None
            }
        }
    }
}

pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    match auth_service.authenticate(token).await {
        Some(user) => {
            request.extensions_mut().insert(AuthUser(user));
            next.run(request).await
        }
        None => (StatusCode::UNAUTHORIZED, "Invalid or missing API token").into_response(),
    }
}
