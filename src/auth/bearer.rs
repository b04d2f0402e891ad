use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// The single shared admin secret, injected as a request extension.
#[derive(Clone)]
pub struct AdminSecret(pub Arc<str>);

impl AdminSecret {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self(secret.into())
    }

    /// Exact match of a presented token against the secret, in constant time.
    pub fn matches(&self, token: &str) -> bool {
        token.as_bytes().ct_eq(self.0.as_bytes()).into()
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminSecret(..)")
    }
}

/// Extract Bearer token from Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

/// Whether the request carries `Authorization: Bearer <admin secret>`.
pub fn is_admin(headers: &HeaderMap, secret: &AdminSecret) -> bool {
    extract_bearer(headers).is_some_and(|token| secret.matches(token))
}

/// Middleware: rejects the request with 401 unless it carries the admin bearer token.
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, Response> {
    let secret = request
        .extensions()
        .get::<AdminSecret>()
        .cloned()
        .ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "admin secret not configured",
            )
                .into_response()
        })?;

    if !is_admin(request.headers(), &secret) {
        tracing::warn!(path = %request.uri().path(), "rejected admin request");
        return Err((
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({"error": "Unauthorized"})),
        )
            .into_response());
    }

    Ok(next.run(request).await)
}

/// Extractor for routes whose response depends on, but does not require, admin auth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminAccess(pub bool);

impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = parts
            .extensions
            .get::<AdminSecret>()
            .is_some_and(|secret| is_admin(&parts.headers, secret));
        Ok(AdminAccess(admin))
    }
}
