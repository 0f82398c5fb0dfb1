use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::user::AuthSession;

/// Authentication middleware that returns 401 Unauthorized for unauthenticated requests.
///
/// Runs before any handler, so an anonymous caller never reaches the SSE
/// registry. Used instead of axum-login's `login_required!`, which redirects.
pub async fn require_auth(auth_session: AuthSession, request: Request, next: Next) -> Response {
    match auth_session.user {
        Some(_user) => next.run(request).await,
        None => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}
