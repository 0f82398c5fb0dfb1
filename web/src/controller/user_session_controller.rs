use crate::controller::ApiResponse;
use crate::error::{Error as WebError, Result as WebResult};
use crate::user::{AuthSession, Credentials};
use axum::{http::StatusCode, response::IntoResponse, Form, Json};
use log::*;
use serde_json::json;

/// Logs the user in and returns a new session cookie.
///
/// Successful login will return a session cookie with id, e.g.:
/// set-cookie: id=07bbbe54-bd35-425f-8e63-618a8d8612df; HttpOnly; SameSite=Strict; Path=/; Max-Age=86399
///
/// After logging in successfully, pass the session id back on every call, e.g.:
/// curl -N --header "Cookie: id=07bbbe54-bd35-425f-8e63-618a8d8612df" http://localhost:4000/sse
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = crate::user::Credentials, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Logs in and returns session authentication cookie"),
        (status = 401, description = "Unauthorized"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn login(
    mut auth_session: AuthSession,
    Form(creds): Form<Credentials>,
) -> WebResult<impl IntoResponse> {
    let user = match auth_session.authenticate(creds.clone()).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Authentication failed, invalid user: {:?}", creds.username);
            return Err(WebError::unauthenticated());
        }
        Err(auth_error) => {
            error!("Authentication failed with error: {auth_error:?}");
            return Err(WebError {
                source: Some(Box::new(auth_error)),
                ..WebError::internal("Authentication backend failed")
            });
        }
    };

    if let Err(login_error) = auth_session.login(&user).await {
        warn!("Session login failed: {login_error:?}");
        return Err(WebError {
            source: Some(Box::new(login_error)),
            ..WebError::internal("Session login failed")
        });
    }

    let user_session_json = json!({ "id": user.id() });
    debug!("user_session_json: {user_session_json}");

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        user_session_json,
    )))
}

/// Logs the user out by destroying their session.
/// Test this with curl: curl -v \
/// --header "Cookie: id=07bbbe54-bd35-425f-8e63-618a8d8612df" \
/// --request DELETE http://localhost:4000/delete
#[utoipa::path(
    delete,
    path = "/delete",
    responses(
        (status = 200, description = "Successfully logged out"),
        (status = 401, description = "Unauthorized"),
        (status = 405, description = "Method not allowed"),
        (status = 503, description = "Service temporarily unavailable")
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn delete(mut auth_session: AuthSession) -> impl IntoResponse {
    trace!("UserSessionController::delete()");
    match auth_session.logout().await {
        Ok(_) => Json(ApiResponse::<()>::no_content(StatusCode::OK.into())).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
