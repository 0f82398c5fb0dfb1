use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::AppState;
use async_stream::stream;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use log::*;
use std::convert::Infallible;

/// Opens a long-lived event stream on the caller's own channel.
///
/// Frames are already encoded as `data: <json>\n\n`, so the body is written
/// directly rather than through axum's `Sse` encoder. The [`sse::Connection`]
/// guard lives inside the stream: when the client disconnects axum drops the
/// body, which stops the heartbeat and unregisters the connection.
#[utoipa::path(
    get,
    path = "/sse",
    responses(
        (status = 200, description = "Event stream of `data:` frames", body = String, content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub(crate) async fn sse_handler(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
) -> Response {
    debug!("Establishing SSE connection for user {}", user.id());

    let (connection, mut rx) = app_state.sse_manager.connect(user.id().to_string());

    let stream = stream! {
        let _connection = connection;
        while let Some(frame) = rx.recv().await {
            yield Ok::<_, Infallible>(frame.into_bytes());
        }
    };

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
