use crate::controller::ApiResponse;
use crate::error::Result;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::sse::{BroadcastParams, SendMessageParams};
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use events::Event;
use log::*;
use serde_json::json;
use sse::message::{Message as SseMessage, MessageScope};

/// POST a `message` event to every open connection of the calling user
#[utoipa::path(
    post,
    path = "/sse/send-message",
    request_body = crate::params::sse::SendMessageParams,
    responses(
        (status = 200, description = "Message pushed to the caller's own channel"),
        (status = 400, description = "Missing or empty message"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn send_message(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    params: std::result::Result<Json<SendMessageParams>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(params) = params?;
    params.validate()?;

    let event = Event::message_now(params.message)?;
    let delivered = app_state.sse_manager.send_message(SseMessage {
        event,
        scope: MessageScope::Channel {
            channel_id: user.id().to_string(),
        },
    });
    debug!(
        "send-message from {} reached {delivered} connection(s)",
        user.id()
    );

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({ "success": true, "message": "Message sent" }),
    )))
}

/// POST one `message` event to every open connection of each listed channel
#[utoipa::path(
    post,
    path = "/sse/broadcast",
    request_body = crate::params::sse::BroadcastParams,
    responses(
        (status = 200, description = "Message pushed to each listed channel"),
        (status = 400, description = "No channels listed or empty message"),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn broadcast(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    params: std::result::Result<Json<BroadcastParams>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(params) = params?;
    params.validate()?;

    let event = Event::message_now(params.message)?;
    let channel_count = params.channel_ids.len();
    let delivered = app_state.sse_manager.send_message(SseMessage {
        event,
        scope: MessageScope::Channels {
            channel_ids: params.channel_ids,
        },
    });
    info!(
        "Broadcast from {} to {channel_count} channel(s) reached {delivered} connection(s)",
        user.id()
    );

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        json!({
            "success": true,
            "message": format!("Broadcast sent to {channel_count} channels."),
        }),
    )))
}
