use crate::{
    controller::{health_check_controller, sse_controller, user_session_controller},
    middleware::auth::require_auth,
    params, sse, user, AppState,
};
use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "SSE Fan-out API"
        ),
        paths(
            health_check_controller::health_check,
            user_session_controller::login,
            user_session_controller::delete,
            sse::handler::sse_handler,
            sse_controller::send_message,
            sse_controller::broadcast,
        ),
        components(
            schemas(
                user::Credentials,
                params::sse::SendMessageParams,
                params::sse::BroadcastParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "sse_fanout", description = "Per-user Server-Sent Events fan-out API")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our cookie session based authentication requirement for gaining access to our
// API endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "id",
                    "Session id value returned from successful login via Set-Cookie header",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(user_session_routes())
        .merge(user_session_protected_routes(app_state.clone()))
        .merge(sse_routes(app_state))
        // **** FIXME: protect the OpenAPI web UI
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

pub(crate) fn user_session_protected_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/delete", delete(user_session_controller::delete))
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

pub(crate) fn user_session_routes() -> Router {
    Router::new().route("/login", post(user_session_controller::login))
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse::handler::sse_handler))
        .route("/sse/send-message", post(sse_controller::send_message))
        .route("/sse/broadcast", post(sse_controller::broadcast))
        .route_layer(from_fn(require_auth))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{login, test_state};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use events::Event;
    use futures::StreamExt;
    use serde_json::Value;
    use ::sse::Frame;
    use tower::ServiceExt;

    const USERS: &[&str] = &["alice:password1", "bob:password2"];

    fn post_json(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn decode(frame: &Frame) -> Event {
        let text = frame.to_text();
        let json = text
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("frame should be a single data line");
        Event::from_json(json).unwrap()
    }

    fn app_for(state: &crate::AppState) -> Router {
        crate::app(state.clone())
    }

    #[tokio::test]
    async fn test_health_check_is_public() {
        let app = app_for(&test_state(USERS));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password() {
        let app = app_for(&test_state(USERS));
        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=alice&password=wrong"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_sse_routes_require_a_session() {
        let state = test_state(USERS);
        let app = app_for(&state);

        let stream = Request::builder().uri("/sse").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(stream).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let send = post_json("/sse/send-message", None, r#"{"message":"hi"}"#);
        let response = app.clone().oneshot(send).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let broadcast = post_json(
            "/sse/broadcast",
            None,
            r#"{"channel_ids":["alice"],"message":"hi"}"#,
        );
        let response = app.oneshot(broadcast).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(state.sse_manager.registry().channel_count(), 0);
    }

    #[tokio::test]
    async fn test_send_message_reaches_callers_own_channel() {
        let state = test_state(USERS);
        let app = app_for(&state);
        let cookie = login(&app, "alice", "password1").await;

        let (_alice, mut alice_rx) = state.sse_manager.connect("alice".to_string());
        let (_bob, mut bob_rx) = state.sse_manager.connect("bob".to_string());

        let request = post_json("/sse/send-message", Some(&cookie), r#"{"message":"hi"}"#);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["success"], true);
        assert_eq!(body["data"]["message"], "Message sent");

        assert!(matches!(decode(&alice_rx.recv().await.unwrap()), Event::Ping(_)));
        match decode(&alice_rx.recv().await.unwrap()) {
            Event::Message(data) => assert_eq!(data.message(), "hi"),
            other => panic!("expected a message event, got {other:?}"),
        }

        // bob only ever sees his own connect ping
        assert!(matches!(decode(&bob_rx.recv().await.unwrap()), Event::Ping(_)));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_message_rejects_empty_message() {
        let state = test_state(USERS);
        let app = app_for(&state);
        let cookie = login(&app, "alice", "password1").await;

        let request = post_json("/sse/send-message", Some(&cookie), r#"{"message":""}"#);
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = post_json("/sse/send-message", Some(&cookie), r#"{}"#);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(state.sse_manager.registry().channel_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_delivers_one_event_to_each_channel() {
        let state = test_state(USERS);
        let app = app_for(&state);
        let cookie = login(&app, "bob", "password2").await;

        let (_u1, mut u1_rx) = state.sse_manager.connect("u1".to_string());
        let (_u2, mut u2_rx) = state.sse_manager.connect("u2".to_string());
        let (_u3, mut u3_rx) = state.sse_manager.connect("u3".to_string());

        let request = post_json(
            "/sse/broadcast",
            Some(&cookie),
            r#"{"channelIds":["u1","u2","u3"],"message":"x"}"#,
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["message"], "Broadcast sent to 3 channels.");

        let mut payloads = Vec::new();
        for rx in [&mut u1_rx, &mut u2_rx, &mut u3_rx] {
            assert!(matches!(decode(&rx.recv().await.unwrap()), Event::Ping(_)));
            payloads.push(rx.recv().await.unwrap().into_bytes());
        }
        assert!(payloads.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn test_broadcast_requires_channels() {
        let state = test_state(USERS);
        let app = app_for(&state);
        let cookie = login(&app, "alice", "password1").await;

        let request = post_json(
            "/sse/broadcast",
            Some(&cookie),
            r#"{"channel_ids":[],"message":"x"}"#,
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sse_stream_starts_with_ping_and_unregisters_on_drop() {
        let state = test_state(USERS);
        let app = app_for(&state);
        let cookie = login(&app, "alice", "password1").await;

        let request = Request::builder()
            .uri("/sse")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        assert_eq!(state.sse_manager.registry().connection_count("alice"), 1);

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert_eq!(&first[..], b"data: {\"name\":\"ping\",\"data\":{}}\n\n");

        drop(body);
        assert_eq!(state.sse_manager.registry().channel_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_ends_the_session() {
        let state = test_state(USERS);
        let app = app_for(&state);
        let cookie = login(&app, "alice", "password1").await;

        let logout = Request::builder()
            .method("DELETE")
            .uri("/delete")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(logout).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = post_json("/sse/send-message", Some(&cookie), r#"{"message":"hi"}"#);
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
