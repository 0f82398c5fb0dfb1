use axum::http::{header, HeaderValue, Method};
use axum::Router;
use axum_login::{AuthManagerLayer, AuthManagerLayerBuilder};
use log::*;
use service::config::Config;
use time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use user::Backend;

pub use service::AppState;

mod controller;
mod error;
pub(crate) mod extractors;
pub(crate) mod middleware;
mod params;
mod router;
mod sse;
mod user;

/// Builds the full application router with session authentication and CORS applied.
pub fn app(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.config);
    let auth = auth_layer(&app_state.config);

    router::define_routes(app_state).layer(auth).layer(cors)
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state.config.interface().to_string();
    let port = app_state.config.port;

    let listener = TcpListener::bind((interface.as_str(), port)).await?;
    info!("Server starting... listening for connections on http://{interface}:{port}");

    axum::serve(listener, app(app_state)).await
}

// Sessions live in memory and do not survive a restart.
pub(crate) fn auth_layer(config: &Config) -> AuthManagerLayer<Backend, MemoryStore> {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.is_production())
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            config.backend_session_expiry_seconds as i64,
        )));

    let backend = Backend::new(config.users());
    info!("Login backend loaded with {} user(s)", config.users().len());

    AuthManagerLayerBuilder::new(backend, session_layer).build()
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
