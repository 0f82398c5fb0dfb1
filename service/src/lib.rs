use config::Config;
use log::info;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<sse::Manager>,
}

impl AppState {
    pub fn new(app_config: Config) -> Self {
        let sse_manager = sse::Manager::new(app_config.sse_heartbeat_interval());
        info!(
            "SSE heartbeat interval: {}s",
            sse_manager.heartbeat_interval().as_secs()
        );

        Self {
            sse_manager: Arc::new(sse_manager),
            config: app_config,
        }
    }
}
