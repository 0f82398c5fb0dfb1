use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Body of `POST /sse/send-message`.
///
/// # Fields
///
/// * `message` - Text delivered to every open connection of the calling user
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct SendMessageParams {
    pub(crate) message: String,
}

impl SendMessageParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.message.is_empty() {
            return Err(Error::validation("Invalid message"));
        }
        Ok(())
    }
}

/// Body of `POST /sse/broadcast`.
///
/// # Fields
///
/// * `channel_ids` - Target channels (user ids), at least one; `channelIds` is accepted too
/// * `message` - Text delivered to every open connection in each target channel
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct BroadcastParams {
    #[serde(alias = "channelIds")]
    pub(crate) channel_ids: Vec<String>,
    pub(crate) message: String,
}

impl BroadcastParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.channel_ids.is_empty() {
            return Err(Error::validation("At least one channel ID is required."));
        }
        if self.message.is_empty() {
            return Err(Error::validation("Message cannot be empty."));
        }
        Ok(())
    }
}
