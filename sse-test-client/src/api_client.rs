use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Sends `message` to every open connection of the session's own user.
    pub async fn send_message(&self, session_cookie: &str, message: &str) -> Result<Value> {
        let url = format!("{}/sse/send-message", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Cookie", format!("id={}", session_cookie))
            .json(&json!({ "message": message }))
            .send()
            .await
            .context("Failed to send message")?;

        Self::into_data(response, "send message").await
    }

    pub async fn broadcast(
        &self,
        session_cookie: &str,
        channel_ids: &[&str],
        message: &str,
    ) -> Result<Value> {
        let url = format!("{}/sse/broadcast", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Cookie", format!("id={}", session_cookie))
            .json(&json!({ "channel_ids": channel_ids, "message": message }))
            .send()
            .await
            .context("Failed to broadcast")?;

        Self::into_data(response, "broadcast").await
    }

    /// Posts an empty message and returns the status the server answered with.
    pub async fn send_empty_message(&self, session_cookie: &str) -> Result<StatusCode> {
        let url = format!("{}/sse/send-message", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Cookie", format!("id={}", session_cookie))
            .json(&json!({ "message": "" }))
            .send()
            .await
            .context("Failed to send empty message")?;

        Ok(response.status())
    }

    async fn into_data(response: reqwest::Response, action: &str) -> Result<Value> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Failed to {}: {} - Response: {}", action, status, body);
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;

        // Extract the data from ApiResponse wrapper
        api_response["data"]
            .as_object()
            .context("No data object in response")
            .map(|obj| Value::Object(obj.clone()))
    }
}
