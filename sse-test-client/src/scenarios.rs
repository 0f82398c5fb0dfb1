use anyhow::Result;
use colored::*;
use events::{Event, EventName};
use reqwest::StatusCode;
use std::time::{Duration, Instant};

use crate::api_client::ApiClient;
use crate::auth::AuthenticatedUser;
use crate::output::TestResult;
use crate::sse_client::{Connection, ReceivedEvent};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE_WINDOW: Duration = Duration::from_secs(1);

fn message_text(received: &ReceivedEvent) -> Option<&str> {
    match &received.event {
        Event::Message(data) => Some(data.message()),
        Event::Ping(_) => None,
    }
}

fn finish(name: &str, start: Instant, outcome: Result<()>) -> TestResult {
    match outcome {
        Ok(()) => {
            println!("{} {}", "✓".green(), name);
            TestResult::pass(name, start.elapsed())
        }
        Err(e) => {
            println!("{} {}: {}", "✗".red(), name, e);
            TestResult::fail(name, e.to_string(), start.elapsed())
        }
    }
}

/// Both connections get the ping that is pushed on connect.
pub async fn test_connection(sse1: &mut Connection, sse2: &mut Connection) -> Result<TestResult> {
    let name = "connection_test";
    println!("\n{} Running {}...", "→".blue(), name);
    let start = Instant::now();

    let outcome = async {
        sse1.wait_for_event(EventName::Ping, EVENT_TIMEOUT).await?;
        sse2.wait_for_event(EventName::Ping, EVENT_TIMEOUT).await?;
        Ok::<(), anyhow::Error>(())
    }
    .await;

    Ok(finish(name, start, outcome))
}

/// A message sent by user 1 reaches user 1's own stream and nobody else's.
pub async fn test_send_message(
    user1: &AuthenticatedUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let name = "send_message";
    println!("\n{} Running {}...", "→".blue(), name);
    let start = Instant::now();

    let outcome = async {
        api_client.send_message(&user1.session_cookie, "hi").await?;

        let received = sse1
            .wait_for_event(EventName::Message, EVENT_TIMEOUT)
            .await?;
        if message_text(&received) != Some("hi") {
            anyhow::bail!("{} received {:?}", sse1.user_label, received.event);
        }
        log::debug!(
            "{} received the message {:?} after the request started",
            sse1.user_label,
            received.received_at.duration_since(start)
        );

        sse2.expect_no_event(EventName::Message, SILENCE_WINDOW)
            .await
    }
    .await;

    Ok(finish(name, start, outcome))
}

/// One broadcast to both users' channels reaches both streams.
pub async fn test_broadcast(
    user1: &AuthenticatedUser,
    user2: &AuthenticatedUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let name = "broadcast";
    println!("\n{} Running {}...", "→".blue(), name);
    let start = Instant::now();

    let outcome = async {
        let text = "broadcast from sse-test-client";
        let response = api_client
            .broadcast(
                &user1.session_cookie,
                &[user1.user_id.as_str(), user2.user_id.as_str()],
                text,
            )
            .await?;
        log::debug!("broadcast response: {}", response);

        for sse in [sse1, sse2] {
            let received = sse
                .wait_for_event(EventName::Message, EVENT_TIMEOUT)
                .await?;
            if message_text(&received) != Some(text) {
                anyhow::bail!("{} received {:?}", sse.user_label, received.event);
            }
            log::debug!(
                "{} received the broadcast {:?} after the request started",
                sse.user_label,
                received.received_at.duration_since(start)
            );
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    Ok(finish(name, start, outcome))
}

/// An empty message is refused before anything is delivered.
pub async fn test_empty_message_rejected(
    user1: &AuthenticatedUser,
    api_client: &ApiClient,
    sse1: &mut Connection,
) -> Result<TestResult> {
    let name = "empty_message_rejected";
    println!("\n{} Running {}...", "→".blue(), name);
    let start = Instant::now();

    let outcome = async {
        let status = api_client.send_empty_message(&user1.session_cookie).await?;
        if status != StatusCode::BAD_REQUEST {
            anyhow::bail!("expected 400 Bad Request, got {}", status);
        }
        sse1.expect_no_event(EventName::Message, SILENCE_WINDOW)
            .await
    }
    .await;

    Ok(finish(name, start, outcome))
}
