use anyhow::Result;
use eventsource_client::{self as es, Client};
use events::{Event, EventName};
use futures_util::stream::StreamExt;
use log::*;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event: Event,
    pub received_at: Instant,
}

pub struct Connection {
    pub user_label: String,
    event_rx: mpsc::UnboundedReceiver<ReceivedEvent>,
    _handle: tokio::task::JoinHandle<()>,
}

/// Decodes the payload of one `data:` frame. A frame that is not a valid
/// event is logged and dropped; the stream carries on.
pub fn decode_frame(label: &str, data: &str) -> Option<Event> {
    match Event::from_json(data) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Dropping malformed frame for {}: {} ({})", label, data, e);
            None
        }
    }
}

impl Connection {
    pub async fn establish(
        base_url: &str,
        session_cookie: &str,
        user_label: String,
    ) -> Result<Self> {
        let url = format!("{}/sse", base_url);
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(&url)?
            .header("Cookie", &format!("id={}", session_cookie))?
            .build();

        let label = user_label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(frame))) => {
                        let Some(event) = decode_frame(&label, &frame.data) else {
                            continue;
                        };
                        debug!("{} received {}", label, event.name());

                        let received = ReceivedEvent {
                            event,
                            received_at: Instant::now(),
                        };
                        if tx.send(received).is_err() {
                            debug!("SSE receiver dropped for {}", label);
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Comments and connection notices carry no event
                    }
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", label, e);
                    }
                    None => {
                        debug!("SSE stream ended for {}", label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            user_label,
            event_rx: rx,
            _handle: handle,
        })
    }

    pub async fn wait_for_event(
        &mut self,
        name: EventName,
        timeout: Duration,
    ) -> Result<ReceivedEvent> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", name);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(received)) if received.event.name() == name => {
                    return Ok(received);
                }
                Ok(Some(_)) => {
                    // Wrong event type, keep waiting
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("SSE connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", name);
                }
            }
        }
    }

    /// Succeeds when no `name` event arrives within `window`.
    pub async fn expect_no_event(&mut self, name: EventName, window: Duration) -> Result<()> {
        match self.wait_for_event(name, window).await {
            Ok(received) => anyhow::bail!(
                "{} unexpectedly received {:?}",
                self.user_label,
                received.event
            ),
            Err(_) => Ok(()),
        }
    }
}
