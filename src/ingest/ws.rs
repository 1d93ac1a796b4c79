//! WebSocket news feed
//!
//! Connects to a push endpoint, decodes JSON news messages (a single item or
//! an array) and publishes them into a [`NewsHub`]. Reconnects with
//! exponential backoff until shut down.

use super::{IngestError, NewsHub};
use crate::model::NewsItem;
use crate::telemetry::{self, CounterMetric};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket feed configuration
#[derive(Debug, Clone)]
pub struct WsNewsConfig {
    pub url: String,
    /// Maximum consecutive reconnection attempts (0 = infinite)
    pub max_reconnect_attempts: u32,
    pub initial_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub ping_interval: Duration,
}

impl Default for WsNewsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl WsNewsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NewsPayload {
    One(NewsItem),
    Many(Vec<NewsItem>),
}

/// How a single connection ended
enum StreamEnd {
    Shutdown,
    ServerClosed,
}

/// Push news feed backed by a WebSocket connection
pub struct WsNewsFeed {
    config: WsNewsConfig,
    hub: Arc<NewsHub>,
}

impl WsNewsFeed {
    pub fn new(config: WsNewsConfig, hub: Arc<NewsHub>) -> Self {
        Self { config, hub }
    }

    /// Run the feed on a background task
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(shutdown).await {
                tracing::error!(error = %e, "News feed stopped");
            }
        })
    }

    /// Decode one text frame
    pub(crate) fn parse_message(text: &str) -> Vec<NewsItem> {
        match serde_json::from_str::<NewsPayload>(text) {
            Ok(NewsPayload::One(item)) => vec![item],
            Ok(NewsPayload::Many(items)) => items,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable news message");
                Vec::new()
            }
        }
    }

    /// Publish every item in a frame, returning how many were new
    async fn handle_text(&self, text: &str) -> usize {
        let mut accepted = 0;
        for item in Self::parse_message(text) {
            if self.hub.publish(item).await {
                telemetry::increment(CounterMetric::NewsReceived);
                accepted += 1;
            }
        }
        accepted
    }

    /// Connection loop with exponential backoff
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), IngestError> {
        let mut attempts = 0;
        let mut delay = self.config.initial_reconnect_delay;

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            match self.connect_and_stream(&mut shutdown).await {
                Ok(StreamEnd::Shutdown) => return Ok(()),
                Ok(StreamEnd::ServerClosed) => {
                    tracing::info!("News feed closed by server, reconnecting");
                    attempts = 0;
                    delay = self.config.initial_reconnect_delay;
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(error = %e, attempt = attempts, "News feed connection error, reconnecting...");

                    if self.config.max_reconnect_attempts > 0
                        && attempts >= self.config.max_reconnect_attempts
                    {
                        return Err(IngestError::MaxReconnectsExceeded);
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return Ok(()),
            }
            delay = (delay * 2).min(self.config.max_reconnect_delay);
        }
    }

    async fn connect_and_stream(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StreamEnd, IngestError> {
        tracing::info!(url = %self.config.url, "Connecting to news feed");

        let (ws_stream, _response) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| IngestError::WebSocket(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        tracing::info!("News feed connected");

        let mut ping_interval = tokio::time::interval(self.config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(StreamEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| IngestError::WebSocket(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(_))) => return Ok(StreamEnd::ServerClosed),
                        Some(Err(e)) => return Err(IngestError::WebSocket(e.to_string())),
                        None => return Err(IngestError::WebSocket("Stream ended unexpectedly".into())),
                        _ => {}
                    }
                }
                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        return Err(IngestError::WebSocket("Pong timeout".into()));
                    }
                    write.send(Message::Ping(Vec::new())).await
                        .map_err(|e| IngestError::WebSocket(e.to_string()))?;
                    waiting_for_pong = true;
                }
            }
        }
    }
}
