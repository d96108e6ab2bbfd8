//! Notification dispatch for matched listings: broadcast announcements to a
//! chat channel and per-subscriber push delivery, batched and best-effort.

use std::sync::Mutex;

use async_trait::async_trait;
use fm_core::{bath_display, bed_display, fee_display, price_display, Listing};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

pub const CRATE_NAME: &str = "fm-notify";

/// Push recipients beyond this are split into sequential batches.
pub const PUSH_BATCH_SIZE: usize = 100;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const EXPO_PUSH_URL: &str = "https://api.expo.dev/v2/push/send";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transport rejected payload: {0}")]
    Rejected(String),
}

/// Broadcast channel accepting `(chat_id, text)`.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError>;
}

/// Push service accepting one batch of recipient tokens.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send_batch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        url: &str,
    ) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: BroadcastTransport + ?Sized> BroadcastTransport for std::sync::Arc<T> {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        (**self).send(chat_id, text).await
    }
}

#[async_trait]
impl<T: PushTransport + ?Sized> PushTransport for std::sync::Arc<T> {
    async fn send_batch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        url: &str,
    ) -> Result<(), NotifyError> {
        (**self).send_batch(tokens, title, body, url).await
    }
}

/// Telegram Bot API `sendMessage` with HTML parse mode.
pub struct TelegramTransport {
    client: reqwest::Client,
    bot_token: String,
}

impl TelegramTransport {
    pub fn new(client: reqwest::Client, bot_token: impl Into<String>) -> Self {
        Self {
            client,
            bot_token: bot_token.into(),
        }
    }
}

#[async_trait]
impl BroadcastTransport for TelegramTransport {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{TELEGRAM_API_BASE}/bot{}/sendMessage", self.bot_token);
        self.client
            .post(&url)
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Expo push API client; one call per batch of at most 100 tokens.
pub struct ExpoPushTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl ExpoPushTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_endpoint(client, EXPO_PUSH_URL)
    }

    pub fn with_endpoint(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PushTransport for ExpoPushTransport {
    async fn send_batch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        url: &str,
    ) -> Result<(), NotifyError> {
        self.client
            .post(&self.endpoint)
            .json(&json!({
                "to": tokens,
                "title": title,
                "body": body,
                "sound": "default",
                "data": { "url": url },
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// "New Listing in Soho" (falls back to the city when the area is unknown).
pub fn push_title(listing: &Listing) -> String {
    format!(
        "New Listing in {}",
        listing.area_name.as_deref().unwrap_or("New York")
    )
}

/// "$2,600 | 1 Bed | 1.5 Bath"
pub fn push_body(listing: &Listing) -> String {
    format!(
        "{} | {} | {}",
        price_display(listing.price),
        bed_display(listing.bedroom_count),
        bath_display(listing.full_bathroom_count, listing.half_bathroom_count)
    )
}

/// Broadcast message for a saved-search match, HTML formatted for the chat
/// transport.
pub fn broadcast_text(owner: &str, listing: &Listing, listing_url: Option<&str>) -> String {
    let mut text = format!(
        "<b>New match for {owner}</b>\n{} | {} | {}\n{}",
        price_display(listing.price),
        fee_display(listing.no_fee),
        listing.area_name.as_deref().unwrap_or(""),
        push_body(listing),
    );
    if let Some(url) = listing_url {
        text.push('\n');
        text.push_str(url);
    }
    text
}

/// Fans a match out to the configured transports. Failures are logged and
/// isolated; nothing here ever aborts a pipeline run.
pub struct NotificationDispatcher {
    broadcast: Box<dyn BroadcastTransport>,
    push: Box<dyn PushTransport>,
}

impl NotificationDispatcher {
    pub fn new(broadcast: Box<dyn BroadcastTransport>, push: Box<dyn PushTransport>) -> Self {
        Self { broadcast, push }
    }

    /// Best-effort broadcast; returns whether the send succeeded.
    pub async fn broadcast(&self, chat_id: &str, text: &str) -> bool {
        match self.broadcast.send(chat_id, text).await {
            Ok(()) => true,
            Err(err) => {
                warn!(chat_id, error = %err, "broadcast dispatch failed");
                false
            }
        }
    }

    /// Chunks recipients into batches of [`PUSH_BATCH_SIZE`] and dispatches
    /// them sequentially. A failing batch is logged and skipped; the rest are
    /// still attempted. Returns the number of batches delivered.
    pub async fn push_all(&self, tokens: &[String], title: &str, body: &str, url: &str) -> usize {
        let mut delivered = 0usize;
        for (index, batch) in tokens.chunks(PUSH_BATCH_SIZE).enumerate() {
            match self.push.send_batch(batch, title, body, url).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(batch = index, size = batch.len(), error = %err, "push batch failed");
                }
            }
        }
        delivered
    }
}

/// Recording broadcast transport for tests.
#[derive(Default)]
pub struct MockBroadcastTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl MockBroadcastTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_sends(&self) {
        *self.fail.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BroadcastTransport for MockBroadcastTransport {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        if *self.fail.lock().unwrap() {
            return Err(NotifyError::Rejected("simulated broadcast failure".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Recording push transport for tests; can fail selected batch indexes.
#[derive(Default)]
pub struct MockPushTransport {
    batch_sizes: Mutex<Vec<usize>>,
    fail_batches: Mutex<Vec<usize>>,
    calls: Mutex<usize>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_batch(&self, index: usize) {
        self.fail_batches.lock().unwrap().push(index);
    }

    /// Sizes of the batches that were delivered, in dispatch order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn send_batch(
        &self,
        tokens: &[String],
        _title: &str,
        _body: &str,
        _url: &str,
    ) -> Result<(), NotifyError> {
        let mut calls = self.calls.lock().unwrap();
        let index = *calls;
        *calls += 1;
        drop(calls);

        if self.fail_batches.lock().unwrap().contains(&index) {
            return Err(NotifyError::Rejected("simulated push failure".into()));
        }
        self.batch_sizes.lock().unwrap().push(tokens.len());
        Ok(())
    }
}
