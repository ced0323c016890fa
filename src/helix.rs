//! Helix REST collaborators: outbound chat replies and the startup token
//! check. Thin wrappers — the reducer only ever sees the `MessageSink`
//! capability, never a client.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::logging::{self, obj, v_str, Domain, Level};

/// Where reducer `Say` effects go. Injected into the event loop; sends
/// are best-effort and never awaited on the reducer path.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

pub struct HelixSender {
    client: Client,
    helix_base: String,
    token: String,
    client_id: String,
    broadcaster_id: String,
    sender_id: String,
}

impl HelixSender {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            helix_base: cfg.helix_base.clone(),
            token: cfg.token.clone(),
            client_id: cfg.client_id.clone(),
            broadcaster_id: cfg.channel_user_id.clone(),
            sender_id: cfg.bot_user_id.clone(),
        }
    }
}

#[async_trait]
impl MessageSink for HelixSender {
    async fn send(&self, message: &str) -> Result<()> {
        let url = format!("{}/chat/messages", self.helix_base);
        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("Client-Id", &self.client_id)
            .json(&json!({
                "broadcaster_id": self.broadcaster_id,
                "sender_id": self.sender_id,
                "message": message,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("chat send failed: {} {}", status.as_u16(), body));
        }

        logging::log(
            Level::Debug,
            Domain::Chat,
            "sent",
            obj(&[("msg", v_str(message))]),
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub login: String,
    pub user_id: String,
    pub expires_in: u64,
}

/// Validate the bearer token against the identity provider. Invalid
/// credentials are the one startup condition worth dying for.
pub async fn validate_token(client: &Client, id_base: &str, token: &str) -> Result<TokenInfo> {
    let url = format!("{}/oauth2/validate", id_base);
    let resp = client
        .get(url)
        .header("Authorization", format!("OAuth {}", token))
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!(
            "token validation returned {}: {}",
            status.as_u16(),
            body
        ));
    }

    Ok(resp.json().await?)
}
