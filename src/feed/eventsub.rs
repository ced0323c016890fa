//! EventSub websocket lifecycle.
//!
//! Owns the socket for the life of the process: connect, take the session
//! id from the welcome frame, register the subscriptions the classifier
//! feeds on, then forward parsed notifications into the event loop's
//! channel. Reconnect frames and socket drops are handled here; nothing
//! in this module is fatal to the reducer.

use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use url::Url;

use crate::config::Config;
use crate::feed::notification::{self, Envelope, Notification};
use crate::logging::{self, obj, v_str, Domain, Level};
use crate::retry::{retry_async, RetryConfig};

/// Subscription types the widget listens to. Chat carries commands,
/// cheers and (in message mode) bridge announcements; the rest are the
/// structured signals for event mode.
const SUBSCRIPTIONS: &[(&str, &str)] = &[
    ("channel.chat.message", "1"),
    ("channel.subscribe", "1"),
    ("channel.subscription.message", "1"),
    ("channel.subscription.gift", "1"),
];

enum SessionEnd {
    /// Server asked us to move to a new URL; subscriptions carry over.
    Reconnect(String),
    /// Socket closed or errored mid-stream; start over from the base URL.
    Closed,
    /// The event loop dropped its receiver; nothing left to feed.
    ReceiverGone,
}

pub async fn run(cfg: Config, sender: mpsc::Sender<Notification>) {
    let client = Client::new();
    let retry_cfg = RetryConfig::default();
    let mut ws_url = cfg.eventsub_url.clone();
    let mut register = true;

    loop {
        match run_session(&cfg, &client, &retry_cfg, &ws_url, register, &sender).await {
            Ok(SessionEnd::Reconnect(next)) => {
                logging::log(
                    Level::Info,
                    Domain::Transport,
                    "reconnect",
                    obj(&[("url", v_str(&next))]),
                );
                ws_url = next;
                register = false;
            }
            Ok(SessionEnd::Closed) => {
                logging::log(Level::Warn, Domain::Transport, "socket_closed", obj(&[]));
                ws_url = cfg.eventsub_url.clone();
                register = true;
                sleep(Duration::from_secs(5)).await;
            }
            Ok(SessionEnd::ReceiverGone) => return,
            Err(err) => {
                logging::log(
                    Level::Error,
                    Domain::Transport,
                    "session_error",
                    obj(&[("error", v_str(&err.to_string()))]),
                );
                ws_url = cfg.eventsub_url.clone();
                register = true;
                sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

async fn run_session(
    cfg: &Config,
    client: &Client,
    retry_cfg: &RetryConfig,
    ws_url: &str,
    register: bool,
    sender: &mpsc::Sender<Notification>,
) -> Result<SessionEnd> {
    let (ws, _) = tokio_tungstenite::connect_async(ws_url).await?;
    logging::log(
        Level::Info,
        Domain::Transport,
        "connected",
        obj(&[("url", v_str(ws_url))]),
    );
    let (_write, mut read) = ws.split();

    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => break,
        };
        let text = match msg.into_text() {
            Ok(text) => text,
            Err(_) => continue,
        };
        let env: Envelope = match serde_json::from_str(&text) {
            Ok(env) => env,
            Err(_) => continue,
        };

        match env.metadata.message_type.as_str() {
            "session_welcome" => {
                if register {
                    let session_id = env
                        .payload
                        .pointer("/session/id")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| anyhow!("welcome frame without session id"))?;
                    register_subscriptions(cfg, client, retry_cfg, session_id).await?;
                }
            }

            "session_keepalive" => {}

            "session_reconnect" => {
                if let Some(next) = env
                    .payload
                    .pointer("/session/reconnect_url")
                    .and_then(|v| v.as_str())
                {
                    let next = Url::parse(next)?;
                    return Ok(SessionEnd::Reconnect(next.as_str().to_string()));
                }
            }

            "notification" => {
                let kind = match env.metadata.subscription_type.as_deref() {
                    Some(kind) => kind,
                    None => continue,
                };
                let event = match env.payload.get("event") {
                    Some(event) => event,
                    None => continue,
                };
                match notification::from_event(kind, event) {
                    Some(note) => {
                        if sender.send(note).await.is_err() {
                            return Ok(SessionEnd::ReceiverGone);
                        }
                    }
                    None => {
                        logging::log(
                            Level::Trace,
                            Domain::Transport,
                            "dropped",
                            obj(&[("type", v_str(kind))]),
                        );
                    }
                }
            }

            other => {
                logging::log(
                    Level::Trace,
                    Domain::Transport,
                    "unhandled_frame",
                    obj(&[("type", v_str(other))]),
                );
            }
        }
    }

    Ok(SessionEnd::Closed)
}

async fn register_subscriptions(
    cfg: &Config,
    client: &Client,
    retry_cfg: &RetryConfig,
    session_id: &str,
) -> Result<()> {
    for (event_type, version) in SUBSCRIPTIONS.iter().copied() {
        retry_async(retry_cfg, event_type, || {
            create_subscription(cfg, client, session_id, event_type, version)
        })
        .await?;
        logging::log(
            Level::Info,
            Domain::Transport,
            "subscribed",
            obj(&[("type", v_str(event_type))]),
        );
    }
    Ok(())
}

async fn create_subscription(
    cfg: &Config,
    client: &Client,
    session_id: &str,
    event_type: &str,
    version: &str,
) -> Result<()> {
    let url = format!("{}/eventsub/subscriptions", cfg.helix_base);
    let resp = client
        .post(url)
        .bearer_auth(&cfg.token)
        .header("Client-Id", &cfg.client_id)
        .json(&json!({
            "type": event_type,
            "version": version,
            "condition": condition_for(event_type, cfg),
            "transport": {
                "method": "websocket",
                "session_id": session_id,
            },
        }))
        .send()
        .await?;

    let status = resp.status().as_u16();
    // 409 means the subscription already exists from a previous session.
    if resp.status().is_success() || status == 409 {
        Ok(())
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(anyhow!("subscribe {} failed: {} {}", event_type, status, body))
    }
}

fn condition_for(event_type: &str, cfg: &Config) -> serde_json::Value {
    match event_type {
        // Chat subscriptions name the reading user as well.
        "channel.chat.message" => json!({
            "broadcaster_user_id": cfg.channel_user_id,
            "user_id": cfg.bot_user_id,
        }),
        _ => json!({ "broadcaster_user_id": cfg.channel_user_id }),
    }
}
