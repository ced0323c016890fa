//! Process configuration from the environment.

#[derive(Clone, Debug)]
pub struct Config {
    /// User token with user:bot, user:read:chat, user:write:chat scopes.
    pub token: String,
    pub client_id: String,
    /// User id of the bot account posting replies.
    pub bot_user_id: String,
    /// User id of the channel being listened to.
    pub channel_user_id: String,
    pub helix_base: String,
    pub id_base: String,
    pub eventsub_url: String,
    pub sqlite_path: String,
    pub render_path: String,
    /// Account whose chat text carries sub announcements in message mode.
    pub bridge_login: String,
    pub feed_channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("TWITCH_TOKEN").unwrap_or_default(),
            client_id: std::env::var("TWITCH_CLIENT_ID").unwrap_or_default(),
            bot_user_id: std::env::var("BOT_USER_ID").unwrap_or_default(),
            channel_user_id: std::env::var("CHANNEL_USER_ID").unwrap_or_default(),
            helix_base: std::env::var("HELIX_BASE")
                .unwrap_or_else(|_| "https://api.twitch.tv/helix".to_string()),
            id_base: std::env::var("ID_BASE")
                .unwrap_or_else(|_| "https://id.twitch.tv".to_string()),
            eventsub_url: std::env::var("EVENTSUB_URL")
                .unwrap_or_else(|_| "wss://eventsub.wss.twitch.tv/ws".to_string()),
            sqlite_path: std::env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "./hypemeter.sqlite".to_string()),
            render_path: std::env::var("RENDER_PATH")
                .unwrap_or_else(|_| "./out/meter.json".to_string()),
            bridge_login: std::env::var("BRIDGE_LOGIN")
                .unwrap_or_else(|_| "streamlabs".to_string()),
            feed_channel_capacity: std::env::var("FEED_CHANNEL_CAP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
        }
    }

    /// Credentials are the only hard startup requirement.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("TWITCH_TOKEN", &self.token),
            ("TWITCH_CLIENT_ID", &self.client_id),
            ("BOT_USER_ID", &self.bot_user_id),
            ("CHANNEL_USER_ID", &self.channel_user_id),
        ] {
            if value.is_empty() {
                anyhow::bail!("missing required env var {}", name);
            }
        }
        Ok(())
    }
}
