use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use giveaway_engine::{ChannelRef, PlatformClient, PlatformError};
use giveaway_types::models::{ChannelId, MembershipStatus, ParticipantId};

/// Telegram Bot API client backing the engine's platform queries.
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
    /// Premium status is read from a membership record in one of these.
    mandatory_channels: Vec<ChannelRef>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: MembershipStatus,
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    #[serde(default)]
    is_premium: bool,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: ChannelId,
}

impl TelegramClient {
    pub fn new(
        base_url: &str,
        bot_token: &str,
        timeout: Duration,
        mandatory_channels: Vec<ChannelRef>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            mandatory_channels,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> Result<T, PlatformError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.bot_token, method);
        let resp = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;
        let bytes = resp.bytes().await.map_err(transport_error)?;
        decode(method, &bytes)
    }

    async fn chat_member(&self, chat_id: ChannelId, user_id: ParticipantId) -> Result<ChatMember, PlatformError> {
        self.call(
            "getChatMember",
            &[("chat_id", chat_id.to_string()), ("user_id", user_id.to_string())],
        )
        .await
    }

    async fn premium_channel(&self) -> Result<ChannelId, PlatformError> {
        let mut last = PlatformError::Api("no mandatory channel to read premium status from".into());
        for channel in &self.mandatory_channels {
            let resolved = match channel {
                ChannelRef::Id(id) => Ok(*id),
                ChannelRef::Username(name) => self.resolve_channel(name).await,
            };
            match resolved {
                Ok(id) => return Ok(id),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}

impl PlatformClient for TelegramClient {
    async fn membership_status(
        &self,
        channel_id: ChannelId,
        participant_id: ParticipantId,
    ) -> Result<MembershipStatus, PlatformError> {
        let member = self.chat_member(channel_id, participant_id).await?;
        debug!(channel_id, participant = participant_id, status = ?member.status, "getChatMember");
        Ok(member.status)
    }

    async fn premium_status(&self, participant_id: ParticipantId) -> Result<bool, PlatformError> {
        let channel_id = self.premium_channel().await?;
        Ok(self.chat_member(channel_id, participant_id).await?.user.is_premium)
    }

    async fn resolve_channel(&self, username: &str) -> Result<ChannelId, PlatformError> {
        let chat: Chat = self
            .call("getChat", &[("chat_id", format!("@{username}"))])
            .await
            .map_err(|e| match e {
                PlatformError::Api(msg) => PlatformError::UnknownChannel(format!("@{username}: {msg}")),
                other => other,
            })?;
        Ok(chat.id)
    }
}

/// Strip the URL from reqwest errors; it carries the bot token.
fn transport_error(e: reqwest::Error) -> PlatformError {
    if e.is_timeout() {
        PlatformError::Timeout
    } else {
        PlatformError::Transport(e.without_url().to_string())
    }
}

fn decode<T: DeserializeOwned>(method: &str, bytes: &[u8]) -> Result<T, PlatformError> {
    let body: ApiResponse<T> = serde_json::from_slice(bytes)
        .map_err(|e| PlatformError::Api(format!("{method}: malformed response: {e}")))?;
    if !body.ok {
        let reason = body.description.unwrap_or_else(|| "request failed".into());
        return Err(PlatformError::Api(format!("{method}: {reason}")));
    }
    body.result
        .ok_or_else(|| PlatformError::Api(format!("{method}: response carried no result")))
}
