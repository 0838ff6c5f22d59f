use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use giveaway_types::models::{ChannelId, MembershipStatus, ParticipantId};

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform query timed out")]
    Timeout,

    #[error("platform transport error: {0}")]
    Transport(String),

    #[error("platform rejected the query: {0}")]
    Api(String),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),
}

/// Queries the messaging platform answers for the engine. Any call may fail
/// or hang; the engine bounds each one with a timeout and never reads a
/// failure as "not a member".
pub trait PlatformClient: Send + Sync + 'static {
    fn membership_status(
        &self,
        channel_id: ChannelId,
        participant_id: ParticipantId,
    ) -> impl Future<Output = Result<MembershipStatus, PlatformError>> + Send;

    fn premium_status(
        &self,
        participant_id: ParticipantId,
    ) -> impl Future<Output = Result<bool, PlatformError>> + Send;

    /// Resolve a public channel username (without `@`) to its numeric id.
    fn resolve_channel(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<ChannelId, PlatformError>> + Send;
}

/// A configured mandatory channel: either a numeric id or a public username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    Id(ChannelId),
    Username(String),
}

impl ChannelRef {
    /// Accepts `@name`, `t.me/name` links (with or without scheme, query or
    /// trailing slash) and numeric ids. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(id) = raw.parse::<ChannelId>() {
            return Some(ChannelRef::Id(id));
        }
        if let Some(name) = raw.strip_prefix('@') {
            return valid_username(name).map(ChannelRef::Username);
        }
        if let Some((_, rest)) = raw.split_once("t.me/") {
            let name = rest.split('?').next().unwrap_or_default().trim_matches('/');
            return valid_username(name).map(ChannelRef::Username);
        }
        None
    }

    /// Parse a comma-separated list, dropping entries that do not parse.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',').filter_map(ChannelRef::parse).collect()
    }
}

fn valid_username(name: &str) -> Option<String> {
    let ok = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    ok.then(|| name.to_string())
}

/// Timeout-bounded handle on the platform collaborator.
pub struct Platform<P> {
    client: Arc<P>,
    timeout: Duration,
}

impl<P: PlatformClient> Platform<P> {
    pub fn new(client: Arc<P>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub async fn membership_status(
        &self,
        channel_id: ChannelId,
        participant_id: ParticipantId,
    ) -> Result<MembershipStatus, PlatformError> {
        tokio::time::timeout(
            self.timeout,
            self.client.membership_status(channel_id, participant_id),
        )
        .await
        .map_err(|_| PlatformError::Timeout)?
    }

    pub async fn premium_status(&self, participant_id: ParticipantId) -> Result<bool, PlatformError> {
        tokio::time::timeout(self.timeout, self.client.premium_status(participant_id))
            .await
            .map_err(|_| PlatformError::Timeout)?
    }

    pub async fn resolve(&self, channel: &ChannelRef) -> Result<ChannelId, PlatformError> {
        match channel {
            ChannelRef::Id(id) => Ok(*id),
            ChannelRef::Username(name) => {
                tokio::time::timeout(self.timeout, self.client.resolve_channel(name))
                    .await
                    .map_err(|_| PlatformError::Timeout)?
            }
        }
    }
}
