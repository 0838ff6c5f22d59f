use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChannelId, EntryId, GiveawayId, Winner};

/// Why a participant may not enter right now. The message is meant for the
/// participant, so it names what they can do about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ineligibility {
    NotRegistered,
    Banned,
    GateNotPassed,
    Suspended,
    PremiumRequired,
    PremiumCheckUnavailable,
    ConditionChannelNotJoined { channel_id: ChannelId },
    ConditionCheckUnavailable { channel_id: ChannelId },
    PaidCommentUnsupported,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligibility::NotRegistered | Ineligibility::GateNotPassed => {
                f.write_str("complete the mandatory channel check first")
            }
            Ineligibility::Banned => f.write_str("participant is banned"),
            Ineligibility::Suspended => {
                f.write_str("rejoin the mandatory channels to lift your suspension")
            }
            Ineligibility::PremiumRequired => {
                f.write_str("this giveaway is open to premium subscribers only")
            }
            Ineligibility::PremiumCheckUnavailable => {
                f.write_str("premium status cannot be verified right now")
            }
            Ineligibility::ConditionChannelNotJoined { channel_id } => {
                write!(f, "join the condition channel {channel_id}")
            }
            Ineligibility::ConditionCheckUnavailable { channel_id } => {
                write!(f, "membership in channel {channel_id} cannot be verified right now")
            }
            Ineligibility::PaidCommentUnsupported => {
                f.write_str("the paid comment condition cannot be verified in this version")
            }
        }
    }
}

/// Result of an inbound entry submission. Every participant-facing path ends
/// in one of these; store failures are the only errors that escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { entry_id: EntryId, seq_no: i64 },
    AlreadyEntered,
    InvalidToken,
    GiveawayClosed,
    Ineligible(Ineligibility),
    /// Suppressed by the request debounce; nothing was read or written.
    Throttled,
}

impl SubmitOutcome {
    pub fn tag(&self) -> &'static str {
        match self {
            SubmitOutcome::Accepted { .. } => "accepted",
            SubmitOutcome::AlreadyEntered => "already_entered",
            SubmitOutcome::InvalidToken => "invalid_token",
            SubmitOutcome::GiveawayClosed => "giveaway_closed",
            SubmitOutcome::Ineligible(_) => "ineligible",
            SubmitOutcome::Throttled => "throttled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawOutcome {
    Completed,
    NoEligibleCandidates,
    /// The giveaway had been drawn before this call; winners are the stored set.
    AlreadyDrawn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawReport {
    pub giveaway_id: GiveawayId,
    pub outcome: DrawOutcome,
    pub winners: Vec<Winner>,
    pub drawn_at: Option<DateTime<Utc>>,
}
