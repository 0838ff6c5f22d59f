//! Eligibility rules.
//!
//! Entry time is fail-closed: a participant whose conditions cannot be
//! confirmed does not get in. Draw time is fail-open for platform errors
//! unless the giveaway asked for the anti-fraud re-check, so an outage does
//! not silently shrink the candidate pool. The periodic mandatory-channel
//! re-check only suspends on an explicit negative answer.

use tracing::{debug, warn};

use giveaway_types::models::{ChannelId, Entry, Giveaway, Participant, ParticipantId};
use giveaway_types::outcome::Ineligibility;

use crate::platform::{Platform, PlatformClient};

/// Whether `participant` may enter `giveaway` right now.
///
/// Checks run cheapest first and stop at the first failure, so the reason
/// returned is the first one the participant has to fix.
pub async fn may_enter<P: PlatformClient>(
    platform: &Platform<P>,
    participant: &Participant,
    giveaway: &Giveaway,
) -> Result<(), Ineligibility> {
    if participant.is_banned {
        return Err(Ineligibility::Banned);
    }
    if !participant.gate_verified {
        return Err(Ineligibility::GateNotPassed);
    }
    if participant.suspended {
        return Err(Ineligibility::Suspended);
    }

    if giveaway.premium_only {
        match platform.premium_status(participant.id).await {
            Ok(true) => {}
            Ok(false) => return Err(Ineligibility::PremiumRequired),
            Err(e) => {
                warn!(participant = participant.id, "Premium lookup failed: {}", e);
                return Err(Ineligibility::PremiumCheckUnavailable);
            }
        }
    }

    for &channel_id in &giveaway.condition_channels {
        match platform.membership_status(channel_id, participant.id).await {
            Ok(status) if status.is_present() => {}
            Ok(status) => {
                debug!(participant = participant.id, channel_id, ?status, "Not in condition channel");
                return Err(Ineligibility::ConditionChannelNotJoined { channel_id });
            }
            Err(e) => {
                warn!(
                    participant = participant.id,
                    channel_id, "Condition channel check failed: {}", e
                );
                return Err(Ineligibility::ConditionCheckUnavailable { channel_id });
            }
        }
    }

    // No verification path exists for paid comments, so nobody satisfies it.
    if giveaway.paid_comment_condition {
        return Err(Ineligibility::PaidCommentUnsupported);
    }

    Ok(())
}

/// Whether an entry is still a valid draw candidate.
pub async fn recheck_at_draw<P: PlatformClient>(
    platform: &Platform<P>,
    entry: &Entry,
    giveaway: &Giveaway,
) -> bool {
    for &channel_id in &giveaway.condition_channels {
        match platform.membership_status(channel_id, entry.participant_id).await {
            Ok(status) if status.is_present() => {}
            Ok(_) => return false,
            Err(e) => {
                warn!(
                    giveaway = giveaway.id,
                    participant = entry.participant_id,
                    channel_id,
                    "Draw-time membership check failed: {}",
                    e
                );
                if giveaway.anti_fraud_recheck_on_draw {
                    return false;
                }
            }
        }
    }
    !giveaway.paid_comment_condition
}

/// Result of checking one participant against every mandatory channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipVerdict {
    /// Every channel answered and the participant is in all of them.
    Present,
    /// At least one channel answered that the participant is not a member.
    Absent,
    /// No channel said no, but at least one could not be asked.
    Unknown,
}

pub async fn mandatory_membership<P: PlatformClient>(
    platform: &Platform<P>,
    channels: &[ChannelId],
    participant_id: ParticipantId,
) -> MembershipVerdict {
    let mut verdict = MembershipVerdict::Present;
    for &channel_id in channels {
        match platform.membership_status(channel_id, participant_id).await {
            Ok(status) if status.is_present() => {}
            Ok(_) => return MembershipVerdict::Absent,
            Err(e) => {
                debug!(participant = participant_id, channel_id, "Membership check skipped: {}", e);
                verdict = MembershipVerdict::Unknown;
            }
        }
    }
    verdict
}
