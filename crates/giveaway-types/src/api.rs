use serde::{Deserialize, Serialize};

use crate::models::{ChannelId, EntryId, Giveaway, GiveawayId, ParticipantId};
use crate::outcome::{Ineligibility, SubmitOutcome};

// -- Entries --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitEntryRequest {
    pub token: String,
    pub participant_id: ParticipantId,
    pub handle: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitEntryResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ineligibility: Option<Ineligibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<EntryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<i64>,
}

impl From<SubmitOutcome> for SubmitEntryResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        let tag = outcome.tag();
        match outcome {
            SubmitOutcome::Accepted { entry_id, seq_no } => Self {
                outcome: tag,
                reason: None,
                ineligibility: None,
                entry_id: Some(entry_id),
                seq_no: Some(seq_no),
            },
            SubmitOutcome::Ineligible(reason) => Self {
                outcome: tag,
                reason: Some(reason.to_string()),
                ineligibility: Some(reason),
                entry_id: None,
                seq_no: None,
            },
            _ => Self {
                outcome: tag,
                reason: None,
                ineligibility: None,
                entry_id: None,
                seq_no: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExcludeEntryResponse {
    pub entry_id: EntryId,
    pub excluded: bool,
}

// -- Participants --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateCheckRequest {
    pub participant_id: ParticipantId,
    pub handle: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GateCheckResponse {
    pub participant_id: ParticipantId,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelEntryCount {
    pub channel_id: ChannelId,
    pub entries: i64,
}

#[derive(Debug, Serialize)]
pub struct ParticipantStats {
    pub participant_id: ParticipantId,
    /// Entries in giveaways that have not been drawn yet.
    pub active_entries: i64,
    pub top_channels: Vec<ChannelEntryCount>,
}

// -- Giveaways --

#[derive(Debug, Serialize)]
pub struct CreateGiveawayResponse {
    pub giveaway: Giveaway,
    /// Participation token to embed in the published control.
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipationTokenResponse {
    pub giveaway_id: GiveawayId,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ineligible_response_carries_reason() {
        let resp = SubmitEntryResponse::from(SubmitOutcome::Ineligible(Ineligibility::Suspended));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["outcome"], "ineligible");
        assert_eq!(json["ineligibility"]["kind"], "suspended");
        assert!(json["reason"].as_str().unwrap().contains("suspension"));
        assert!(json.get("entry_id").is_none());
    }

    #[test]
    fn accepted_response_carries_sequence() {
        let resp = SubmitEntryResponse::from(SubmitOutcome::Accepted { entry_id: 4, seq_no: 2 });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["outcome"], "accepted");
        assert_eq!(json["seq_no"], 2);
        assert!(json.get("reason").is_none());
    }
}
