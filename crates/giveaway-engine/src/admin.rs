use tracing::{info, warn};

use giveaway_types::api::ParticipantStats;
use giveaway_types::models::{
    AuditEntity, AuditRecord, ChannelId, Giveaway, GiveawayId, NewGiveaway, ParticipantId, Winner,
};

use crate::gate::{self, MembershipVerdict};
use crate::platform::PlatformClient;
use crate::{Engine, EngineError, EngineResult};

/// How many target channels the participant stats list.
const TOP_CHANNELS: u32 = 10;

impl<P: PlatformClient> Engine<P> {
    /// Persist a finished giveaway definition and hand back its participation token.
    pub async fn create_giveaway(
        &self,
        creator_id: ParticipantId,
        new: NewGiveaway,
    ) -> EngineResult<(Giveaway, String)> {
        new.validate().map_err(EngineError::Validation)?;
        let giveaway = self.store(move |db| db.insert_giveaway(creator_id, &new)).await?;
        let token = self
            .inner
            .codec
            .issue_participation(giveaway.id)
            .map_err(EngineError::Token)?;
        info!(giveaway = giveaway.id, creator = creator_id, "Giveaway created");
        Ok((giveaway, token))
    }

    pub async fn giveaway(&self, giveaway_id: GiveawayId) -> EngineResult<Giveaway> {
        self.store(move |db| db.get_giveaway(giveaway_id))
            .await?
            .ok_or(EngineError::GiveawayNotFound(giveaway_id))
    }

    /// A fresh participation token, e.g. to re-publish an old announcement.
    pub async fn participation_token(&self, giveaway_id: GiveawayId) -> EngineResult<String> {
        let giveaway = self.giveaway(giveaway_id).await?;
        self.inner
            .codec
            .issue_participation(giveaway.id)
            .map_err(EngineError::Token)
    }

    /// Register the participant and run the mandatory-channel gate.
    ///
    /// Unlike the periodic re-check this is fail-closed: a channel that
    /// cannot be resolved or asked means the gate is not passed this time.
    pub async fn verify_gate(
        &self,
        participant_id: ParticipantId,
        handle: Option<&str>,
        locale: Option<&str>,
    ) -> EngineResult<bool> {
        let handle = handle.map(str::to_string);
        let locale = locale.map(str::to_string);
        let participant = self
            .store(move |db| db.upsert_participant(participant_id, handle.as_deref(), locale.as_deref()))
            .await?;
        if participant.is_banned {
            return Ok(false);
        }

        let Some(channels) = self.resolve_mandatory_channels(true).await else {
            return Ok(false);
        };
        let verdict = gate::mandatory_membership(&self.inner.platform, &channels, participant_id).await;
        if verdict != MembershipVerdict::Present {
            info!(participant = participant_id, ?verdict, "Mandatory channel gate not passed");
            return Ok(false);
        }

        self.store(move |db| db.mark_gate_verified(participant_id)).await?;
        info!(participant = participant_id, "Mandatory channel gate passed");
        Ok(true)
    }

    /// Resolve the configured mandatory channels to ids. With `strict`, any
    /// failure yields `None`; otherwise unresolvable channels are skipped.
    pub(crate) async fn resolve_mandatory_channels(&self, strict: bool) -> Option<Vec<ChannelId>> {
        let mut ids = Vec::with_capacity(self.inner.mandatory_channels.len());
        for channel in &self.inner.mandatory_channels {
            match self.inner.platform.resolve(channel).await {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!(?channel, "Could not resolve mandatory channel: {}", e);
                    if strict {
                        return None;
                    }
                }
            }
        }
        Some(ids)
    }

    pub(crate) fn mandatory_channel_count(&self) -> usize {
        self.inner.mandatory_channels.len()
    }

    pub async fn ban_participant(
        &self,
        actor_id: Option<ParticipantId>,
        participant_id: ParticipantId,
    ) -> EngineResult<()> {
        if !self.store(move |db| db.ban_participant(actor_id, participant_id)).await? {
            return Err(EngineError::ParticipantNotFound(participant_id));
        }
        info!(participant = participant_id, actor = ?actor_id, "Participant banned");
        Ok(())
    }

    pub async fn winners(&self, giveaway_id: GiveawayId) -> EngineResult<Vec<Winner>> {
        self.giveaway(giveaway_id).await?;
        self.store(move |db| db.winners(giveaway_id)).await
    }

    pub async fn participant_stats(&self, participant_id: ParticipantId) -> EngineResult<ParticipantStats> {
        self.store(move |db| {
            if db.get_participant(participant_id)?.is_none() {
                return Ok(None);
            }
            Ok(Some(ParticipantStats {
                participant_id,
                active_entries: db.open_entry_count(participant_id)?,
                top_channels: db.top_channels(TOP_CHANNELS)?,
            }))
        })
        .await?
        .ok_or(EngineError::ParticipantNotFound(participant_id))
    }

    /// Audit trail of one giveaway, oldest first.
    pub async fn giveaway_audit(&self, giveaway_id: GiveawayId) -> EngineResult<Vec<AuditRecord>> {
        self.giveaway(giveaway_id).await?;
        self.store(move |db| db.audit_for(AuditEntity::Giveaway, &giveaway_id.to_string()))
            .await
    }
}
