use tracing::{debug, info, warn};

use giveaway_crypto::PARTICIPATE;
use giveaway_db::models::{EntryInsert, Exclusion};
use giveaway_types::models::{EntryId, ParticipantId};
use giveaway_types::outcome::{Ineligibility, SubmitOutcome};

use crate::gate;
use crate::platform::PlatformClient;
use crate::{Engine, EngineResult};

impl<P: PlatformClient> Engine<P> {
    /// Handle one inbound "enter this giveaway" request.
    ///
    /// Every participant-facing result is an `Ok(SubmitOutcome)`. Only a store
    /// failure comes back as `Err`, and then nothing was recorded.
    pub async fn submit_entry(
        &self,
        token: &str,
        participant_id: ParticipantId,
        handle: Option<String>,
    ) -> EngineResult<SubmitOutcome> {
        let Some(intent) = self.inner.codec.verify(token) else {
            debug!(participant = participant_id, "Rejected entry token");
            return Ok(SubmitOutcome::InvalidToken);
        };
        if intent.action != PARTICIPATE {
            return Ok(SubmitOutcome::InvalidToken);
        }
        let giveaway_id = intent.giveaway_id;

        if !self.inner.debouncer.admit(participant_id, giveaway_id) {
            debug!(participant = participant_id, giveaway = giveaway_id, "Debounced entry");
            return Ok(SubmitOutcome::Throttled);
        }

        let (giveaway, participant) = self
            .store(move |db| Ok((db.get_giveaway(giveaway_id)?, db.get_participant(participant_id)?)))
            .await?;

        // A signed token for a giveaway that does not exist is treated like any bad token
        let Some(giveaway) = giveaway else {
            warn!(giveaway = giveaway_id, "Valid token for unknown giveaway");
            return Ok(SubmitOutcome::InvalidToken);
        };
        if giveaway.is_drawn {
            return Ok(SubmitOutcome::GiveawayClosed);
        }
        let Some(participant) = participant else {
            return Ok(SubmitOutcome::Ineligible(Ineligibility::NotRegistered));
        };

        if let Err(reason) = gate::may_enter(&self.inner.platform, &participant, &giveaway).await {
            info!(
                participant = participant_id,
                giveaway = giveaway_id,
                "Entry refused: {}",
                reason
            );
            return Ok(SubmitOutcome::Ineligible(reason));
        }

        let handle = handle.or(participant.handle);
        let recorded = self
            .store(move |db| db.record_entry(giveaway_id, participant_id, handle.as_deref()))
            .await?;

        Ok(match recorded {
            EntryInsert::Recorded { entry_id, seq_no } => {
                info!(
                    participant = participant_id,
                    giveaway = giveaway_id,
                    entry_id,
                    seq_no,
                    "Entry recorded"
                );
                SubmitOutcome::Accepted { entry_id, seq_no }
            }
            EntryInsert::AlreadyEntered => SubmitOutcome::AlreadyEntered,
            EntryInsert::Closed => SubmitOutcome::GiveawayClosed,
            EntryInsert::UnknownGiveaway => SubmitOutcome::InvalidToken,
        })
    }

    /// Exclude an entry from future draws. Winner rows are never touched.
    pub async fn exclude_entry(
        &self,
        actor_id: Option<ParticipantId>,
        entry_id: EntryId,
    ) -> EngineResult<Exclusion> {
        let result = self.store(move |db| db.exclude_entry(actor_id, entry_id)).await?;
        if result == Exclusion::Excluded {
            info!(entry_id, actor = ?actor_id, "Entry excluded");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use giveaway_crypto::{Intent, TokenCodec};
    use giveaway_db::Database;
    use giveaway_types::models::MembershipStatus;

    use super::*;
    use crate::EngineSettings;
    use crate::test_support::{CONDITION, eligible, engine, giveaway};
    use crate::testing::FakePlatform;

    #[tokio::test]
    async fn eligible_participant_is_accepted_once() {
        let (engine, fake) = engine();
        let (_, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;

        let first = engine.submit_entry(&token, 10, None).await.unwrap();
        assert_eq!(first, SubmitOutcome::Accepted { entry_id: 1, seq_no: 1 });
        let again = engine.submit_entry(&token, 10, None).await.unwrap();
        assert_eq!(again, SubmitOutcome::AlreadyEntered);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_duplicates_record_one_entry() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;

        let (a, b) = tokio::join!(
            engine.submit_entry(&token, 10, None),
            engine.submit_entry(&token, 10, None)
        );
        let mut tags = vec![a.unwrap().tag(), b.unwrap().tag()];
        tags.sort();
        assert_eq!(tags, vec!["accepted", "already_entered"]);
        assert_eq!(engine.db().all_entries(gid).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_tokens_are_rejected_before_any_lookup() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;
        let calls = fake.calls();

        let mut tampered = token.clone().into_bytes();
        tampered[0] = if tampered[0] == b'a' { b'b' } else { b'a' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert_eq!(engine.submit_entry(&tampered, 10, None).await.unwrap(), SubmitOutcome::InvalidToken);
        assert_eq!(engine.submit_entry("", 10, None).await.unwrap(), SubmitOutcome::InvalidToken);

        let stale = Intent::participate(gid, chrono::Utc::now().timestamp() - 8 * 24 * 3600);
        let stale = engine.codec().issue(&stale).unwrap();
        assert_eq!(engine.submit_entry(&stale, 10, None).await.unwrap(), SubmitOutcome::InvalidToken);

        let wrong_action = Intent {
            action: "admin".into(),
            ..Intent::participate(gid, chrono::Utc::now().timestamp())
        };
        let wrong_action = engine.codec().issue(&wrong_action).unwrap();
        assert_eq!(
            engine.submit_entry(&wrong_action, 10, None).await.unwrap(),
            SubmitOutcome::InvalidToken
        );

        let unknown = engine.codec().issue_participation(gid + 100).unwrap();
        assert_eq!(engine.submit_entry(&unknown, 10, None).await.unwrap(), SubmitOutcome::InvalidToken);

        assert_eq!(fake.calls(), calls);
        assert!(engine.db().all_entries(gid).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unregistered_and_unverified_participants_are_ineligible() {
        let (engine, fake) = engine();
        let (_, token) = giveaway(&engine, 1, None).await;

        assert_eq!(
            engine.submit_entry(&token, 77, None).await.unwrap(),
            SubmitOutcome::Ineligible(Ineligibility::NotRegistered)
        );

        // Registered, but not in the mandatory channel
        fake.set_member(CONDITION, 78, MembershipStatus::Member);
        assert!(!engine.verify_gate(78, None, None).await.unwrap());
        assert_eq!(
            engine.submit_entry(&token, 78, None).await.unwrap(),
            SubmitOutcome::Ineligible(Ineligibility::GateNotPassed)
        );
    }

    #[tokio::test]
    async fn condition_channel_outage_refuses_entry() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;
        fake.fail_channel(CONDITION);

        assert_eq!(
            engine.submit_entry(&token, 10, None).await.unwrap(),
            SubmitOutcome::Ineligible(Ineligibility::ConditionCheckUnavailable { channel_id: CONDITION })
        );
        assert!(engine.db().all_entries(gid).unwrap().is_empty());
    }

    #[tokio::test]
    async fn drawn_giveaway_is_closed() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;
        eligible(&engine, &fake, 11).await;
        engine.submit_entry(&token, 10, None).await.unwrap();
        engine.draw(Some(1), gid).await.unwrap();

        assert_eq!(engine.submit_entry(&token, 11, None).await.unwrap(), SubmitOutcome::GiveawayClosed);
    }

    #[tokio::test]
    async fn handle_falls_back_to_the_registered_one() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;
        engine.submit_entry(&token, 10, None).await.unwrap();
        let entries = engine.db().all_entries(gid).unwrap();
        assert_eq!(entries[0].handle.as_deref(), Some("user10"));
    }

    #[tokio::test]
    async fn rapid_repeats_are_throttled() {
        let fake = Arc::new(FakePlatform::default());
        let db = Arc::new(Database::open_in_memory().unwrap());
        let codec = TokenCodec::new(b"k", 60).unwrap();
        let settings = EngineSettings {
            debounce_window: Duration::from_secs(30),
            ..EngineSettings::default()
        };
        let engine = Engine::new(db, codec, fake, settings);
        let token = engine.codec().issue_participation(1).unwrap();

        // Unknown giveaway, but the first request still passes the debounce
        assert_eq!(engine.submit_entry(&token, 5, None).await.unwrap(), SubmitOutcome::InvalidToken);
        assert_eq!(engine.submit_entry(&token, 5, None).await.unwrap(), SubmitOutcome::Throttled);
        assert_eq!(engine.submit_entry(&token, 6, None).await.unwrap(), SubmitOutcome::InvalidToken);
    }

    #[tokio::test]
    async fn exclusion_is_idempotent() {
        let (engine, fake) = engine();
        let (_, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;
        let SubmitOutcome::Accepted { entry_id, .. } = engine.submit_entry(&token, 10, None).await.unwrap()
        else {
            panic!("entry not accepted");
        };
        assert_eq!(engine.exclude_entry(Some(1), entry_id).await.unwrap(), Exclusion::Excluded);
        assert_eq!(engine.exclude_entry(Some(1), entry_id).await.unwrap(), Exclusion::AlreadyExcluded);
        assert_eq!(engine.exclude_entry(Some(1), 999).await.unwrap(), Exclusion::NotFound);
    }
}
