use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, info};

use giveaway_db::models::{DrawCommit, SelectedWinner};
use giveaway_types::models::{Entry, Giveaway, GiveawayId, ParticipantId};
use giveaway_types::outcome::{DrawOutcome, DrawReport};

use crate::gate;
use crate::platform::PlatformClient;
use crate::{Engine, EngineError, EngineResult};

/// Uniformly sample `min(winners_count, candidates.len())` distinct
/// candidates without replacement. The result is ordered by sequence number.
pub fn select_winners<R: Rng + ?Sized>(
    candidates: &[Entry],
    winners_count: u32,
    rng: &mut R,
) -> Vec<SelectedWinner> {
    let amount = (winners_count as usize).min(candidates.len());
    let mut picked: Vec<&Entry> = rand::seq::index::sample(rng, candidates.len(), amount)
        .into_iter()
        .map(|i| &candidates[i])
        .collect();
    picked.sort_by_key(|e| e.seq_no);
    picked
        .into_iter()
        .map(|e| SelectedWinner {
            participant_id: e.participant_id,
            handle: e.handle.clone(),
        })
        .collect()
}

fn sample_from_thread_rng(candidates: &[Entry], winners_count: u32) -> Vec<SelectedWinner> {
    select_winners(candidates, winners_count, &mut rand::rng())
}

impl<P: PlatformClient> Engine<P> {
    /// Draw the giveaway. Safe to call any number of times, concurrently or
    /// not: exactly one call commits, and every call reports that winner set.
    /// `actor` is the operator who asked for the draw; scheduled draws pass `None`.
    ///
    /// Anti-fraud re-checks run against the entries present when the draw
    /// starts. Winners are then picked from the pool as it stands when the
    /// giveaway is closed, so an entry accepted while the re-checks ran still
    /// takes part.
    pub async fn draw(
        &self,
        actor: Option<ParticipantId>,
        giveaway_id: GiveawayId,
    ) -> EngineResult<DrawReport> {
        let giveaway = self
            .store(move |db| db.get_giveaway(giveaway_id))
            .await?
            .ok_or(EngineError::GiveawayNotFound(giveaway_id))?;
        if giveaway.is_drawn {
            return self.prior_draw(giveaway).await;
        }

        let mut dropped = HashSet::new();
        if giveaway.anti_fraud_recheck_on_draw {
            let entries = self.store(move |db| db.active_entries(giveaway_id)).await?;
            for entry in entries {
                if !gate::recheck_at_draw(&self.inner.platform, &entry, &giveaway).await {
                    debug!(giveaway = giveaway_id, participant = entry.participant_id, "Dropped at draw");
                    dropped.insert(entry.participant_id);
                }
            }
        }

        let winners_count = giveaway.winners_count;
        let dropped_count = dropped.len();
        let commit = self
            .store(move |db| {
                db.commit_draw(giveaway_id, actor, |pool| {
                    let candidates: Vec<Entry> = pool
                        .iter()
                        .filter(|e| !dropped.contains(&e.participant_id))
                        .cloned()
                        .collect();
                    sample_from_thread_rng(&candidates, winners_count)
                })
            })
            .await?;

        match commit {
            DrawCommit::Committed { drawn_at, winners } => {
                let outcome = if winners.is_empty() {
                    DrawOutcome::NoEligibleCandidates
                } else {
                    DrawOutcome::Completed
                };
                info!(
                    giveaway = giveaway_id,
                    dropped = dropped_count,
                    winners = winners.len(),
                    ?outcome,
                    "Giveaway drawn"
                );
                Ok(DrawReport {
                    giveaway_id,
                    outcome,
                    winners,
                    drawn_at: Some(drawn_at),
                })
            }
            DrawCommit::AlreadyDrawn => {
                debug!(giveaway = giveaway_id, "Lost the draw race, reporting stored winners");
                let giveaway = self
                    .store(move |db| db.get_giveaway(giveaway_id))
                    .await?
                    .ok_or(EngineError::GiveawayNotFound(giveaway_id))?;
                self.prior_draw(giveaway).await
            }
        }
    }

    async fn prior_draw(&self, giveaway: Giveaway) -> EngineResult<DrawReport> {
        let giveaway_id = giveaway.id;
        let winners = self.store(move |db| db.winners(giveaway_id)).await?;
        Ok(DrawReport {
            giveaway_id,
            outcome: DrawOutcome::AlreadyDrawn,
            winners,
            drawn_at: giveaway.drawn_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use giveaway_types::models::{AuditAction, MembershipStatus};
    use giveaway_types::outcome::SubmitOutcome;

    use super::*;
    use crate::test_support::{CONDITION, eligible, engine, giveaway};

    fn candidates(n: i64) -> Vec<Entry> {
        (1..=n)
            .map(|i| Entry {
                id: i,
                giveaway_id: 1,
                participant_id: 100 + i,
                handle: None,
                seq_no: i,
                excluded: false,
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn selection_is_capped_by_the_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select_winners(&candidates(3), 5, &mut rng).len(), 3);
        assert_eq!(select_winners(&candidates(10), 4, &mut rng).len(), 4);
        assert!(select_winners(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn selection_has_no_repeats() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut ids: Vec<_> = select_winners(&candidates(20), 20, &mut rng)
            .into_iter()
            .map(|w| w.participant_id)
            .collect();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn selection_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = candidates(3);
        let mut hits = [0u32; 3];
        for _ in 0..3000 {
            let w = &select_winners(&pool, 1, &mut rng)[0];
            hits[(w.participant_id - 101) as usize] += 1;
        }
        for h in hits {
            assert!((850..=1150).contains(&h), "skewed selection: {hits:?}");
        }
    }

    #[tokio::test]
    async fn draw_is_idempotent() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 2, None).await;
        for id in 10..15 {
            eligible(&engine, &fake, id).await;
            engine.submit_entry(&token, id, None).await.unwrap();
        }

        let first = engine.draw(Some(1), gid).await.unwrap();
        assert_eq!(first.outcome, DrawOutcome::Completed);
        assert_eq!(first.winners.len(), 2);

        let second = engine.draw(Some(1), gid).await.unwrap();
        assert_eq!(second.outcome, DrawOutcome::AlreadyDrawn);
        assert_eq!(second.winners, first.winners);
        assert_eq!(second.drawn_at.map(|t| t.timestamp_millis()), first.drawn_at.map(|t| t.timestamp_millis()));
        assert_eq!(engine.db().audit_by_action(AuditAction::Draw).unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_draws_share_one_winner_set() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 3, None).await;
        for id in 10..30 {
            eligible(&engine, &fake, id).await;
            engine.submit_entry(&token, id, None).await.unwrap();
        }

        let (a, b) = tokio::join!(engine.draw(Some(1), gid), engine.draw(Some(1), gid));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.winners, b.winners);
        assert_eq!(a.winners.len(), 3);
        let completed = [a.outcome, b.outcome]
            .iter()
            .filter(|o| **o == DrawOutcome::Completed)
            .count();
        assert_eq!(completed, 1);
        assert_eq!(engine.db().winners(gid).unwrap().len(), 3);
        assert_eq!(engine.db().audit_by_action(AuditAction::Draw).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn more_winners_than_candidates_takes_everyone() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 5, None).await;
        for id in 10..13 {
            eligible(&engine, &fake, id).await;
            engine.submit_entry(&token, id, None).await.unwrap();
        }
        let report = engine.draw(Some(1), gid).await.unwrap();
        let mut ids: Vec<_> = report.winners.iter().map(|w| w.participant_id).collect();
        ids.sort();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn empty_pool_still_finalizes() {
        let (engine, _) = engine();
        let (gid, _) = giveaway(&engine, 1, None).await;
        let report = engine.draw(Some(1), gid).await.unwrap();
        assert_eq!(report.outcome, DrawOutcome::NoEligibleCandidates);
        assert!(report.winners.is_empty());
        assert!(engine.db().get_giveaway(gid).unwrap().unwrap().is_drawn);
        assert_eq!(engine.draw(Some(1), gid).await.unwrap().outcome, DrawOutcome::AlreadyDrawn);
    }

    #[tokio::test]
    async fn recheck_drops_leavers_and_excluded_entries() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 10, None).await;
        let mut entry_ids = Vec::new();
        for id in 10..13 {
            eligible(&engine, &fake, id).await;
            if let SubmitOutcome::Accepted { entry_id, .. } = engine.submit_entry(&token, id, None).await.unwrap() {
                entry_ids.push(entry_id);
            }
        }
        engine.exclude_entry(Some(1), entry_ids[0]).await.unwrap();
        fake.set_member(CONDITION, 11, MembershipStatus::Kicked);

        let report = engine.draw(Some(1), gid).await.unwrap();
        let ids: Vec<_> = report.winners.iter().map(|w| w.participant_id).collect();
        assert_eq!(ids, vec![12]);
    }

    #[tokio::test]
    async fn exclusion_after_the_draw_keeps_winners() {
        let (engine, fake) = engine();
        let (gid, token) = giveaway(&engine, 1, None).await;
        eligible(&engine, &fake, 10).await;
        let SubmitOutcome::Accepted { entry_id, .. } = engine.submit_entry(&token, 10, None).await.unwrap()
        else {
            panic!("entry not accepted");
        };
        let report = engine.draw(Some(1), gid).await.unwrap();
        assert_eq!(report.winners[0].participant_id, 10);

        engine.exclude_entry(Some(1), entry_id).await.unwrap();
        assert_eq!(engine.winners(gid).await.unwrap(), report.winners);
    }

    #[tokio::test]
    async fn draw_audit_names_the_operator() {
        let (engine, _) = engine();
        let (gid, _) = giveaway(&engine, 1, None).await;
        engine.draw(Some(42), gid).await.unwrap();
        let trail = engine.db().audit_by_action(AuditAction::Draw).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].actor_id, Some(42));
    }

    #[tokio::test]
    async fn unknown_giveaway_is_an_error() {
        let (engine, _) = engine();
        assert!(matches!(engine.draw(Some(1), 404).await, Err(EngineError::GiveawayNotFound(404))));
    }
}
