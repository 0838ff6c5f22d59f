use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use giveaway_types::outcome::DrawOutcome;

use crate::gate::{self, MembershipVerdict};
use crate::platform::PlatformClient;
use crate::{Engine, EngineResult};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecheckSummary {
    pub checked: usize,
    pub suspended: usize,
    pub reinstated: usize,
    /// Participants left as they were because a channel could not be asked.
    pub undecided: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AutoDrawSummary {
    pub examined: usize,
    pub drawn: usize,
    pub failed: usize,
}

impl<P: PlatformClient> Engine<P> {
    /// One pass of the mandatory-channel re-check over every verified,
    /// non-banned participant.
    ///
    /// Only an explicit "not a member" suspends. Lifting a suspension needs
    /// a positive answer from every configured channel.
    pub async fn recheck_memberships(&self) -> EngineResult<RecheckSummary> {
        let mut summary = RecheckSummary::default();
        if self.mandatory_channel_count() == 0 {
            return Ok(summary);
        }

        let participants = self.store(|db| db.verified_participants()).await?;
        if participants.is_empty() {
            return Ok(summary);
        }

        let channels = self.resolve_mandatory_channels(false).await.unwrap_or_default();
        if channels.is_empty() {
            warn!("No mandatory channel could be resolved, skipping membership re-check");
            return Ok(summary);
        }
        let complete = channels.len() == self.mandatory_channel_count();

        for participant in participants {
            summary.checked += 1;
            let verdict = gate::mandatory_membership(&self.inner.platform, &channels, participant.id).await;
            let suspend = match verdict {
                MembershipVerdict::Absent => true,
                MembershipVerdict::Present if complete => false,
                MembershipVerdict::Present | MembershipVerdict::Unknown => {
                    summary.undecided += 1;
                    continue;
                }
            };

            let id = participant.id;
            match self.store(move |db| db.set_suspended(id, suspend)).await {
                Ok(true) if suspend => {
                    info!(participant = id, "Suspended: left a mandatory channel");
                    summary.suspended += 1;
                }
                Ok(true) => {
                    info!(participant = id, "Suspension lifted");
                    summary.reinstated += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(participant = id, "Could not update suspension: {}", e);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// One pass of the auto-draw scan. A failure on one giveaway is logged
    /// and the scan moves on; the next pass retries it.
    pub async fn scan_auto_draws(&self) -> EngineResult<AutoDrawSummary> {
        let mut summary = AutoDrawSummary::default();
        let giveaways = self.store(|db| db.auto_draw_giveaways()).await?;

        for giveaway in giveaways {
            summary.examined += 1;
            let id = giveaway.id;
            let active = match self.store(move |db| db.count_active_entries(id)).await {
                Ok(n) => n,
                Err(e) => {
                    warn!(giveaway = id, "Could not count entries: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };
            if !giveaway.auto_draw_due(active) {
                debug!(giveaway = id, active, threshold = ?giveaway.auto_draw_threshold, "Below threshold");
                continue;
            }

            match self.draw(None, id).await {
                Ok(report) if report.outcome != DrawOutcome::AlreadyDrawn => {
                    info!(giveaway = id, active, winners = report.winners.len(), "Auto-draw completed");
                    summary.drawn += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(giveaway = id, "Auto-draw failed: {}", e);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }
}

fn ticker(every: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + every, every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Background task re-checking mandatory-channel membership.
pub async fn run_membership_recheck_loop<P: PlatformClient>(engine: Engine<P>, every: Duration) {
    let mut interval = ticker(every);
    loop {
        interval.tick().await;
        match engine.recheck_memberships().await {
            Ok(s) if s.suspended + s.reinstated + s.failed > 0 => {
                info!(
                    "Membership re-check: {} checked, {} suspended, {} reinstated, {} failed",
                    s.checked, s.suspended, s.reinstated, s.failed
                );
            }
            Ok(s) => debug!("Membership re-check: {} checked, no changes", s.checked),
            Err(e) => warn!("Membership re-check error: {}", e),
        }
    }
}

/// Background task drawing giveaways whose entry threshold was reached.
pub async fn run_auto_draw_loop<P: PlatformClient>(engine: Engine<P>, every: Duration) {
    let mut interval = ticker(every);
    loop {
        interval.tick().await;
        match engine.scan_auto_draws().await {
            Ok(s) if s.drawn + s.failed > 0 => {
                info!("Auto-draw scan: {} drawn, {} failed", s.drawn, s.failed);
            }
            Ok(_) => {}
            Err(e) => warn!("Auto-draw scan error: {}", e),
        }
    }
}
