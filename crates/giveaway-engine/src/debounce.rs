use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use giveaway_types::models::{GiveawayId, ParticipantId};

/// Stale keys are swept once the map grows past this many.
const SWEEP_AT: usize = 4096;

/// Suppresses repeat submissions of the same (participant, giveaway) pair
/// arriving within `window` of the last admitted one.
pub struct RequestDebouncer {
    window: Duration,
    last: Mutex<HashMap<(ParticipantId, GiveawayId), Instant>>,
}

impl RequestDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(HashMap::new()),
        }
    }

    pub fn admit(&self, participant_id: ParticipantId, giveaway_id: GiveawayId) -> bool {
        self.admit_at(participant_id, giveaway_id, Instant::now())
    }

    fn admit_at(&self, participant_id: ParticipantId, giveaway_id: GiveawayId, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }
        // A poisoned map only loses debounce state; the ledger still rejects duplicates.
        let Ok(mut last) = self.last.lock() else {
            return true;
        };

        let key = (participant_id, giveaway_id);
        if let Some(prev) = last.get(&key) {
            if now.saturating_duration_since(*prev) < self.window {
                return false;
            }
        }
        last.insert(key, now);

        if last.len() > SWEEP_AT {
            let window = self.window;
            last.retain(|_, t| now.saturating_duration_since(*t) < window);
        }
        true
    }
}
