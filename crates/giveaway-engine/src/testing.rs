use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use giveaway_types::models::{ChannelId, MembershipStatus, ParticipantId};

use crate::platform::{PlatformClient, PlatformError};

/// In-memory platform. Unknown memberships answer `Left`, unknown premium
/// answers `false`, and failing channels or a failing premium lookup answer
/// with a transport error.
#[derive(Default)]
pub struct FakePlatform {
    members: Mutex<HashMap<(ChannelId, ParticipantId), MembershipStatus>>,
    premium: Mutex<HashSet<ParticipantId>>,
    failing: Mutex<HashSet<ChannelId>>,
    premium_down: AtomicBool,
    usernames: Mutex<HashMap<String, ChannelId>>,
    calls: AtomicUsize,
}

impl FakePlatform {
    pub fn set_member(&self, channel_id: ChannelId, participant_id: ParticipantId, status: MembershipStatus) {
        self.members.lock().unwrap().insert((channel_id, participant_id), status);
    }

    pub fn set_premium(&self, participant_id: ParticipantId, premium: bool) {
        let mut set = self.premium.lock().unwrap();
        if premium {
            set.insert(participant_id);
        } else {
            set.remove(&participant_id);
        }
    }

    pub fn fail_premium(&self, down: bool) {
        self.premium_down.store(down, Ordering::SeqCst);
    }

    pub fn fail_channel(&self, channel_id: ChannelId) {
        self.failing.lock().unwrap().insert(channel_id);
    }

    pub fn heal_channel(&self, channel_id: ChannelId) {
        self.failing.lock().unwrap().remove(&channel_id);
    }

    pub fn register_username(&self, username: &str, channel_id: ChannelId) {
        self.usernames.lock().unwrap().insert(username.to_string(), channel_id);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PlatformClient for FakePlatform {
    async fn membership_status(
        &self,
        channel_id: ChannelId,
        participant_id: ParticipantId,
    ) -> Result<MembershipStatus, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&channel_id) {
            return Err(PlatformError::Transport("connection reset".into()));
        }
        let members = self.members.lock().unwrap();
        Ok(members
            .get(&(channel_id, participant_id))
            .copied()
            .unwrap_or(MembershipStatus::Left))
    }

    async fn premium_status(&self, participant_id: ParticipantId) -> Result<bool, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.premium_down.load(Ordering::SeqCst) {
            return Err(PlatformError::Transport("connection reset".into()));
        }
        Ok(self.premium.lock().unwrap().contains(&participant_id))
    }

    async fn resolve_channel(&self, username: &str) -> Result<ChannelId, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.usernames
            .lock()
            .unwrap()
            .get(username)
            .copied()
            .ok_or_else(|| PlatformError::UnknownChannel(username.to_string()))
    }
}
