use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ParticipantId = i64;
pub type GiveawayId = i64;
pub type EntryId = i64;
pub type ChannelId = i64;

/// Upper bound on winners per giveaway.
pub const MAX_WINNERS: u32 = 100;

/// Upper bound on an auto-draw entry threshold.
pub const MAX_AUTO_DRAW_THRESHOLD: u32 = 1_000_000;

/// A giveaway can require membership in at most this many condition channels.
pub const MAX_CONDITION_CHANNELS: usize = 2;

// -- Participants --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub handle: Option<String>,
    pub locale: Option<String>,
    pub gate_verified: bool,
    pub suspended: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

// -- Giveaways --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Giveaway {
    pub id: GiveawayId,
    pub creator_id: ParticipantId,
    pub target_channel_id: ChannelId,
    pub template: String,
    pub condition_channels: Vec<ChannelId>,
    pub premium_only: bool,
    pub paid_comment_condition: bool,
    pub winners_count: u32,
    pub anti_fraud_recheck_on_draw: bool,
    pub auto_draw_enabled: bool,
    pub auto_draw_threshold: Option<u32>,
    pub is_drawn: bool,
    pub created_at: DateTime<Utc>,
    pub drawn_at: Option<DateTime<Utc>>,
}

impl Giveaway {
    /// Whether the auto-draw scan should draw this giveaway given its
    /// current count of non-excluded entries.
    pub fn auto_draw_due(&self, active_entries: u64) -> bool {
        if self.is_drawn || !self.auto_draw_enabled {
            return false;
        }
        match self.auto_draw_threshold {
            Some(threshold) => active_entries >= u64::from(threshold),
            None => false,
        }
    }
}

/// A finished giveaway definition handed over by the creation flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewGiveaway {
    pub target_channel_id: ChannelId,
    pub template: String,
    #[serde(default)]
    pub condition_channels: Vec<ChannelId>,
    #[serde(default)]
    pub premium_only: bool,
    #[serde(default)]
    pub paid_comment_condition: bool,
    #[serde(default = "default_winners")]
    pub winners_count: u32,
    #[serde(default = "default_anti_fraud")]
    pub anti_fraud_recheck_on_draw: bool,
    #[serde(default)]
    pub auto_draw_enabled: bool,
    #[serde(default)]
    pub auto_draw_threshold: Option<u32>,
}

fn default_winners() -> u32 {
    1
}

fn default_anti_fraud() -> bool {
    true
}

impl NewGiveaway {
    pub fn validate(&self) -> Result<(), String> {
        if self.template.trim().is_empty() {
            return Err("template must not be empty".into());
        }
        if self.winners_count == 0 || self.winners_count > MAX_WINNERS {
            return Err(format!("winners_count must be within 1..={MAX_WINNERS}"));
        }
        if self.condition_channels.len() > MAX_CONDITION_CHANNELS {
            return Err(format!(
                "at most {MAX_CONDITION_CHANNELS} condition channels are supported"
            ));
        }
        if self.auto_draw_enabled {
            match self.auto_draw_threshold {
                Some(t) if (1..=MAX_AUTO_DRAW_THRESHOLD).contains(&t) => {}
                _ => {
                    return Err(format!(
                        "auto_draw_threshold must be within 1..={MAX_AUTO_DRAW_THRESHOLD}"
                    ));
                }
            }
        }
        Ok(())
    }
}

// -- Ledger --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub giveaway_id: GiveawayId,
    pub participant_id: ParticipantId,
    pub handle: Option<String>,
    /// Arrival order within the giveaway, starting at 1.
    pub seq_no: i64,
    pub excluded: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winner {
    pub id: i64,
    pub giveaway_id: GiveawayId,
    pub participant_id: ParticipantId,
    pub handle: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Audit --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    EntryCreate,
    Exclude,
    Draw,
    GateVerified,
    Suspend,
    Unsuspend,
    BanUser,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::EntryCreate => "entry_create",
            AuditAction::Exclude => "exclude",
            AuditAction::Draw => "draw",
            AuditAction::GateVerified => "gate_verified",
            AuditAction::Suspend => "suspend",
            AuditAction::Unsuspend => "unsuspend",
            AuditAction::BanUser => "ban_user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEntity {
    Giveaway,
    Entry,
    User,
}

impl AuditEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEntity::Giveaway => "giveaway",
            AuditEntity::Entry => "entry",
            AuditEntity::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    /// `None` for actions the engine takes on its own schedule.
    pub actor_id: Option<ParticipantId>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Platform --

/// Membership status as reported by the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MembershipStatus {
    /// Restricted members still count; only `left` and `kicked` are absent.
    pub fn is_present(self) -> bool {
        !matches!(self, MembershipStatus::Left | MembershipStatus::Kicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn giveaway(threshold: Option<u32>) -> Giveaway {
        Giveaway {
            id: 1,
            creator_id: 7,
            target_channel_id: -100,
            template: "Win a mug".into(),
            condition_channels: vec![],
            premium_only: false,
            paid_comment_condition: false,
            winners_count: 1,
            anti_fraud_recheck_on_draw: true,
            auto_draw_enabled: true,
            auto_draw_threshold: threshold,
            is_drawn: false,
            created_at: Utc::now(),
            drawn_at: None,
        }
    }

    fn new_giveaway() -> NewGiveaway {
        NewGiveaway {
            target_channel_id: -100,
            template: "Win a mug".into(),
            condition_channels: vec![],
            premium_only: false,
            paid_comment_condition: false,
            winners_count: 3,
            anti_fraud_recheck_on_draw: true,
            auto_draw_enabled: false,
            auto_draw_threshold: None,
        }
    }

    #[test]
    fn auto_draw_due_at_threshold() {
        let g = giveaway(Some(10));
        assert!(!g.auto_draw_due(9));
        assert!(g.auto_draw_due(10));
        assert!(g.auto_draw_due(11));
    }

    #[test]
    fn auto_draw_never_due_without_threshold_or_after_draw() {
        assert!(!giveaway(None).auto_draw_due(1_000));

        let mut drawn = giveaway(Some(1));
        drawn.is_drawn = true;
        assert!(!drawn.auto_draw_due(5));

        let mut manual = giveaway(Some(1));
        manual.auto_draw_enabled = false;
        assert!(!manual.auto_draw_due(5));
    }

    #[test]
    fn validate_winners_bounds() {
        let mut g = new_giveaway();
        assert!(g.validate().is_ok());
        g.winners_count = 0;
        assert!(g.validate().is_err());
        g.winners_count = MAX_WINNERS + 1;
        assert!(g.validate().is_err());
        g.winners_count = MAX_WINNERS;
        assert!(g.validate().is_ok());
    }

    #[test]
    fn validate_rejects_third_condition_channel() {
        let mut g = new_giveaway();
        g.condition_channels = vec![-1, -2, -3];
        assert!(g.validate().is_err());
    }

    #[test]
    fn validate_requires_threshold_for_auto_draw() {
        let mut g = new_giveaway();
        g.auto_draw_enabled = true;
        assert!(g.validate().is_err());
        g.auto_draw_threshold = Some(0);
        assert!(g.validate().is_err());
        g.auto_draw_threshold = Some(10);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn left_and_kicked_are_absent() {
        assert!(MembershipStatus::Member.is_present());
        assert!(MembershipStatus::Restricted.is_present());
        assert!(MembershipStatus::Creator.is_present());
        assert!(!MembershipStatus::Left.is_present());
        assert!(!MembershipStatus::Kicked.is_present());
    }
}
