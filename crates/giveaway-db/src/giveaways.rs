use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row, TransactionBehavior};

use giveaway_types::api::ChannelEntryCount;
use giveaway_types::models::{
    AuditAction, AuditEntity, Giveaway, GiveawayId, NewGiveaway, ParticipantId,
};

use crate::models::{optional_timestamp_at, timestamp_at, timestamp_text};
use crate::{Database, OptionalExt, audit};

pub(crate) const GIVEAWAY_COLUMNS: &str = "id, creator_id, target_channel_id, template, \
     cond_channel_1, cond_channel_2, premium_only, paid_comment_condition, winners_count, \
     anti_fraud_recheck_on_draw, auto_draw_enabled, auto_draw_threshold, is_drawn, \
     created_at, drawn_at";

impl Database {
    /// Persist a finished giveaway definition. The caller validates it first.
    pub fn insert_giveaway(&self, creator_id: ParticipantId, new: &NewGiveaway) -> Result<Giveaway> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO giveaways (
                    creator_id, target_channel_id, template, cond_channel_1, cond_channel_2,
                    premium_only, paid_comment_condition, winners_count,
                    anti_fraud_recheck_on_draw, auto_draw_enabled, auto_draw_threshold, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    creator_id,
                    new.target_channel_id,
                    new.template,
                    new.condition_channels.first(),
                    new.condition_channels.get(1),
                    new.premium_only,
                    new.paid_comment_condition,
                    new.winners_count,
                    new.anti_fraud_recheck_on_draw,
                    new.auto_draw_enabled,
                    new.auto_draw_threshold,
                    timestamp_text(Utc::now()),
                ],
            )?;
            let id = tx.last_insert_rowid();
            audit::append(
                &tx,
                Some(creator_id),
                AuditAction::Create,
                AuditEntity::Giveaway,
                Some(&id.to_string()),
                Some(&format!("target={}", new.target_channel_id)),
            )?;
            let giveaway = query_giveaway(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Giveaway {} vanished after insert", id))?;
            tx.commit()?;
            Ok(giveaway)
        })
    }

    pub fn get_giveaway(&self, id: GiveawayId) -> Result<Option<Giveaway>> {
        self.with_conn(|conn| query_giveaway(conn, id))
    }

    /// Undrawn giveaways with auto-draw on and a threshold configured.
    pub fn auto_draw_giveaways(&self) -> Result<Vec<Giveaway>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GIVEAWAY_COLUMNS} FROM giveaways
                 WHERE auto_draw_enabled = 1
                   AND is_drawn = 0
                   AND auto_draw_threshold IS NOT NULL
                 ORDER BY id ASC"
            ))?;
            let rows = stmt
                .query_map([], giveaway_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Number of giveaways not yet drawn that the participant has entered.
    pub fn open_entry_count(&self, participant_id: ParticipantId) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(e.id)
                 FROM entries e
                 JOIN giveaways g ON g.id = e.giveaway_id
                 WHERE e.participant_id = ?1 AND g.is_drawn = 0",
                [participant_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// Target channels ranked by how many entries their giveaways collected.
    pub fn top_channels(&self, limit: u32) -> Result<Vec<ChannelEntryCount>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.target_channel_id, COUNT(e.id) AS cnt
                 FROM giveaways g
                 JOIN entries e ON e.giveaway_id = g.id
                 GROUP BY g.target_channel_id
                 ORDER BY cnt DESC, g.target_channel_id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(ChannelEntryCount {
                        channel_id: row.get(0)?,
                        entries: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_giveaway(conn: &Connection, id: GiveawayId) -> Result<Option<Giveaway>> {
    conn.query_row(
        &format!("SELECT {GIVEAWAY_COLUMNS} FROM giveaways WHERE id = ?1"),
        [id],
        giveaway_from_row,
    )
    .optional()
}

fn giveaway_from_row(row: &Row<'_>) -> rusqlite::Result<Giveaway> {
    let condition_channels = [row.get::<_, Option<i64>>(4)?, row.get::<_, Option<i64>>(5)?]
        .into_iter()
        .flatten()
        .collect();

    Ok(Giveaway {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        target_channel_id: row.get(2)?,
        template: row.get(3)?,
        condition_channels,
        premium_only: row.get(6)?,
        paid_comment_condition: row.get(7)?,
        winners_count: row.get(8)?,
        anti_fraud_recheck_on_draw: row.get(9)?,
        auto_draw_enabled: row.get(10)?,
        auto_draw_threshold: row.get(11)?,
        is_drawn: row.get(12)?,
        created_at: timestamp_at(row, 13)?,
        drawn_at: optional_timestamp_at(row, 14)?,
    })
}
