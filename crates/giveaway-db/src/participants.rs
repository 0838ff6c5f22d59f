use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row, TransactionBehavior};

use giveaway_types::models::{AuditAction, AuditEntity, Participant, ParticipantId};

use crate::models::{timestamp_at, timestamp_text};
use crate::{Database, OptionalExt, audit};

const PARTICIPANT_COLUMNS: &str =
    "id, handle, locale, gate_verified, suspended, is_banned, created_at";

impl Database {
    /// Create the participant on first contact, refresh handle/locale afterwards.
    pub fn upsert_participant(
        &self,
        id: ParticipantId,
        handle: Option<&str>,
        locale: Option<&str>,
    ) -> Result<Participant> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO participants (id, handle, locale, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    handle = excluded.handle,
                    locale = excluded.locale
                 WHERE participants.handle IS NOT excluded.handle
                    OR participants.locale IS NOT excluded.locale",
                rusqlite::params![id, handle, locale, timestamp_text(Utc::now())],
            )?;
            let participant = query_participant(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Participant {} vanished after upsert", id))?;
            tx.commit()?;
            Ok(participant)
        })
    }

    pub fn get_participant(&self, id: ParticipantId) -> Result<Option<Participant>> {
        self.with_conn(|conn| query_participant(conn, id))
    }

    /// Gate-verified, non-banned participants: the population of the periodic re-check.
    pub fn verified_participants(&self) -> Result<Vec<Participant>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PARTICIPANT_COLUMNS} FROM participants
                 WHERE gate_verified = 1 AND is_banned = 0
                 ORDER BY id ASC"
            ))?;
            let rows = stmt
                .query_map([], participant_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Record a passed mandatory-membership gate. Clears any suspension.
    /// Returns false if the participant does not exist.
    pub fn mark_gate_verified(&self, id: ParticipantId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let updated = tx.execute(
                "UPDATE participants SET gate_verified = 1, suspended = 0 WHERE id = ?1",
                [id],
            )?;
            if updated == 0 {
                return Ok(false);
            }
            audit::append(
                &tx,
                Some(id),
                AuditAction::GateVerified,
                AuditEntity::User,
                Some(&id.to_string()),
                None,
            )?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Set the suspension flag. Only a real transition is written and audited;
    /// returns whether the flag changed.
    pub fn set_suspended(&self, id: ParticipantId, suspended: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let updated = tx.execute(
                "UPDATE participants SET suspended = ?2 WHERE id = ?1 AND suspended != ?2",
                rusqlite::params![id, suspended],
            )?;
            if updated == 0 {
                return Ok(false);
            }
            let action = if suspended {
                AuditAction::Suspend
            } else {
                AuditAction::Unsuspend
            };
            audit::append(&tx, None, action, AuditEntity::User, Some(&id.to_string()), None)?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Administrative ban. Returns false if the participant does not exist.
    pub fn ban_participant(&self, actor_id: Option<ParticipantId>, id: ParticipantId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let updated = tx.execute("UPDATE participants SET is_banned = 1 WHERE id = ?1", [id])?;
            if updated == 0 {
                return Ok(false);
            }
            audit::append(
                &tx,
                actor_id,
                AuditAction::BanUser,
                AuditEntity::User,
                Some(&id.to_string()),
                None,
            )?;
            tx.commit()?;
            Ok(true)
        })
    }
}

fn query_participant(conn: &Connection, id: ParticipantId) -> Result<Option<Participant>> {
    conn.query_row(
        &format!("SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = ?1"),
        [id],
        participant_from_row,
    )
    .optional()
}

fn participant_from_row(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        handle: row.get(1)?,
        locale: row.get(2)?,
        gate_verified: row.get(3)?,
        suspended: row.get(4)?,
        is_banned: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
    })
}
