use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row, TransactionBehavior};

use giveaway_types::models::{
    AuditAction, AuditEntity, Entry, EntryId, GiveawayId, ParticipantId,
};

use crate::models::{EntryInsert, Exclusion, timestamp_at, timestamp_text};
use crate::{Database, OptionalExt, audit, is_unique_violation};

const ENTRY_COLUMNS: &str =
    "id, giveaway_id, participant_id, handle, seq_no, excluded, created_at";

impl Database {
    /// Append an entry to the giveaway's ledger.
    ///
    /// The insert is attempted unconditionally and the (giveaway, participant)
    /// unique constraint decides duplicates; there is no existence pre-check.
    /// The sequence number counts every earlier entry, excluded ones included,
    /// so it reflects arrival order.
    pub fn record_entry(
        &self,
        giveaway_id: GiveawayId,
        participant_id: ParticipantId,
        handle: Option<&str>,
    ) -> Result<EntryInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let drawn: Option<bool> = tx
                .query_row("SELECT is_drawn FROM giveaways WHERE id = ?1", [giveaway_id], |r| {
                    r.get(0)
                })
                .optional()?;
            match drawn {
                None => return Ok(EntryInsert::UnknownGiveaway),
                Some(true) => return Ok(EntryInsert::Closed),
                Some(false) => {}
            }

            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM entries WHERE giveaway_id = ?1",
                [giveaway_id],
                |r| r.get(0),
            )?;
            let seq_no = existing + 1;

            let inserted = tx.execute(
                "INSERT INTO entries (giveaway_id, participant_id, handle, seq_no, excluded, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![
                    giveaway_id,
                    participant_id,
                    handle,
                    seq_no,
                    timestamp_text(Utc::now()),
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback()?;
                    return Ok(EntryInsert::AlreadyEntered);
                }
                Err(e) => return Err(e.into()),
            }
            let entry_id = tx.last_insert_rowid();

            audit::append(
                &tx,
                Some(participant_id),
                AuditAction::EntryCreate,
                AuditEntity::Giveaway,
                Some(&giveaway_id.to_string()),
                Some(&format!("seq={seq_no}")),
            )?;
            tx.commit()?;

            Ok(EntryInsert::Recorded { entry_id, seq_no })
        })
    }

    /// One-way exclusion. Excluding twice is a successful no-op.
    pub fn exclude_entry(&self, actor_id: Option<ParticipantId>, entry_id: EntryId) -> Result<Exclusion> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let excluded: Option<bool> = tx
                .query_row("SELECT excluded FROM entries WHERE id = ?1", [entry_id], |r| r.get(0))
                .optional()?;
            match excluded {
                None => Ok(Exclusion::NotFound),
                Some(true) => Ok(Exclusion::AlreadyExcluded),
                Some(false) => {
                    tx.execute("UPDATE entries SET excluded = 1 WHERE id = ?1", [entry_id])?;
                    audit::append(
                        &tx,
                        actor_id,
                        AuditAction::Exclude,
                        AuditEntity::Entry,
                        Some(&entry_id.to_string()),
                        None,
                    )?;
                    tx.commit()?;
                    Ok(Exclusion::Excluded)
                }
            }
        })
    }

    pub fn get_entry(&self, entry_id: EntryId) -> Result<Option<Entry>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
                [entry_id],
                entry_from_row,
            )
            .optional()
        })
    }

    /// Non-excluded entries in ascending sequence order: the draw's candidate pool.
    pub fn active_entries(&self, giveaway_id: GiveawayId) -> Result<Vec<Entry>> {
        self.with_conn(|conn| query_entries(conn, giveaway_id, true))
    }

    /// Every entry of the giveaway, excluded ones included.
    pub fn all_entries(&self, giveaway_id: GiveawayId) -> Result<Vec<Entry>> {
        self.with_conn(|conn| query_entries(conn, giveaway_id, false))
    }

    /// Count of non-excluded entries, compared against the auto-draw threshold.
    pub fn count_active_entries(&self, giveaway_id: GiveawayId) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE giveaway_id = ?1 AND excluded = 0",
                [giveaway_id],
                |r| r.get(0),
            )?;
            Ok(u64::try_from(count)?)
        })
    }
}

pub(crate) fn query_entries(conn: &Connection, giveaway_id: GiveawayId, active_only: bool) -> Result<Vec<Entry>> {
    let filter = if active_only { "AND excluded = 0" } else { "" };
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries
         WHERE giveaway_id = ?1 {filter}
         ORDER BY seq_no ASC, id ASC"
    ))?;
    let rows = stmt
        .query_map([giveaway_id], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        giveaway_id: row.get(1)?,
        participant_id: row.get(2)?,
        handle: row.get(3)?,
        seq_no: row.get(4)?,
        excluded: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
    })
}
