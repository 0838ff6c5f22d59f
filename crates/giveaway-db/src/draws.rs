use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row, TransactionBehavior};

use giveaway_types::models::{AuditAction, AuditEntity, Entry, GiveawayId, ParticipantId, Winner};

use crate::ledger::query_entries;
use crate::models::{DrawCommit, SelectedWinner, timestamp_at, timestamp_text};
use crate::{Database, audit};

/// Audit detail for a draw that found nobody eligible.
pub const NO_ELIGIBLE_CANDIDATES: &str = "No eligible candidates";

impl Database {
    /// Finalize a draw in one transaction: claim `is_drawn`, pick winners from
    /// the active entries, insert the winner rows, and append the audit record.
    /// The claim is a conditional update on `is_drawn = 0`; if another run
    /// already claimed it nothing is written.
    ///
    /// `select` sees the pool as of the claim, so every entry that committed
    /// before the giveaway closed is offered to it. Returning no winners is a
    /// valid, terminal draw.
    pub fn commit_draw<F>(
        &self,
        giveaway_id: GiveawayId,
        actor_id: Option<ParticipantId>,
        select: F,
    ) -> Result<DrawCommit>
    where
        F: FnOnce(&[Entry]) -> Vec<SelectedWinner>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let drawn_at = Utc::now();
            let drawn_at_text = timestamp_text(drawn_at);

            let claimed = tx.execute(
                "UPDATE giveaways SET is_drawn = 1, drawn_at = ?2 WHERE id = ?1 AND is_drawn = 0",
                rusqlite::params![giveaway_id, drawn_at_text],
            )?;
            if claimed == 0 {
                return Ok(DrawCommit::AlreadyDrawn);
            }

            let pool = query_entries(&tx, giveaway_id, true)?;
            let winners = select(&pool);
            {
                let mut insert = tx.prepare(
                    "INSERT OR IGNORE INTO winners (giveaway_id, participant_id, handle, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for w in &winners {
                    insert.execute(rusqlite::params![
                        giveaway_id,
                        w.participant_id,
                        w.handle,
                        drawn_at_text
                    ])?;
                }
            }

            let persisted = query_winners(&tx, giveaway_id)?;
            let detail = if persisted.is_empty() {
                NO_ELIGIBLE_CANDIDATES.to_string()
            } else {
                format!("winners={}", persisted.len())
            };
            audit::append(
                &tx,
                actor_id,
                AuditAction::Draw,
                AuditEntity::Giveaway,
                Some(&giveaway_id.to_string()),
                Some(&detail),
            )?;

            tx.commit()?;

            Ok(DrawCommit::Committed {
                drawn_at,
                winners: persisted,
            })
        })
    }

    /// Persisted winners of a giveaway, in insertion order.
    pub fn winners(&self, giveaway_id: GiveawayId) -> Result<Vec<Winner>> {
        self.with_conn(|conn| query_winners(conn, giveaway_id))
    }
}

fn query_winners(conn: &Connection, giveaway_id: GiveawayId) -> Result<Vec<Winner>> {
    let mut stmt = conn.prepare(
        "SELECT id, giveaway_id, participant_id, handle, created_at
         FROM winners WHERE giveaway_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map([giveaway_id], winner_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn winner_from_row(row: &Row<'_>) -> rusqlite::Result<Winner> {
    Ok(Winner {
        id: row.get(0)?,
        giveaway_id: row.get(1)?,
        participant_id: row.get(2)?,
        handle: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}
