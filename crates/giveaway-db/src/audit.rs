use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, Row};

use giveaway_types::models::{AuditAction, AuditEntity, AuditRecord, ParticipantId};

use crate::Database;
use crate::models::{timestamp_at, timestamp_text};

/// Append one audit record on the given connection. Callers pass their open
/// transaction so the record commits (or rolls back) with the change it describes.
pub fn append(
    conn: &Connection,
    actor_id: Option<ParticipantId>,
    action: AuditAction,
    entity: AuditEntity,
    entity_id: Option<&str>,
    detail: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_records (actor_id, action, entity, entity_id, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            actor_id,
            action.as_str(),
            entity.as_str(),
            entity_id,
            detail,
            timestamp_text(Utc::now()),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Audit records about one entity, oldest first.
    pub fn audit_for(&self, entity: AuditEntity, entity_id: &str) -> Result<Vec<AuditRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, actor_id, action, entity, entity_id, detail, created_at
                 FROM audit_records
                 WHERE entity = ?1 AND entity_id = ?2
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![entity.as_str(), entity_id], audit_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Audit records with the given action tag, oldest first.
    pub fn audit_by_action(&self, action: AuditAction) -> Result<Vec<AuditRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, actor_id, action, entity, entity_id, detail, created_at
                 FROM audit_records
                 WHERE action = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([action.as_str()], audit_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.get(0)?,
        actor_id: row.get(1)?,
        action: row.get(2)?,
        entity: row.get(3)?,
        entity_id: row.get(4)?,
        detail: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_append_only() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            append(conn, None, AuditAction::Draw, AuditEntity::Giveaway, Some("1"), Some("winners=0"))
        })
        .unwrap();

        let records = db.audit_for(AuditEntity::Giveaway, "1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, "draw");
        assert_eq!(records[0].actor_id, None);

        let update = db.with_conn(|conn| {
            conn.execute("UPDATE audit_records SET detail = 'edited'", [])?;
            Ok(())
        });
        assert!(update.is_err());

        let delete = db.with_conn(|conn| {
            conn.execute("DELETE FROM audit_records", [])?;
            Ok(())
        });
        assert!(delete.is_err());
        assert_eq!(db.audit_by_action(AuditAction::Draw).unwrap().len(), 1);
    }
}
