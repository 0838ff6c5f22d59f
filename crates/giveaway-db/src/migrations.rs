use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (ledger schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE participants (
                id              INTEGER PRIMARY KEY,
                handle          TEXT,
                locale          TEXT,
                gate_verified   INTEGER NOT NULL DEFAULT 0,
                suspended       INTEGER NOT NULL DEFAULT 0,
                is_banned       INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_participants_gate
                ON participants(gate_verified, is_banned);

            CREATE TABLE giveaways (
                id                          INTEGER PRIMARY KEY AUTOINCREMENT,
                creator_id                  INTEGER NOT NULL,
                target_channel_id           INTEGER NOT NULL,
                template                    TEXT NOT NULL,
                cond_channel_1              INTEGER,
                cond_channel_2              INTEGER,
                premium_only                INTEGER NOT NULL DEFAULT 0,
                paid_comment_condition      INTEGER NOT NULL DEFAULT 0,
                winners_count               INTEGER NOT NULL
                    CHECK (winners_count BETWEEN 1 AND 100),
                anti_fraud_recheck_on_draw  INTEGER NOT NULL DEFAULT 1,
                auto_draw_enabled           INTEGER NOT NULL DEFAULT 0,
                auto_draw_threshold         INTEGER,
                is_drawn                    INTEGER NOT NULL DEFAULT 0,
                created_at                  TEXT NOT NULL,
                drawn_at                    TEXT
            );

            CREATE INDEX idx_giveaways_auto_draw
                ON giveaways(auto_draw_enabled, is_drawn);

            CREATE TABLE entries (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                giveaway_id     INTEGER NOT NULL REFERENCES giveaways(id),
                participant_id  INTEGER NOT NULL,
                handle          TEXT,
                seq_no          INTEGER NOT NULL,
                excluded        INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                CONSTRAINT uq_entry_giveaway_participant UNIQUE (giveaway_id, participant_id)
            );

            CREATE INDEX idx_entries_participant
                ON entries(participant_id);

            CREATE TABLE winners (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                giveaway_id     INTEGER NOT NULL REFERENCES giveaways(id),
                participant_id  INTEGER NOT NULL,
                handle          TEXT,
                created_at      TEXT NOT NULL,
                CONSTRAINT uq_winner_giveaway_participant UNIQUE (giveaway_id, participant_id)
            );

            CREATE TABLE audit_records (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                actor_id    INTEGER,
                action      TEXT NOT NULL,
                entity      TEXT NOT NULL,
                entity_id   TEXT,
                detail      TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_audit_entity
                ON audit_records(entity, entity_id);
            CREATE INDEX idx_audit_action
                ON audit_records(action);

            -- is_drawn and excluded only ever move from 0 to 1
            CREATE TRIGGER giveaways_drawn_is_terminal
                BEFORE UPDATE OF is_drawn ON giveaways
                WHEN OLD.is_drawn = 1 AND NEW.is_drawn = 0
            BEGIN
                SELECT RAISE(ABORT, 'is_drawn cannot be reset');
            END;

            CREATE TRIGGER entries_exclusion_is_one_way
                BEFORE UPDATE OF excluded ON entries
                WHEN OLD.excluded = 1 AND NEW.excluded = 0
            BEGIN
                SELECT RAISE(ABORT, 'exclusion cannot be reverted');
            END;

            CREATE TRIGGER entries_never_deleted
                BEFORE DELETE ON entries
            BEGIN
                SELECT RAISE(ABORT, 'entries are never deleted');
            END;

            CREATE TRIGGER winners_immutable
                BEFORE UPDATE ON winners
            BEGIN
                SELECT RAISE(ABORT, 'winners are immutable');
            END;

            CREATE TRIGGER winners_never_deleted
                BEFORE DELETE ON winners
            BEGIN
                SELECT RAISE(ABORT, 'winners are never deleted');
            END;

            CREATE TRIGGER audit_records_append_only
                BEFORE UPDATE ON audit_records
            BEGIN
                SELECT RAISE(ABORT, 'audit records are append-only');
            END;

            CREATE TRIGGER audit_records_never_deleted
                BEFORE DELETE ON audit_records
            BEGIN
                SELECT RAISE(ABORT, 'audit records are append-only');
            END;

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
