//! Store-level results. Business conflicts the store detects itself are
//! returned as values; `Err` is reserved for the store being unusable.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use giveaway_types::models::{EntryId, Winner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryInsert {
    Recorded { entry_id: EntryId, seq_no: i64 },
    /// The (giveaway, participant) unique constraint rejected the insert.
    AlreadyEntered,
    /// The giveaway was drawn before the insert could commit.
    Closed,
    UnknownGiveaway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Excluded,
    AlreadyExcluded,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommit {
    Committed {
        drawn_at: DateTime<Utc>,
        winners: Vec<Winner>,
    },
    /// `is_drawn` was already set when the transaction tried to claim it.
    AlreadyDrawn,
}

/// A candidate chosen by the selector, as handed to `commit_draw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedWinner {
    pub participant_id: i64,
    pub handle: Option<String>,
}

pub(crate) fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

pub(crate) fn optional_timestamp_at(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        parse_timestamp(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
    })
    .transpose()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Rows written by hand in the sqlite3 shell use datetime('now')
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
}
