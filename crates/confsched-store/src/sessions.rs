use tracing::instrument;

use confsched_core::Session;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const SELECT_COLUMNS: &str = "id, title, abstract, speaker_name, speaker_icon, \
     starts_at, track, length_minutes, is_starred";

/// SQL layer for the sessions table. Row mapping and transactional writes
/// only; ordering, diffing, and notification live in the store.
pub struct SessionRepo {
    db: Database,
}

impl SessionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Load every session in schedule order.
    pub fn load_all(&self) -> Result<Vec<Session>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM sessions ORDER BY starts_at, track, id"
            ))?;
            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
    }

    /// Replace the entire collection in a single transaction.
    /// Either every row lands or none does.
    #[instrument(skip(self, sessions), fields(count = sessions.len()))]
    pub fn replace_all(&self, sessions: &[Session]) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM sessions", [])?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO sessions (id, title, abstract, speaker_name, speaker_icon,
                                           starts_at, track, length_minutes, is_starred)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for session in sessions {
                    stmt.execute(rusqlite::params![
                        session.id,
                        session.title,
                        session.abstract_text,
                        session.speaker_name,
                        session.speaker_icon,
                        session.starts_at.to_rfc3339(),
                        session.track,
                        session.length_minutes,
                        session.is_starred,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Point update of the only mutable field. Returns whether a row matched.
    #[instrument(skip(self), fields(session_id = %id, is_starred))]
    pub fn set_starred(&self, id: &str, is_starred: bool) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE sessions SET is_starred = ?1 WHERE id = ?2",
                rusqlite::params![is_starred, id],
            )?;
            Ok(updated > 0)
        })
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Session, StoreError> {
    let starts_at_raw: String = row_helpers::get(row, 5, "sessions", "starts_at")?;

    Ok(Session {
        id: row_helpers::get(row, 0, "sessions", "id")?,
        title: row_helpers::get(row, 1, "sessions", "title")?,
        abstract_text: row_helpers::get(row, 2, "sessions", "abstract")?,
        speaker_name: row_helpers::get(row, 3, "sessions", "speaker_name")?,
        speaker_icon: row_helpers::get_opt(row, 4, "sessions", "speaker_icon")?,
        starts_at: row_helpers::parse_timestamp(&starts_at_raw, "sessions", "starts_at")?,
        track: row_helpers::get(row, 6, "sessions", "track")?,
        length_minutes: row_helpers::get::<u32>(row, 7, "sessions", "length_minutes")?,
        is_starred: row_helpers::get(row, 8, "sessions", "is_starred")?,
    })
}
