use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, instrument, trace};

use confsched_core::session::sort_schedule;
use confsched_core::{diff_snapshots, Changes, Session};

use crate::database::Database;
use crate::error::StoreError;
use crate::sessions::SessionRepo;

/// Capacity of the multicast change channel. Events are small and consumers
/// drain them on the mutating thread, so lag only occurs if a subscriber
/// stops reading entirely.
const CHANGES_CHANNEL_CAPACITY: usize = 64;

/// Owns the persistent session collection and its change streams.
///
/// The in-memory snapshot is always sorted by `(starts_at, track)` and
/// mirrors the last committed transaction. Every mutation runs a single
/// transaction, then recomputes the snapshot, emits exactly one [`Changes`]
/// on the multicast channel, and fans the new value out to per-record
/// watches, all synchronously on the mutating thread. Subscribers never
/// observe a partially applied write.
///
/// Constructed once by the composition root and cloned (cheap, `Arc` inner)
/// into anything that needs it.
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    repo: SessionRepo,
    changes_tx: broadcast::Sender<Changes>,
    state: Mutex<State>,
}

struct State {
    sessions: Vec<Session>,
    watches: Vec<RecordWatch>,
}

struct RecordWatch {
    session_id: String,
    tx: watch::Sender<Session>,
}

impl State {
    /// Push current values into live per-record watches. A watch whose
    /// record no longer exists is dropped, which closes its stream; that
    /// closure is the deletion signal. Watches whose receiver went away
    /// are pruned here, releasing the registration exactly once.
    fn sync_watches(&mut self) {
        let sessions = &self.sessions;
        self.watches.retain(|w| {
            if w.tx.is_closed() {
                return false;
            }
            match sessions.iter().find(|s| s.id == w.session_id) {
                Some(current) => {
                    if *w.tx.borrow() != *current {
                        w.tx.send_replace(current.clone());
                    }
                    true
                }
                None => false,
            }
        });
    }
}

impl SessionStore {
    /// Load and sort all persisted sessions into memory.
    pub fn open(db: Database) -> Result<Self, StoreError> {
        let repo = SessionRepo::new(db);
        let mut sessions = repo.load_all()?;
        sort_schedule(&mut sessions);
        debug!(count = sessions.len(), "session store opened");

        let (changes_tx, _) = broadcast::channel(CHANGES_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(StoreInner {
                repo,
                changes_tx,
                state: Mutex::new(State {
                    sessions,
                    watches: Vec::new(),
                }),
            }),
        })
    }

    /// Current sorted snapshot. Never touches the database.
    pub fn current_sessions(&self) -> Vec<Session> {
        self.inner.state.lock().sessions.clone()
    }

    /// Attach to the multicast change stream. Each receiver sees every
    /// [`Changes`] emitted after this call; history is not replayed.
    /// Dropping the receiver detaches it.
    pub fn subscribe(&self) -> broadcast::Receiver<Changes> {
        self.inner.changes_tx.subscribe()
    }

    /// Atomically replace the whole collection (full resync).
    ///
    /// All-or-nothing: on transaction failure the collection is unchanged
    /// and nothing is emitted. On success exactly one [`Changes`] is
    /// emitted, even when the incoming set equals the current one.
    #[instrument(skip(self, new_sessions), fields(count = new_sessions.len()))]
    pub fn replace_all_sessions(&self, mut new_sessions: Vec<Session>) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for session in &new_sessions {
            if !seen.insert(session.id.clone()) {
                return Err(StoreError::DuplicateId(session.id.clone()));
            }
        }
        sort_schedule(&mut new_sessions);

        let mut state = self.inner.state.lock();
        self.inner.repo.replace_all(&new_sessions)?;

        let old = std::mem::replace(&mut state.sessions, new_sessions);
        let changes = diff_snapshots(&old, &state.sessions);
        debug!(
            deletions = changes.deletions.len(),
            insertions = changes.insertions.len(),
            modifications = changes.modifications.len(),
            "collection replaced"
        );

        state.sync_watches();
        let _ = self.inner.changes_tx.send(changes);
        Ok(())
    }

    /// Update one record's `is_starred` flag.
    ///
    /// Unknown ids are tolerated silently: the UI may hold a reference to a
    /// record that a resync removed. A write that would not change the
    /// stored value is skipped, so at most one [`Changes`] is emitted and
    /// only when the value actually flipped.
    #[instrument(skip(self), fields(session_id = %session_id, is_starred))]
    pub fn set_starred(&self, session_id: &str, is_starred: bool) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock();
        let Some(pos) = state.sessions.iter().position(|s| s.id == session_id) else {
            trace!("set_starred on unknown id, ignoring");
            return Ok(());
        };
        if state.sessions[pos].is_starred == is_starred {
            return Ok(());
        }

        if !self.inner.repo.set_starred(session_id, is_starred)? {
            return Ok(());
        }

        // Only is_starred changed, so the sort keys and row positions hold.
        state.sessions[pos].is_starred = is_starred;
        let changes = Changes {
            sessions: state.sessions.clone(),
            deletions: Vec::new(),
            insertions: Vec::new(),
            modifications: vec![pos],
        };

        state.sync_watches();
        let _ = self.inner.changes_tx.send(changes);
        Ok(())
    }

    /// Live handle for one record, or `None` if the id does not currently
    /// exist. The handle's stream fires only for this record's changes and
    /// closes when the record is removed by a resync.
    pub fn observe_session(&self, session_id: &str) -> Option<SessionWatch> {
        let mut state = self.inner.state.lock();
        let current = state.sessions.iter().find(|s| s.id == session_id)?.clone();
        let (tx, rx) = watch::channel(current);
        state.watches.push(RecordWatch {
            session_id: session_id.to_owned(),
            tx,
        });
        Some(SessionWatch { rx })
    }
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Per-record subscription handle.
///
/// `value` always returns the record as of the last committed write. Once
/// the record is deleted the change stream closes and
/// [`SessionWatch::changed`] returns `None`, while the last known value
/// stays readable. Dropping the
/// handle releases the subscription.
pub struct SessionWatch {
    rx: watch::Receiver<Session>,
}

impl SessionWatch {
    /// Latest committed value of the watched record.
    pub fn value(&self) -> Session {
        self.rx.borrow().clone()
    }

    /// Wait for the next change to this record. `None` means the record
    /// was deleted and no further changes will arrive.
    pub async fn changed(&mut self) -> Option<Session> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Non-blocking poll: the new value if this record changed since the
    /// last read, `None` otherwise (including after deletion).
    pub fn try_latest(&mut self) -> Option<Session> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }

    /// True once the watched record has been deleted.
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}
