use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::session::Session;

/// Diff payload describing one mutation's effect on the sorted collection.
///
/// `deletions` are indices into the pre-mutation order; `insertions` and
/// `modifications` are indices into the post-mutation order carried in
/// `sessions`. The three sets are disjoint by id. List consumers apply
/// deletions, then insertions, then modifications.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Changes {
    pub sessions: Vec<Session>,
    pub deletions: Vec<usize>,
    pub insertions: Vec<usize>,
    pub modifications: Vec<usize>,
}

impl Changes {
    /// True when the mutation left every row untouched.
    pub fn is_noop(&self) -> bool {
        self.deletions.is_empty() && self.insertions.is_empty() && self.modifications.is_empty()
    }
}

/// Compute the row-level diff between two sorted snapshots.
///
/// Rows are matched by id: an id present only in `old` is a deletion, one
/// present only in `new` is an insertion, and one present in both is a
/// modification iff its field values differ. Both inputs must already be
/// in schedule order; all emitted index vectors are ascending.
pub fn diff_snapshots(old: &[Session], new: &[Session]) -> Changes {
    let old_by_id: HashMap<&str, usize> = old
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();
    let new_ids: HashSet<&str> = new.iter().map(|s| s.id.as_str()).collect();

    let deletions: Vec<usize> = old
        .iter()
        .enumerate()
        .filter(|(_, s)| !new_ids.contains(s.id.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut insertions = Vec::new();
    let mut modifications = Vec::new();
    for (i, session) in new.iter().enumerate() {
        match old_by_id.get(session.id.as_str()) {
            None => insertions.push(i),
            Some(&old_idx) => {
                if old[old_idx] != *session {
                    modifications.push(i);
                }
            }
        }
    }

    Changes {
        sessions: new.to_vec(),
        deletions,
        insertions,
        modifications,
    }
}
