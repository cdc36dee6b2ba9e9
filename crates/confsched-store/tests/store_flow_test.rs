use chrono::{TimeZone, Utc};

use confsched_core::Session;
use confsched_store::seed::install_seed;
use confsched_store::{Database, SessionStore, StoreError};

fn session(id: &str, hour: u32, track: &str) -> Session {
    Session {
        id: id.into(),
        title: format!("Talk {id}"),
        abstract_text: "An abstract.".into(),
        speaker_name: "Speaker".into(),
        speaker_icon: None,
        starts_at: Utc.with_ymd_and_hms(2020, 1, 1, hour, 0, 0).unwrap(),
        track: track.into(),
        length_minutes: 45,
        is_starred: false,
    }
}

#[test]
fn stars_survive_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("schedule.db");

    {
        let store = SessionStore::open(Database::open(&db_path).unwrap()).unwrap();
        store
            .replace_all_sessions(vec![session("keynote", 9, "Main"), session("talk", 10, "A")])
            .unwrap();
        store.set_starred("keynote", true).unwrap();
    }

    let store = SessionStore::open(Database::open(&db_path).unwrap()).unwrap();
    let sessions = store.current_sessions();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "keynote");
    assert!(sessions[0].is_starred);
    assert!(!sessions[1].is_starred);
}

#[test]
fn first_run_installs_seed_then_reuses_local_copy() {
    let dir = tempfile::tempdir().unwrap();
    let seed_path = dir.path().join("initial.db");
    let db_path = dir.path().join("data/schedule.db");

    // Build the seed the same way the packaging step would: a plain
    // database file with a populated sessions table.
    {
        let store = SessionStore::open(Database::open(&seed_path).unwrap()).unwrap();
        store.replace_all_sessions(vec![session("seeded", 9, "A")]).unwrap();
    }

    assert!(install_seed(&db_path, &seed_path).unwrap());
    let store = SessionStore::open(Database::open(&db_path).unwrap()).unwrap();
    assert_eq!(store.current_sessions()[0].id, "seeded");
    store.set_starred("seeded", true).unwrap();
    drop(store);

    // Second launch: local copy exists, seed must not clobber the star.
    assert!(!install_seed(&db_path, &seed_path).unwrap());
    let store = SessionStore::open(Database::open(&db_path).unwrap()).unwrap();
    assert!(store.current_sessions()[0].is_starred);
}

#[test]
fn missing_seed_on_first_run_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = install_seed(
        &dir.path().join("schedule.db"),
        &dir.path().join("missing-initial.db"),
    );
    assert!(matches!(result, Err(StoreError::SeedMissing(_))));
}

#[test]
fn resync_replaces_collection_and_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("schedule.db");
    let store = SessionStore::open(Database::open(&db_path).unwrap()).unwrap();

    store
        .replace_all_sessions(vec![session("1", 9, "A"), session("2", 9, "B")])
        .unwrap();
    let ids: Vec<String> = store.current_sessions().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, ["1", "2"]);

    let mut rx = store.subscribe();
    store
        .replace_all_sessions(vec![session("2", 9, "B"), session("0", 8, "A")])
        .unwrap();

    let changes = rx.try_recv().unwrap();
    let ids: Vec<&str> = changes.sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["0", "2"]);
    assert_eq!(changes.deletions, [0]);
    assert_eq!(changes.insertions, [0]);
}
