use std::path::Path;

use tracing::info;

use crate::error::StoreError;

/// Install the bundled seed database on first run.
///
/// If `db_path` already exists the seed is ignored and `Ok(false)` is
/// returned. Otherwise the seed file is copied verbatim to `db_path`.
/// A missing seed on first run is a packaging error, surfaced as
/// `StoreError::SeedMissing` so the caller can fail fast.
pub fn install_seed(db_path: &Path, seed_path: &Path) -> Result<bool, StoreError> {
    if db_path.exists() {
        return Ok(false);
    }

    if !seed_path.exists() {
        return Err(StoreError::SeedMissing(seed_path.to_owned()));
    }

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(format!("create dir: {e}")))?;
    }

    std::fs::copy(seed_path, db_path).map_err(|e| StoreError::Io(format!("copy seed: {e}")))?;

    info!(
        seed = %seed_path.display(),
        db = %db_path.display(),
        "installed seed database"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_seed_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("initial.db");
        let db = dir.path().join("data/schedule.db");
        std::fs::write(&seed, b"seed-bytes").unwrap();

        assert!(install_seed(&db, &seed).unwrap());
        assert_eq!(std::fs::read(&db).unwrap(), b"seed-bytes");
    }

    #[test]
    fn existing_database_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let seed = dir.path().join("initial.db");
        let db = dir.path().join("schedule.db");
        std::fs::write(&seed, b"seed-bytes").unwrap();
        std::fs::write(&db, b"user-data").unwrap();

        assert!(!install_seed(&db, &seed).unwrap());
        assert_eq!(std::fs::read(&db).unwrap(), b"user-data");
    }

    #[test]
    fn missing_seed_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("schedule.db");
        let result = install_seed(&db, &dir.path().join("nope.db"));
        assert!(matches!(result, Err(StoreError::SeedMissing(_))));
        assert!(!db.exists());
    }
}
