//! Backup file naming and file-copy backups.

use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::macros::format_description;

use crate::error::StoreError;

/// How a database snapshot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackupMethod {
    /// `VACUUM INTO`, consistent even with a write-ahead log.
    #[default]
    Vacuum,
    /// Plain copy of the database file.
    Copy,
}

/// `<dir>/<file name>.backup_<YYYYmmdd_HHMMSS>`, with `_N` appended until
/// the name is free. `dir` defaults to the database's own directory.
pub fn backup_target(db_path: &Path, dir: Option<&Path>, at: OffsetDateTime) -> Result<PathBuf, StoreError> {
    let stamp = at
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .map_err(StoreError::backup_failed)?;
    let file_name = db_path
        .file_name()
        .map_or_else(|| "x-ui.db".to_string(), |n| n.to_string_lossy().into_owned());
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| db_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    let base = format!("{file_name}.backup_{stamp}");
    let mut candidate = dir.join(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{base}_{n}"));
        n += 1;
    }
    Ok(candidate)
}

/// Local wall-clock time, falling back to UTC when the offset is unknown.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Copy `src` to `dst`, refusing to replace an existing file.
pub async fn copy_file(src: &Path, dst: &Path) -> Result<(), StoreError> {
    if tokio::fs::try_exists(dst).await.map_err(StoreError::backup_failed)? {
        return Err(StoreError::BackupFailed(format!(
            "{} already exists",
            dst.display()
        )));
    }
    if let Some(parent) = dst.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StoreError::backup_failed)?;
    }
    tokio::fs::copy(src, dst)
        .await
        .map_err(StoreError::backup_failed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn names_backup_after_database_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("x-ui.db");
        let target = backup_target(&db, None, datetime!(2024-03-05 07:08:09 UTC)).unwrap();
        assert_eq!(target, dir.path().join("x-ui.db.backup_20240305_070809"));
    }

    #[test]
    fn never_reuses_an_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("x-ui.db");
        let at = datetime!(2024-03-05 07:08:09 UTC);
        std::fs::write(dir.path().join("x-ui.db.backup_20240305_070809"), b"old").unwrap();
        let target = backup_target(&db, None, at).unwrap();
        assert_eq!(target, dir.path().join("x-ui.db.backup_20240305_070809_1"));
    }

    #[tokio::test]
    async fn copy_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.db");
        let dst = dir.path().join("b.db");
        std::fs::write(&src, b"data").unwrap();
        copy_file(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"data");
        assert!(matches!(
            copy_file(&src, &dst).await,
            Err(StoreError::BackupFailed(_))
        ));
    }
}
