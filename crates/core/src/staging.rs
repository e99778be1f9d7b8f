//! Staged source-image lifecycle.
//!
//! The API layer writes the uploaded photo to local disk before
//! enqueueing a job; from that point the file is owned by the job. The
//! helpers here enforce the enqueue-time invariant (the file exists and
//! is non-empty) and provide the idempotent removal every terminal
//! branch of the pipeline calls.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::CoreError;

/// Verify that a staged image exists and is non-empty.
///
/// Called by the queue at enqueue time; a job referencing a missing or
/// empty file is rejected before it is made durable.
pub async fn assert_staged(path: &Path) -> Result<(), CoreError> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            CoreError::Validation(format!("Staged image {} does not exist", path.display()))
        } else {
            CoreError::Io(e)
        }
    })?;

    if meta.len() == 0 {
        return Err(CoreError::Validation(format!(
            "Staged image {} is empty",
            path.display()
        )));
    }

    Ok(())
}

/// Remove a staged image if it still exists.
///
/// Idempotent: a missing file is success. Returns `true` when a file
/// was actually removed, `false` when there was nothing to remove.
pub async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn staged_file_passes_check() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"jpeg bytes").unwrap();
        assert!(assert_staged(f.path()).await.is_ok());
    }

    #[tokio::test]
    async fn missing_file_fails_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.jpg");
        let err = assert_staged(&path).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_file_fails_check() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let err = assert_staged(f.path()).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged.jpg");
        tokio::fs::write(&path, b"bytes").await.unwrap();

        assert!(remove_if_exists(&path).await.unwrap());
        // Second removal of the same path is a no-op, not an error.
        assert!(!remove_if_exists(&path).await.unwrap());
        assert!(!path.exists());
    }
}
