//! The bootstrap tombstone: a zero-length-in-spirit marker file proving this
//! Nexus instance has completed bootstrap at least once on this data volume.

use std::path::Path;

use crate::Error;

const TOMBSTONE_CONTENTS: &str = "spike.nexus.bootstrapped=true";

/// Returns `true` iff the tombstone file exists at `path`.
pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Creates the tombstone file at `path` with mode `0600`.
///
/// Per `spec.md` §6, a write failure here is fatal: the data volume is
/// unreliable and bootstrap cannot be considered durable.
#[cfg(unix)]
pub async fn write(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::write(path, TOMBSTONE_CONTENTS)
        .await
        .map_err(|err| Error::Persistence(format!("while writing tombstone: {err}")))?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|err| Error::Persistence(format!("while setting tombstone permissions: {err}")))?;
    Ok(())
}

/// Creates the tombstone file at `path`. Unix file-mode restriction is not
/// available on this platform; callers still get a durably-written file.
#[cfg(not(unix))]
pub async fn write(path: &Path) -> Result<(), Error> {
    tokio::fs::write(path, TOMBSTONE_CONTENTS)
        .await
        .map_err(|err| Error::Persistence(format!("while writing tombstone: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_exists() {
        let dir = tempdir();
        let path = dir.join("tombstone");
        assert!(!exists(&path).await);
        write(&path).await.unwrap();
        assert!(exists(&path).await);
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, TOMBSTONE_CONTENTS);
    }

    fn tempdir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "nexus-tombstone-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
