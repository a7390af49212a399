use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::errors::{ExoproofInputError, ExoproofInternalError, ExoproofStepError};

/// Keeps browser local storage items on disk so a later scenario,
/// running in a fresh browser context, can restore them.
///
/// One file per item name directly inside `dir`. No locking: the last
/// scenario to save an item wins.
#[derive(Debug, Clone)]
pub struct LocalStorageBridge {
    dir: PathBuf,
}

impl LocalStorageBridge {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// The file backing `item_name`. Names that would resolve anywhere
    /// other than a plain file inside `dir` are rejected.
    pub fn item_path(&self, item_name: &str) -> Result<PathBuf, ExoproofStepError> {
        let mut components = Path::new(item_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.dir.join(name)),
            _ => Err(ExoproofInputError::InvalidPath {
                input: item_name.to_string(),
            }
            .into()),
        }
    }

    pub async fn save(&self, item_name: &str, content: &str) -> Result<(), ExoproofStepError> {
        tokio::fs::write(self.item_path(item_name)?, content)
            .await
            .map_err(ExoproofInternalError::from)?;
        Ok(())
    }

    pub async fn load(&self, item_name: &str) -> Result<String, ExoproofStepError> {
        let content = tokio::fs::read_to_string(self.item_path(item_name)?)
            .await
            .map_err(ExoproofInternalError::from)?;
        Ok(content)
    }

    /// Removing an item that was never saved is not an error.
    pub async fn delete(&self, item_name: &str) -> Result<(), ExoproofStepError> {
        match tokio::fs::remove_file(self.item_path(item_name)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ExoproofInternalError::from(e).into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_save_overwrites_and_load_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = LocalStorageBridge::new(dir.path().to_path_buf());

        bridge.save("session", "first").await.unwrap();
        bridge.save("session", r#"{"token":"it's \"quoted\""}"#).await.unwrap();

        assert_eq!(
            bridge.load("session").await.unwrap(),
            r#"{"token":"it's \"quoted\""}"#
        );
        assert_eq!(
            bridge.item_path("session").unwrap(),
            dir.path().join("session")
        );
    }

    #[tokio::test]
    async fn test_loading_a_missing_item_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = LocalStorageBridge::new(dir.path().to_path_buf());

        assert!(matches!(
            bridge.load("session").await,
            Err(ExoproofStepError::Internal(ExoproofInternalError::Io(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = LocalStorageBridge::new(dir.path().to_path_buf());

        bridge.delete("session").await.expect("missing file is fine");

        bridge.save("session", "value").await.unwrap();
        bridge.delete("session").await.expect("file is removed");
        assert!(!bridge.item_path("session").unwrap().exists());

        bridge.delete("session").await.expect("second delete is fine");
    }

    #[tokio::test]
    async fn test_item_names_stay_inside_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let bridge = LocalStorageBridge::new(dir.path().to_path_buf());

        let absolute = outside.path().join("session");
        let absolute = absolute.to_string_lossy();
        for name in [absolute.as_ref(), "../escaped", "nested/session", "..", ""] {
            assert!(
                matches!(
                    bridge.save(name, "value").await,
                    Err(ExoproofStepError::External(ExoproofInputError::InvalidPath { .. }))
                ),
                "{name} should be rejected"
            );
            assert!(bridge.load(name).await.is_err());
            assert!(bridge.delete(name).await.is_err());
        }

        assert!(!outside.path().join("session").exists());
        assert!(!dir.path().parent().unwrap().join("escaped").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
