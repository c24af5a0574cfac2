use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::backend::{BackendError, KeyValueBackend};
use crate::key_format::KeyVariant;
use crate::kid::Kid;

const RECORD_EXTENSION: &str = "json";

/// One file per record: `<root>/<variant>/<variant>-key-<kid>.json`
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn variant_dir(&self, variant: KeyVariant) -> PathBuf {
        self.root.join(variant.as_str())
    }

    fn record_path(&self, variant: KeyVariant, kid: &Kid) -> PathBuf {
        self.variant_dir(variant)
            .join(format!("{}.{}", variant.slot(kid), RECORD_EXTENSION))
    }
}

#[async_trait]
impl KeyValueBackend for FsBackend {
    async fn get(&self, variant: KeyVariant, kid: &Kid) -> Result<Option<String>, BackendError> {
        match tokio::fs::read_to_string(self.record_path(variant, kid)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, variant: KeyVariant, kid: &Kid, value: String) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(self.variant_dir(variant)).await?;

        // Write then rename so a crash never leaves half a record behind
        let path = self.record_path(variant, kid);
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, value).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove(&self, variant: KeyVariant, kid: &Kid) -> Result<bool, BackendError> {
        match tokio::fs::remove_file(self.record_path(variant, kid)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, variant: KeyVariant) -> Result<BTreeSet<Kid>, BackendError> {
        Ok(self.scan(variant).await?.0)
    }

    async fn unrecognised(&self, variant: KeyVariant) -> Result<Vec<String>, BackendError> {
        Ok(self.scan(variant).await?.1)
    }
}

impl FsBackend {
    /// Walk a variant directory, splitting record files into valid kids and
    ///  file names whose kid does not parse. Anything else is skipped.
    async fn scan(&self, variant: KeyVariant) -> Result<(BTreeSet<Kid>, Vec<String>), BackendError> {
        let mut kids = BTreeSet::new();
        let mut unrecognised = Vec::new();
        let mut entries = match tokio::fs::read_dir(self.variant_dir(variant)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((kids, unrecognised)),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}-key-", variant.as_str());
        let suffix = format!(".{}", RECORD_EXTENSION);
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(kid) = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
            else {
                continue;
            };
            match kid.parse::<Kid>() {
                Ok(kid) => {
                    kids.insert(kid);
                }
                Err(_) => unrecognised.push(file_name.to_string()),
            }
        }

        unrecognised.sort();
        Ok((kids, unrecognised))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let kid = Kid::generate();

        let backend = FsBackend::new(dir.path());
        backend
            .put(KeyVariant::Private, &kid, "{}".to_string())
            .await
            .unwrap();

        let reopened = FsBackend::new(dir.path());
        assert_eq!(
            reopened.get(KeyVariant::Private, &kid).await.unwrap().as_deref(),
            Some("{}")
        );
        assert!(dir
            .path()
            .join("private")
            .join(format!("private-key-{}.json", kid))
            .exists());
    }

    #[tokio::test]
    async fn test_list_ignores_stray_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        let kid = Kid::generate();
        backend
            .put(KeyVariant::Imported, &kid, "{}".to_string())
            .await
            .unwrap();
        std::fs::write(dir.path().join("imported").join("notes.txt"), "hi").unwrap();
        std::fs::write(
            dir.path().join("imported").join("imported-key-garbage.json"),
            "{}",
        )
        .unwrap();

        let kids = backend.list(KeyVariant::Imported).await.unwrap();
        assert_eq!(kids.into_iter().collect::<Vec<_>>(), vec![kid]);
        assert!(backend.list(KeyVariant::Public).await.unwrap().is_empty());

        // The badly named record is surfaced, the unrelated file is not
        assert_eq!(
            backend.unrecognised(KeyVariant::Imported).await.unwrap(),
            vec!["imported-key-garbage.json".to_string()]
        );
        assert!(backend
            .unrecognised(KeyVariant::Public)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FsBackend::new(dir.path());
        assert!(!backend
            .remove(KeyVariant::Public, &Kid::generate())
            .await
            .unwrap());
    }
}
