//! Repository and artifact naming, and the storage root that holds one
//! directory per repository.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of the TTL index file inside every repository.
///
/// Reserved: it can never be uploaded, deleted, downloaded or listed
/// as an artifact.
pub const TTL_INDEX_FILENAME: &str = "ttl.json";

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("repository name must not be empty")]
    Empty,
    #[error("repository name is longer than {MAX_NAME_LEN} characters")]
    TooLong,
    #[error("invalid label `{0}` in repository name")]
    InvalidLabel(String),
    #[error("invalid artifact name `{0}`")]
    InvalidArtifact(String),
}

/// A DNS-style repository identifier, e.g. `software.example.org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn parse(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong);
        }
        if let Some(label) = name.split('.').find(|label| !is_valid_label(label)) {
            return Err(NameError::InvalidLabel(label.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

impl FromStr for RepositoryName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositoryName> for String {
    fn from(name: RepositoryName) -> Self {
        name.0
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `name` is the reserved TTL index filename.
pub fn is_reserved(name: &str) -> bool {
    name == TTL_INDEX_FILENAME
}

/// Artifacts live directly under the repository root, so a name must be
/// exactly one path component.
pub fn validate_artifact_name(name: &str) -> Result<(), NameError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(NameError::InvalidArtifact(name.to_string()));
    }
    Ok(())
}

/// The directory that contains one subdirectory per repository
/// (`/cvmfs` on a stratum 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRoot {
    path: PathBuf,
}

impl StorageRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository_path(&self, repository: &RepositoryName) -> PathBuf {
        self.path.join(repository.as_str())
    }

    /// Whether the repository has been provisioned.
    pub async fn contains(&self, repository: &RepositoryName) -> bool {
        tokio::fs::metadata(self.repository_path(repository))
            .await
            .is_ok_and(|metadata| metadata.is_dir())
    }

    /// Every repository under the root, sorted by name.
    ///
    /// Hidden entries, plain files and directories whose names are not
    /// valid repository names are skipped.
    pub async fn repositories(&self) -> io::Result<Vec<RepositoryName>> {
        let mut repositories = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            // follows links, so a symlinked repository still counts
            match tokio::fs::metadata(entry.path()).await {
                Ok(metadata) if metadata.is_dir() => {}
                _ => continue,
            }
            match RepositoryName::parse(&name) {
                Ok(repository) => repositories.push(repository),
                Err(e) => {
                    tracing::debug!(entry = %name, error = %e, "skipping non-repository directory")
                }
            }
        }
        repositories.sort();
        Ok(repositories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_dns_style_names() {
        for name in ["software.example.org", "a", "unstable-1.cvmfs.local", "A0.b-c"] {
            assert!(RepositoryName::parse(name).is_ok(), "{name} should parse");
        }
    }

    #[test]
    fn test_rejects_malformed_names() {
        assert_eq!(RepositoryName::parse(""), Err(NameError::Empty));
        assert!(matches!(
            RepositoryName::parse("bad..name"),
            Err(NameError::InvalidLabel(label)) if label.is_empty()
        ));
        assert!(RepositoryName::parse("-leading.org").is_err());
        assert!(RepositoryName::parse("trailing-.org").is_err());
        assert!(RepositoryName::parse("under_score.org").is_err());
        assert!(RepositoryName::parse("../etc").is_err());
        assert!(RepositoryName::parse(&"a".repeat(64)).is_err());
        assert_eq!(
            RepositoryName::parse(&format!("{}.org", "a.".repeat(126))),
            Err(NameError::TooLong)
        );
    }

    #[test]
    fn test_artifact_names() {
        assert!(validate_artifact_name("image.sqsh").is_ok());
        assert!(validate_artifact_name(TTL_INDEX_FILENAME).is_ok());
        for name in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            assert!(validate_artifact_name(name).is_err(), "{name:?} should fail");
        }
        assert!(is_reserved("ttl.json"));
        assert!(!is_reserved("ttl.json.bak"));
    }

    #[tokio::test]
    async fn test_repositories_are_enumerated_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b.example.org")).unwrap();
        std::fs::create_dir(dir.path().join("a.example.org")).unwrap();
        std::fs::create_dir(dir.path().join(".snapshots")).unwrap();
        std::fs::create_dir(dir.path().join("not_a_repo")).unwrap();
        std::fs::write(dir.path().join("c.example.org"), b"file").unwrap();

        let root = StorageRoot::new(dir.path());
        let names: Vec<String> = root
            .repositories()
            .await
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["a.example.org", "b.example.org"]);

        let repo = RepositoryName::parse("a.example.org").unwrap();
        assert!(root.contains(&repo).await);
        assert!(
            !root
                .contains(&RepositoryName::parse("c.example.org").unwrap())
                .await
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_repository_is_provisioned() {
        let dir = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), dir.path().join("linked.example.org"))
            .unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("gone"),
            dir.path().join("dangling.example.org"),
        )
        .unwrap();

        let root = StorageRoot::new(dir.path());
        let repositories = root.repositories().await.unwrap();
        assert_eq!(
            repositories,
            vec![RepositoryName::parse("linked.example.org").unwrap()]
        );
        assert!(root.contains(&repositories[0]).await);
        assert!(
            !root
                .contains(&RepositoryName::parse("dangling.example.org").unwrap())
                .await
        );
    }

    #[test]
    fn test_serde_validates() {
        let name: RepositoryName = serde_json::from_str("\"x.org\"").unwrap();
        assert_eq!(name.as_str(), "x.org");
        assert!(serde_json::from_str::<RepositoryName>("\"x..org\"").is_err());
    }
}
