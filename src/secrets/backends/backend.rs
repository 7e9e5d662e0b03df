//! Secret store backend trait and types
//!
//! Defines the versioned, label-aware interface that concrete stores implement.

use async_trait::async_trait;
use std::fmt;

use crate::secrets::credential::SecretDescription;
use crate::secrets::error::Result;
use crate::secrets::labels::{Reassignment, StageLabel};
use crate::secrets::types::SecretString;

/// How to pick a version when reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Stage(StageLabel),
    Version(String),
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stage(label) => write!(f, "stage {}", label),
            Self::Version(id) => write!(f, "version {}", id),
        }
    }
}

/// A version as returned by the backend: raw value plus its labels.
#[derive(Debug, Clone)]
pub struct StoredVersion {
    pub version_id: String,
    pub secret_string: SecretString,
    pub labels: Vec<StageLabel>,
}

/// Versioned key/value store keyed by secret id.
///
/// Each secret has a set of versions and a label register (see
/// [`crate::secrets::labels::LabelRegister`]). Implementations must apply
/// [`SecretStoreBackend::put`] label changes and
/// [`SecretStoreBackend::reassign_label`] atomically with respect to other
/// calls on the same secret.
#[async_trait]
pub trait SecretStoreBackend: Send + Sync + fmt::Debug {
    /// Read one version. `NotFound` when nothing matches the selector.
    async fn get(&self, secret_id: &str, selector: &VersionSelector) -> Result<StoredVersion>;

    /// Create or overwrite `version_id` and move each of `labels` onto it.
    ///
    /// Creates the secret if it does not exist yet.
    async fn put(
        &self,
        secret_id: &str,
        version_id: &str,
        secret_string: &SecretString,
        labels: &[StageLabel],
    ) -> Result<()>;

    /// Move `label` to `target_version_id` as one register assignment.
    ///
    /// `NotFound` when the secret or the target version does not exist.
    async fn reassign_label(
        &self,
        secret_id: &str,
        label: StageLabel,
        target_version_id: &str,
    ) -> Result<Reassignment>;

    /// Every version of the secret with its labels.
    async fn describe(&self, secret_id: &str) -> Result<SecretDescription>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display() {
        assert_eq!(VersionSelector::Stage(StageLabel::Pending).to_string(), "stage PENDING");
        assert_eq!(VersionSelector::Version("tok1".into()).to_string(), "version tok1");
    }
}
