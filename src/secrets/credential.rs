//! Credential payload stored in each secret version.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{Result, SecretsError};
use super::labels::StageLabel;
use super::types::{serialize_exposed, SecretString};

/// Port used when the stored record omits one.
pub const DEFAULT_PORT: u16 = 5432;

/// Database used when the stored record omits one.
pub const DEFAULT_DBNAME: &str = "postgres";

/// Engine name accepted in the optional `engine` field.
pub const SUPPORTED_ENGINE: &str = "postgres";

/// Database connection credential as stored in the secret value.
///
/// Fields the rotation does not understand are kept in `extra` and written
/// back unchanged when a candidate is derived from `CURRENT`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub username: String,

    #[serde(serialize_with = "serialize_exposed")]
    pub password: SecretString,

    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CredentialRecord {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<SecretString>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
            port: None,
            dbname: None,
            engine: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    /// Parses and validates a stored secret value.
    pub fn parse(secret_id: &str, secret_string: &SecretString) -> Result<Self> {
        // serde_json errors may quote the offending input; keep only the position.
        let record: CredentialRecord =
            serde_json::from_str(secret_string.expose_secret()).map_err(|e| {
                SecretsError::malformed(
                    secret_id,
                    format!(
                        "value is not a credential object ({:?} error at line {} column {})",
                        e.classify(),
                        e.line(),
                        e.column()
                    ),
                )
            })?;
        record.validate(secret_id)?;
        Ok(record)
    }

    fn validate(&self, secret_id: &str) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(SecretsError::malformed(secret_id, "field 'username' is empty"));
        }
        if self.host.trim().is_empty() {
            return Err(SecretsError::malformed(secret_id, "field 'host' is empty"));
        }
        if let Some(engine) = self.engine.as_deref() {
            if engine != SUPPORTED_ENGINE {
                return Err(SecretsError::malformed(
                    secret_id,
                    format!("unsupported engine '{}', expected '{}'", engine, SUPPORTED_ENGINE),
                ));
            }
        }
        Ok(())
    }

    /// Serializes the record, password included, for writing to the store.
    pub fn to_secret_string(&self) -> Result<SecretString> {
        serde_json::to_string(self)
            .map(SecretString::new)
            .map_err(|e| SecretsError::backend_error(format!("failed to encode credential: {}", e)))
    }

    /// Copy of this record carrying a different password.
    pub fn with_password(&self, password: SecretString) -> Self {
        Self { password, ..self.clone() }
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn dbname_or_default(&self) -> &str {
        self.dbname.as_deref().unwrap_or(DEFAULT_DBNAME)
    }
}

/// A parsed credential together with the version it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedCredential {
    pub version_id: String,
    pub labels: Vec<StageLabel>,
    pub record: CredentialRecord,
}

impl StagedCredential {
    pub fn has_label(&self, label: StageLabel) -> bool {
        self.labels.contains(&label)
    }
}

/// Version id → stage labels for one secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretDescription {
    pub secret_id: String,
    pub versions: BTreeMap<String, Vec<StageLabel>>,
}

impl SecretDescription {
    pub fn labels_of(&self, version_id: &str) -> &[StageLabel] {
        self.versions.get(version_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn holder(&self, label: StageLabel) -> Option<&str> {
        self.versions
            .iter()
            .find(|(_, labels)| labels.contains(&label))
            .map(|(version, _)| version.as_str())
    }

    pub fn contains_version(&self, version_id: &str) -> bool {
        self.versions.contains_key(version_id)
    }
}
