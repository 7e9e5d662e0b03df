//! Inbound rotation events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::error::RotationError;

/// One step of the rotation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Create,
    Set,
    Test,
    Finish,
}

impl Phase {
    /// Execution order for a full rotation.
    pub const ALL: [Phase; 4] = [Phase::Create, Phase::Set, Phase::Test, Phase::Finish];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Set => "set",
            Self::Test => "test",
            Self::Finish => "finish",
        }
    }
}

impl FromStr for Phase {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" | "createSecret" => Ok(Self::Create),
            "set" | "setSecret" => Ok(Self::Set),
            "test" | "testSecret" => Ok(Self::Test),
            "finish" | "finishSecret" => Ok(Self::Finish),
            other => Err(RotationError::UnsupportedPhase(other.to_string())),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `{phase, secretId, requestToken}` as delivered by the trigger.
///
/// The phase is kept as received so that an unknown name surfaces as
/// [`RotationError::UnsupportedPhase`] when the event is handled rather than
/// as a decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RotationEvent {
    #[serde(alias = "Step", alias = "step")]
    pub phase: String,

    #[serde(alias = "SecretId")]
    #[validate(length(min = 1, message = "secretId cannot be empty"))]
    pub secret_id: String,

    #[serde(alias = "ClientRequestToken")]
    #[validate(length(min = 1, message = "requestToken cannot be empty"))]
    pub request_token: String,
}

impl RotationEvent {
    pub fn new(
        phase: impl Into<String>,
        secret_id: impl Into<String>,
        request_token: impl Into<String>,
    ) -> Self {
        Self {
            phase: phase.into(),
            secret_id: secret_id.into(),
            request_token: request_token.into(),
        }
    }

    pub fn for_phase(phase: Phase, secret_id: &str, request_token: &str) -> Self {
        Self::new(phase.as_str(), secret_id, request_token)
    }

    pub fn phase(&self) -> Result<Phase, RotationError> {
        self.phase.parse()
    }

    /// Decode an event from JSON.
    pub fn from_json(raw: &str) -> Result<Self, RotationError> {
        serde_json::from_str(raw).map_err(|e| RotationError::InvalidEvent(e.to_string()))
    }

    /// Field checks that do not depend on store state.
    pub fn check(&self) -> Result<Phase, RotationError> {
        Validate::validate(self).map_err(|e| RotationError::InvalidEvent(e.to_string()))?;
        self.phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!("create".parse::<Phase>().unwrap(), Phase::Create);
        assert_eq!("finishSecret".parse::<Phase>().unwrap(), Phase::Finish);
        assert!(matches!(
            "rollback".parse::<Phase>(),
            Err(RotationError::UnsupportedPhase(ref name)) if name == "rollback"
        ));
    }

    #[test]
    fn test_decode_camel_case() {
        let event =
            RotationEvent::from_json(r#"{"phase":"set","secretId":"prod/app","requestToken":"tok1"}"#)
                .unwrap();
        assert_eq!(event, RotationEvent::new("set", "prod/app", "tok1"));
    }

    #[test]
    fn test_decode_trigger_field_names() {
        let event = RotationEvent::from_json(
            r#"{"Step":"testSecret","SecretId":"prod/app","ClientRequestToken":"tok1"}"#,
        )
        .unwrap();
        assert_eq!(event.check().unwrap(), Phase::Test);
        assert_eq!(event.request_token, "tok1");
    }

    #[test]
    fn test_unknown_phase_decodes_but_fails_check() {
        let event = RotationEvent::new("rotate", "prod/app", "tok1");
        assert!(matches!(event.check(), Err(RotationError::UnsupportedPhase(_))));
    }

    #[test]
    fn test_empty_token_is_invalid() {
        let event = RotationEvent::new("create", "prod/app", "");
        assert!(matches!(event.check(), Err(RotationError::InvalidEvent(_))));
    }
}
