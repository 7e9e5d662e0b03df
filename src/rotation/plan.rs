//! Phase planning.
//!
//! [`plan`] decides what a phase must do from the secret's labels and the
//! event alone. It performs no I/O, so every re-delivery of an event is
//! planned against whatever the store holds at that moment.

use super::error::{Result, RotationError};
use super::event::{Phase, RotationEvent};
use crate::secrets::{SecretDescription, SecretsError, StageLabel};

/// Label state of one secret at the start of a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSnapshot {
    pub description: SecretDescription,
}

impl SecretSnapshot {
    pub fn new(description: SecretDescription) -> Self {
        Self { description }
    }

    pub fn secret_id(&self) -> &str {
        &self.description.secret_id
    }

    pub fn current(&self) -> Option<&str> {
        self.description.holder(StageLabel::Current)
    }

    pub fn pending(&self) -> Option<&str> {
        self.description.holder(StageLabel::Pending)
    }

    fn token_has(&self, token: &str, label: StageLabel) -> bool {
        self.description.labels_of(token).contains(&label)
    }
}

/// What a phase will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseAction {
    /// The token already holds `CURRENT` or `PREVIOUS`: this attempt finished
    /// earlier and nothing may be touched.
    AlreadyComplete,
    /// The token already holds `PENDING`.
    CandidateStaged,
    /// Derive a candidate from `current` and stage it under the token.
    StageCandidate { current: String },
    /// Change the database password to the candidate's, authenticating as
    /// `current`.
    ApplyCandidate { current: String },
    /// Authenticate as the candidate.
    VerifyCandidate,
    /// Move `CURRENT` to the token.
    Promote,
}

/// Derives the action for `event` from `snapshot`.
///
/// # Errors
///
/// - [`RotationError::UnsupportedPhase`] for an unknown phase name
/// - `NotFound` when there is no `CURRENT` to rotate from, or when `PENDING`
///   is missing or belongs to a different request token
pub fn plan(snapshot: &SecretSnapshot, event: &RotationEvent) -> Result<PhaseAction> {
    let phase = event.phase()?;
    let token = event.request_token.as_str();

    if snapshot.token_has(token, StageLabel::Current)
        || snapshot.token_has(token, StageLabel::Previous)
    {
        return Ok(PhaseAction::AlreadyComplete);
    }

    match phase {
        Phase::Create => {
            if snapshot.token_has(token, StageLabel::Pending) {
                return Ok(PhaseAction::CandidateStaged);
            }
            let current = require_current(snapshot)?;
            Ok(PhaseAction::StageCandidate { current })
        }
        Phase::Set => {
            require_pending_for(snapshot, token)?;
            let current = require_current(snapshot)?;
            Ok(PhaseAction::ApplyCandidate { current })
        }
        Phase::Test => {
            require_pending_for(snapshot, token)?;
            Ok(PhaseAction::VerifyCandidate)
        }
        Phase::Finish => {
            require_pending_for(snapshot, token)?;
            Ok(PhaseAction::Promote)
        }
    }
}

fn require_current(snapshot: &SecretSnapshot) -> Result<String> {
    snapshot.current().map(str::to_string).ok_or_else(|| {
        RotationError::Secrets(SecretsError::not_found(snapshot.secret_id(), "stage CURRENT"))
    })
}

fn require_pending_for(snapshot: &SecretSnapshot, token: &str) -> Result<()> {
    match snapshot.pending() {
        Some(pending) if pending == token => Ok(()),
        Some(other) => Err(RotationError::Secrets(SecretsError::not_found(
            snapshot.secret_id(),
            format!("stage PENDING on version {} (held by {})", token, other),
        ))),
        None => Err(RotationError::Secrets(SecretsError::not_found(
            snapshot.secret_id(),
            "stage PENDING",
        ))),
    }
}
