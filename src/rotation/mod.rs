//! # Credential Rotation
//!
//! The four-phase protocol that replaces a database password:
//!
//! 1. **create**: stage a candidate credential as `PENDING`
//! 2. **set**: change the database password to the candidate's
//! 3. **test**: authenticate with the candidate
//! 4. **finish**: promote the candidate to `CURRENT`
//!
//! Each phase may be delivered more than once and in separate processes.
//! [`plan`] derives what a phase must do from the store's labels, and
//! [`RotationCoordinator`] executes that decision.

pub mod coordinator;
pub mod error;
pub mod event;
pub mod plan;

pub use coordinator::{PhaseOutcome, RotationCoordinator};
pub use error::{Result, RotationError};
pub use event::{Phase, RotationEvent};
pub use plan::{plan, PhaseAction, SecretSnapshot};
