//! Version-stage labels and the per-secret label register.
//!
//! A secret carries at most one version per label. Rather than inferring that
//! from whatever a backend happens to store, every backend keeps a
//! [`LabelRegister`] per secret and persists it as a whole, so label moves are
//! a single assignment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Role of a secret version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageLabel {
    /// The trusted, active credential.
    Current,
    /// Candidate awaiting promotion.
    Pending,
    /// The credential that was `CURRENT` before the last promotion.
    Previous,
}

impl StageLabel {
    pub const ALL: [StageLabel; 3] = [StageLabel::Current, StageLabel::Pending, StageLabel::Previous];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Current => "CURRENT",
            Self::Pending => "PENDING",
            Self::Previous => "PREVIOUS",
        }
    }
}

impl FromStr for StageLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CURRENT" => Ok(Self::Current),
            "PENDING" => Ok(Self::Pending),
            "PREVIOUS" => Ok(Self::Previous),
            _ => Err(format!("Unknown stage label: {}", s)),
        }
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of reassigning a label on a [`LabelRegister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassignment {
    /// The label moved. `displaced` is the version that held it before.
    Moved { displaced: Option<String> },
    /// The target already held the label; nothing changed.
    Unchanged,
}

/// Which version holds each label for one secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRegister {
    pub current: Option<String>,
    pub pending: Option<String>,
    pub previous: Option<String>,
}

impl LabelRegister {
    pub fn holder(&self, label: StageLabel) -> Option<&str> {
        match label {
            StageLabel::Current => self.current.as_deref(),
            StageLabel::Pending => self.pending.as_deref(),
            StageLabel::Previous => self.previous.as_deref(),
        }
    }

    fn slot_mut(&mut self, label: StageLabel) -> &mut Option<String> {
        match label {
            StageLabel::Current => &mut self.current,
            StageLabel::Pending => &mut self.pending,
            StageLabel::Previous => &mut self.previous,
        }
    }

    /// Sets a slot as read back from storage, without promotion side effects.
    pub(crate) fn restore(&mut self, label: StageLabel, version_id: String) {
        *self.slot_mut(label) = Some(version_id);
    }

    /// Labels held by `version_id`, in `CURRENT, PENDING, PREVIOUS` order.
    pub fn labels_of(&self, version_id: &str) -> Vec<StageLabel> {
        StageLabel::ALL
            .into_iter()
            .filter(|label| self.holder(*label) == Some(version_id))
            .collect()
    }

    /// Moves `label` to `version_id`.
    ///
    /// Moving `CURRENT` is the promotion step: the displaced holder becomes
    /// `PREVIOUS` and `version_id` loses `PENDING` in the same assignment.
    pub fn reassign(&mut self, label: StageLabel, version_id: &str) -> Reassignment {
        if self.holder(label) == Some(version_id) {
            return Reassignment::Unchanged;
        }

        let displaced = self.slot_mut(label).replace(version_id.to_string());

        if label == StageLabel::Current {
            if self.pending.as_deref() == Some(version_id) {
                self.pending = None;
            }
            match displaced.as_ref() {
                Some(old) => self.previous = Some(old.clone()),
                None if self.previous.as_deref() == Some(version_id) => self.previous = None,
                None => {}
            }
        }

        Reassignment::Moved { displaced }
    }

    /// Version id → labels, omitting versions without labels.
    pub fn as_map(&self) -> BTreeMap<String, Vec<StageLabel>> {
        let mut map: BTreeMap<String, Vec<StageLabel>> = BTreeMap::new();
        for label in StageLabel::ALL {
            if let Some(version) = self.holder(label) {
                map.entry(version.to_string()).or_default().push(label);
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_string_roundtrip() {
        for label in StageLabel::ALL {
            assert_eq!(label.as_str().parse::<StageLabel>().unwrap(), label);
        }
        assert!("AWSCURRENT".parse::<StageLabel>().is_err());
    }

    #[test]
    fn test_pending_moves_off_stale_candidate() {
        let mut register = LabelRegister { current: Some("v1".into()), ..Default::default() };
        register.reassign(StageLabel::Pending, "stale");
        let outcome = register.reassign(StageLabel::Pending, "tok1");

        assert_eq!(outcome, Reassignment::Moved { displaced: Some("stale".into()) });
        assert_eq!(register.holder(StageLabel::Pending), Some("tok1"));
        assert!(register.labels_of("stale").is_empty());
    }

    #[test]
    fn test_promote_demotes_current_and_clears_pending() {
        let mut register = LabelRegister {
            current: Some("v1".into()),
            pending: Some("tok1".into()),
            previous: Some("v0".into()),
        };

        let outcome = register.reassign(StageLabel::Current, "tok1");

        assert_eq!(outcome, Reassignment::Moved { displaced: Some("v1".into()) });
        assert_eq!(register.current.as_deref(), Some("tok1"));
        assert_eq!(register.pending, None);
        assert_eq!(register.previous.as_deref(), Some("v1"));
    }

    #[test]
    fn test_promote_same_version_is_unchanged() {
        let mut register = LabelRegister { current: Some("tok1".into()), ..Default::default() };
        let before = register.clone();

        assert_eq!(register.reassign(StageLabel::Current, "tok1"), Reassignment::Unchanged);
        assert_eq!(register, before);
    }

    #[test]
    fn test_promote_previous_back_to_current() {
        let mut register = LabelRegister {
            current: Some("v2".into()),
            pending: None,
            previous: Some("v1".into()),
        };

        register.reassign(StageLabel::Current, "v1");

        assert_eq!(register.current.as_deref(), Some("v1"));
        assert_eq!(register.previous.as_deref(), Some("v2"));
        assert_eq!(register.labels_of("v1"), vec![StageLabel::Current]);
    }

    #[test]
    fn test_as_map_groups_labels_by_version() {
        let register = LabelRegister {
            current: Some("v1".into()),
            pending: Some("v2".into()),
            previous: None,
        };
        let map = register.as_map();
        assert_eq!(map.get("v1"), Some(&vec![StageLabel::Current]));
        assert_eq!(map.get("v2"), Some(&vec![StageLabel::Pending]));
        assert_eq!(map.len(), 2);
    }
}
