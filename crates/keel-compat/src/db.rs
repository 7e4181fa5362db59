use serde::{Deserialize, Serialize};
use thiserror::Error;

use keel_profile::DeviceId;

use crate::entry::{CompatibilityEntry, DeviceClass};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("malformed compatibility database: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Global policy knobs that are database content, not engine constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbPolicy {
    /// Wake-state floor applied when a device's entry does not carry its own
    /// `MinWakeState` quirk.
    pub default_min_wake_state: u64,
}

impl Default for DbPolicy {
    fn default() -> Self {
        Self {
            default_min_wake_state: 3,
        }
    }
}

/// The loaded database: declaration-ordered rows plus policy. Immutable
/// after construction; no write path exists at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityDb {
    #[serde(default)]
    policy: DbPolicy,
    entries: Vec<CompatibilityEntry>,
}

impl CompatibilityDb {
    pub fn new(policy: DbPolicy, entries: Vec<CompatibilityEntry>) -> Self {
        Self { policy, entries }
    }

    pub fn from_entries(entries: Vec<CompatibilityEntry>) -> Self {
        Self::new(DbPolicy::default(), entries)
    }

    /// Decode the collaborator-supplied JSON form.
    pub fn from_json(raw: &str) -> Result<Self, DbError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn policy(&self) -> &DbPolicy {
        &self.policy
    }

    pub fn entries(&self) -> &[CompatibilityEntry] {
        &self.entries
    }

    /// Most specific entry matching `id`: exact match beats the smallest
    /// enclosing family range beats a vendor wildcard; remaining ties go to
    /// the first-declared row.
    pub fn lookup(&self, id: DeviceId) -> Option<&CompatibilityEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.matcher.matches(id))
            .min_by_key(|(index, e)| {
                let (rank, range) = e.matcher.specificity();
                (rank, range, *index)
            })
            .map(|(_, e)| e)
    }

    /// Like [`CompatibilityDb::lookup`], restricted to one device class.
    pub fn lookup_class(&self, id: DeviceId, class: DeviceClass) -> Option<&CompatibilityEntry> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.class == class && e.matcher.matches(id))
            .min_by_key(|(index, e)| {
                let (rank, range) = e.matcher.specificity();
                (rank, range, *index)
            })
            .map(|(_, e)| e)
    }
}
