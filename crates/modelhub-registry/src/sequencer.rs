//! Version label sequencing
//!
//! Labels have the form `v<N>` with `N >= 1`. The first version of a branch is
//! `v1` and every commit takes the successor of the branch's latest label.
//! Storage backends evaluate [`next_label`] inside the same transaction that
//! inserts the version, so the read and the write see the same state.

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    error::{RegistryError, Result},
    storage::MetadataStore,
};

/// A parsed `v<N>` version label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionLabel(u64);

impl VersionLabel {
    pub const FIRST: VersionLabel = VersionLabel(1);

    pub fn new(number: u64) -> Result<Self> {
        if number == 0 {
            return Err(RegistryError::MalformedLabel("v0".to_string()));
        }
        Ok(Self(number))
    }

    pub fn number(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Result<Self> {
        self.0
            .checked_add(1)
            .map(VersionLabel)
            .ok_or_else(|| RegistryError::MalformedLabel(format!("{} has no successor", self)))
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionLabel {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix('v')
            .ok_or_else(|| RegistryError::MalformedLabel(s.to_string()))?;

        // u64::from_str accepts a leading '+', labels do not
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RegistryError::MalformedLabel(s.to_string()));
        }

        let number = digits
            .parse::<u64>()
            .map_err(|_| RegistryError::MalformedLabel(s.to_string()))?;

        if number == 0 {
            return Err(RegistryError::MalformedLabel(s.to_string()));
        }

        Ok(Self(number))
    }
}

/// Label following `latest`, or `v1` for an empty branch
pub fn next_label(latest: Option<&str>) -> Result<VersionLabel> {
    match latest {
        None => Ok(VersionLabel::FIRST),
        Some(label) => label.parse::<VersionLabel>()?.next(),
    }
}

/// Read-only preview of the label the next registration on `branch_id` would
/// receive. Concurrent registrations may claim it first.
pub async fn peek_next_label(store: &dyn MetadataStore, branch_id: Uuid) -> Result<VersionLabel> {
    let latest = store.latest_label(branch_id).await?;
    next_label(latest.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_branch_starts_at_v1() {
        assert_eq!(next_label(None).unwrap().to_string(), "v1");
    }

    #[test]
    fn test_increment() {
        assert_eq!(next_label(Some("v1")).unwrap().to_string(), "v2");
        assert_eq!(next_label(Some("v9")).unwrap().to_string(), "v10");
        assert_eq!(next_label(Some("v41")).unwrap().number(), 42);
    }

    #[test]
    fn test_malformed_labels_are_rejected() {
        for bad in ["", "v", "1", "V1", "v-1", "v+1", "v1.0", "latest", "v0", "v 1"] {
            match next_label(Some(bad)) {
                Err(RegistryError::MalformedLabel(label)) => assert_eq!(label, bad),
                other => panic!("Expected MalformedLabel for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_overflow_is_malformed() {
        let last = format!("v{}", u64::MAX);
        assert!(matches!(
            next_label(Some(&last)),
            Err(RegistryError::MalformedLabel(_))
        ));
    }

    #[test]
    fn test_ordering_is_numeric() {
        let v2: VersionLabel = "v2".parse().unwrap();
        let v10: VersionLabel = "v10".parse().unwrap();
        assert!(v2 < v10);
        assert!(VersionLabel::new(0).is_err());
    }
}
