//! Revision ledger entries for persisted credential definitions.

use crate::domain::CredentialsDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point in a definition's history.
///
/// Versions are per-name monotonic counters starting at 1, incremented by
/// exactly one per mutation and never reused, even across delete/recreate
/// cycles; the ledger is append-only. A revision with no `account` encodes a
/// deletion at that version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Revision version, unique and increasing per definition name
    pub version: u64,
    /// When this revision was made
    pub timestamp: DateTime<Utc>,
    /// The definition stored at this revision; `None` for a deletion
    pub account: Option<CredentialsDefinition>,
    /// Who made this revision, when known
    pub user: Option<String>,
}

impl Revision {
    /// Construct a revision for a stored definition
    pub fn of(
        version: u64,
        timestamp: DateTime<Utc>,
        account: CredentialsDefinition,
        user: Option<String>,
    ) -> Self {
        Self { version, timestamp, account: Some(account), user }
    }

    /// Construct a revision recording a deletion
    pub fn deletion(version: u64, timestamp: DateTime<Utc>, user: Option<String>) -> Self {
        Self { version, timestamp, account: None, user }
    }

    /// Whether this revision records a deletion
    pub fn is_deletion(&self) -> bool {
        self.account.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_revision() {
        let revision = Revision::deletion(3, Utc::now(), Some("ops".into()));
        assert!(revision.is_deletion());
        assert_eq!(revision.version, 3);
        assert_eq!(revision.user.as_deref(), Some("ops"));
    }

    #[test]
    fn test_definition_revision() {
        let definition = CredentialsDefinition::new("acct", "aws");
        let revision = Revision::of(1, Utc::now(), definition.clone(), None);
        assert!(!revision.is_deletion());
        assert_eq!(revision.account, Some(definition));
    }
}
