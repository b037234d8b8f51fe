//! Output handed to the persistence consumer on save.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use permatrix_core::{PermissionId, RoleId, SessionId};

/// Final explicit grants of the edited role.
///
/// `explicit` is sorted and never contains inherited permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    pub role_id: RoleId,
    pub session_id: SessionId,
    pub explicit: Vec<PermissionId>,
    pub version: u64,
    pub captured_at: DateTime<Utc>,
}

impl SelectionSnapshot {
    pub fn explicit_set(&self) -> BTreeSet<PermissionId> {
        self.explicit.iter().copied().collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Grants added and removed relative to the persisted state (audit trail).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDiff {
    pub granted: BTreeSet<PermissionId>,
    pub revoked: BTreeSet<PermissionId>,
}

impl SelectionDiff {
    pub fn between(before: &BTreeSet<PermissionId>, after: &BTreeSet<PermissionId>) -> Self {
        Self {
            granted: after.difference(before).copied().collect(),
            revoked: before.difference(after).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> BTreeSet<PermissionId> {
        raw.iter().copied().map(PermissionId::new).collect()
    }

    #[test]
    fn diff_splits_granted_and_revoked() {
        let diff = SelectionDiff::between(&ids(&[1, 2, 3]), &ids(&[2, 3, 4, 5]));
        assert_eq!(diff.granted, ids(&[4, 5]));
        assert_eq!(diff.revoked, ids(&[1]));
        assert!(SelectionDiff::between(&ids(&[7]), &ids(&[7])).is_empty());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let snapshot = SelectionSnapshot {
            role_id: RoleId::new(),
            session_id: SessionId::new(),
            explicit: vec![PermissionId::new(1), PermissionId::new(2)],
            version: 3,
            captured_at: Utc::now(),
        };
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["explicit"], serde_json::json!([1, 2]));
        assert_eq!(value["version"], 3);
        assert!(value.get("capturedAt").is_some());
        assert!(value.get("roleId").is_some());
    }
}
