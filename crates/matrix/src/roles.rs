use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use permatrix_core::RoleId;

/// Role code (e.g. "buyer", "warehouse.lead").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCode(Cow<'static, str>);

impl RoleCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role whose grants an editing session changes.
///
/// `parent` is informational: inherited grants are computed by the role
/// hierarchy outside this crate and passed in as a plain set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedRole {
    pub id: RoleId,
    pub code: RoleCode,
    pub parent: Option<RoleCode>,
}

impl EditedRole {
    pub fn new(id: RoleId, code: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id,
            code: RoleCode::new(code),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<Cow<'static, str>>) -> Self {
        self.parent = Some(RoleCode::new(parent));
        self
    }
}
