use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use permatrix_core::{DomainError, Entity, PermissionId};

/// Human-readable permission code (e.g. "ecn.change.approve").
///
/// Codes are unique across the catalog; the numeric [`PermissionId`] is what
/// the engine keys on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of operation a permission grants.
///
/// Only used for display ordering; the variant order is the row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Approve,
    Export,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::Approve,
        Action::Export,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Export => "export",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown action '{s}'")))
    }
}

/// Direct prerequisite of a permission.
///
/// A permission has at most one prerequisite, so dependencies form chains
/// rather than a general graph. On the wire this is the optional
/// `dependsOnId` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<PermissionId>", into = "Option<PermissionId>")]
pub enum Prerequisite {
    #[default]
    NoDependency,
    DependsOn(PermissionId),
}

impl Prerequisite {
    pub fn target(self) -> Option<PermissionId> {
        match self {
            Prerequisite::NoDependency => None,
            Prerequisite::DependsOn(id) => Some(id),
        }
    }
}

impl From<Option<PermissionId>> for Prerequisite {
    fn from(value: Option<PermissionId>) -> Self {
        value.map_or(Prerequisite::NoDependency, Prerequisite::DependsOn)
    }
}

impl From<Prerequisite> for Option<PermissionId> {
    fn from(value: Prerequisite) -> Self {
        value.target()
    }
}

/// A single grantable permission (one checkbox row in the matrix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: PermissionId,
    pub code: PermissionCode,
    pub action: Action,
    #[serde(default, rename = "dependsOnId")]
    pub prerequisite: Prerequisite,
    #[serde(default)]
    pub description: String,
}

impl Permission {
    pub fn new(id: impl Into<PermissionId>, code: impl Into<Cow<'static, str>>, action: Action) -> Self {
        Self {
            id: id.into(),
            code: PermissionCode::new(code),
            action,
            prerequisite: Prerequisite::NoDependency,
            description: String::new(),
        }
    }

    pub fn depends_on(mut self, prerequisite: impl Into<PermissionId>) -> Self {
        self.prerequisite = Prerequisite::DependsOn(prerequisite.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn prerequisite_id(&self) -> Option<PermissionId> {
        self.prerequisite.target()
    }
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn label(&self) -> &str {
        self.code.as_str()
    }
}
