//! Module → page → permission tree, validated once and then read-only.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use permatrix_core::{Entity, PermissionId};

use crate::config::MatrixConfig;
use crate::permission::{Permission, Prerequisite};

/// A screen within a module, holding its permission rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_code: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Page {
    pub fn new(page_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            page_code: page_code.into(),
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn permission_ids(&self) -> impl Iterator<Item = PermissionId> + '_ {
        self.permissions.iter().map(|p| p.id)
    }
}

impl Entity for Page {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.page_code
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// A functional area (projects, ECN, procurement, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub module_code: String,
    pub name: String,
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Module {
    pub fn new(module_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module_code: module_code.into(),
            name: name.into(),
            pages: Vec::new(),
        }
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.pages.push(page);
        self
    }

    pub fn page(&self, page_code: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.page_code == page_code)
    }

    /// Every permission id across all pages of the module.
    pub fn permission_ids(&self) -> impl Iterator<Item = PermissionId> + '_ {
        self.pages.iter().flat_map(Page::permission_ids)
    }
}

impl Entity for Module {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.module_code
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog payload could not be parsed: {0}")]
    Parse(String),

    #[error("duplicate module code '{0}'")]
    DuplicateModule(String),

    #[error("duplicate page code '{page}' in module '{module}'")]
    DuplicatePage { module: String, page: String },

    #[error("duplicate permission id {0}")]
    DuplicatePermissionId(PermissionId),

    #[error("duplicate permission code '{0}'")]
    DuplicatePermissionCode(String),

    #[error("dependency map references unknown permission {0}")]
    UnknownDependent(PermissionId),

    #[error("permission {permission} depends on unknown permission {missing}")]
    DanglingDependency {
        permission: PermissionId,
        missing: PermissionId,
    },

    #[error("permission {0} depends on itself")]
    SelfDependency(PermissionId),

    #[error("dependency cycle detected: {path:?}")]
    DependencyCycle { path: Vec<PermissionId> },

    #[error("dependency chain of permission {permission} is {depth} deep (max {max})")]
    ChainTooDeep {
        permission: PermissionId,
        depth: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    module: usize,
    page: usize,
    permission: usize,
}

/// Immutable permission catalog for one editing session.
///
/// # Invariants
/// - Permission ids and codes are unique across the whole catalog.
/// - Module codes are unique; page codes are unique within their module.
/// - Every prerequisite exists, and prerequisite chains are acyclic (and no
///   deeper than the configured maximum, when one is set).
#[derive(Debug, Clone)]
pub struct PermissionCatalog {
    modules: Vec<Module>,
    index: HashMap<PermissionId, Slot>,
    dependents: HashMap<PermissionId, BTreeSet<PermissionId>>,
}

impl PermissionCatalog {
    /// Validate a module tree using the default configuration.
    pub fn from_modules(modules: Vec<Module>) -> Result<Self, CatalogError> {
        CatalogBuilder::new(modules).build()
    }

    /// Parse a JSON array of modules as supplied by the catalog provider.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        CatalogBuilder::from_json(json)?.build()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: PermissionId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn permission(&self, id: PermissionId) -> Option<&Permission> {
        let slot = self.index.get(&id)?;
        Some(&self.modules[slot.module].pages[slot.page].permissions[slot.permission])
    }

    pub fn prerequisite_of(&self, id: PermissionId) -> Option<PermissionId> {
        self.permission(id).and_then(Permission::prerequisite_id)
    }

    /// Direct dependents of `id` (static reverse edges, independent of selection).
    pub fn dependents_of(&self, id: PermissionId) -> impl Iterator<Item = PermissionId> + '_ {
        self.dependents.get(&id).into_iter().flatten().copied()
    }

    pub fn module(&self, module_code: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.module_code == module_code)
    }

    pub fn page(&self, module_code: &str, page_code: &str) -> Option<&Page> {
        self.module(module_code)?.page(page_code)
    }

    /// All pages with the given code, across modules.
    ///
    /// Page codes are only unique within a module, so this may return more
    /// than one match.
    pub fn pages_named(&self, page_code: &str) -> Vec<(&Module, &Page)> {
        self.modules
            .iter()
            .filter_map(|m| m.page(page_code).map(|p| (m, p)))
            .collect()
    }

    pub fn all_permission_ids(&self) -> impl Iterator<Item = PermissionId> + '_ {
        self.modules.iter().flat_map(Module::permission_ids)
    }

    pub fn permissions(&self) -> impl Iterator<Item = &Permission> + '_ {
        self.modules
            .iter()
            .flat_map(|m| m.pages.iter())
            .flat_map(|p| p.permissions.iter())
    }
}

/// Assembles and validates a [`PermissionCatalog`].
///
/// The dependency map, when supplied separately from the tree, overrides the
/// `dependsOnId` carried by individual permissions.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    modules: Vec<Module>,
    dependencies: BTreeMap<PermissionId, PermissionId>,
    max_chain_depth: Option<usize>,
}

impl CatalogBuilder {
    pub fn new(modules: Vec<Module>) -> Self {
        Self {
            modules,
            dependencies: BTreeMap::new(),
            max_chain_depth: MatrixConfig::default().max_chain_depth,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let modules: Vec<Module> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Ok(Self::new(modules))
    }

    pub fn with_config(mut self, config: &MatrixConfig) -> Self {
        self.max_chain_depth = config.max_chain_depth;
        self
    }

    pub fn with_dependency(mut self, dependent: PermissionId, prerequisite: PermissionId) -> Self {
        self.dependencies.insert(dependent, prerequisite);
        self
    }

    pub fn with_dependencies<I>(mut self, map: I) -> Self
    where
        I: IntoIterator<Item = (PermissionId, PermissionId)>,
    {
        self.dependencies.extend(map);
        self
    }

    pub fn build(mut self) -> Result<PermissionCatalog, CatalogError> {
        let index = index_tree(&self.modules)?;

        for (dependent, prerequisite) in &self.dependencies {
            let slot = index
                .get(dependent)
                .ok_or(CatalogError::UnknownDependent(*dependent))?;
            self.modules[slot.module].pages[slot.page].permissions[slot.permission].prerequisite =
                Prerequisite::DependsOn(*prerequisite);
        }

        let mut dependents: HashMap<PermissionId, BTreeSet<PermissionId>> = HashMap::new();
        let mut prerequisites: HashMap<PermissionId, PermissionId> = HashMap::new();
        for permission in self.modules.iter().flat_map(|m| &m.pages).flat_map(|p| &p.permissions) {
            let Some(target) = permission.prerequisite_id() else {
                continue;
            };
            if target == permission.id {
                return Err(CatalogError::SelfDependency(target));
            }
            if !index.contains_key(&target) {
                return Err(CatalogError::DanglingDependency {
                    permission: permission.id,
                    missing: target,
                });
            }
            prerequisites.insert(permission.id, target);
            dependents.entry(target).or_default().insert(permission.id);
        }

        check_chains(&prerequisites, self.max_chain_depth)?;

        tracing::debug!(
            modules = self.modules.len(),
            permissions = index.len(),
            dependencies = prerequisites.len(),
            "permission catalog built"
        );

        Ok(PermissionCatalog {
            modules: self.modules,
            index,
            dependents,
        })
    }
}

fn index_tree(modules: &[Module]) -> Result<HashMap<PermissionId, Slot>, CatalogError> {
    let mut index = HashMap::new();
    let mut module_codes = HashSet::new();
    let mut permission_codes = HashSet::new();

    for (mi, module) in modules.iter().enumerate() {
        if !module_codes.insert(module.module_code.as_str()) {
            return Err(CatalogError::DuplicateModule(module.module_code.clone()));
        }
        let mut page_codes = HashSet::new();
        for (pi, page) in module.pages.iter().enumerate() {
            if !page_codes.insert(page.page_code.as_str()) {
                return Err(CatalogError::DuplicatePage {
                    module: module.module_code.clone(),
                    page: page.page_code.clone(),
                });
            }
            for (xi, permission) in page.permissions.iter().enumerate() {
                let slot = Slot {
                    module: mi,
                    page: pi,
                    permission: xi,
                };
                if index.insert(permission.id, slot).is_some() {
                    return Err(CatalogError::DuplicatePermissionId(permission.id));
                }
                if !permission_codes.insert(permission.code.as_str()) {
                    return Err(CatalogError::DuplicatePermissionCode(
                        permission.code.as_str().to_string(),
                    ));
                }
            }
        }
    }

    Ok(index)
}

/// Walk every chain upwards, rejecting cycles and, when capped, over-deep chains.
fn check_chains(
    prerequisites: &HashMap<PermissionId, PermissionId>,
    max_depth: Option<usize>,
) -> Result<(), CatalogError> {
    // Depth of every permission already proven to sit on a finite chain.
    let mut depth: HashMap<PermissionId, usize> = HashMap::new();

    let mut starts: Vec<PermissionId> = prerequisites.keys().copied().collect();
    starts.sort();

    for start in starts {
        let mut path = vec![start];
        let mut on_path = HashSet::from([start]);
        let mut current = start;

        let base = loop {
            match prerequisites.get(&current) {
                None => break 0,
                Some(next) => {
                    if let Some(known) = depth.get(next) {
                        break *known + 1;
                    }
                    if !on_path.insert(*next) {
                        let from = path.iter().position(|id| id == next).unwrap_or(0);
                        let mut cycle = path[from..].to_vec();
                        cycle.push(*next);
                        return Err(CatalogError::DependencyCycle { path: cycle });
                    }
                    path.push(*next);
                    current = *next;
                }
            }
        };

        // `path` runs from `start` up to `current`; `current` has depth `base`.
        for (offset, id) in path.iter().rev().enumerate() {
            let d = base + offset;
            if let Some(max) = max_depth.filter(|max| d > *max) {
                return Err(CatalogError::ChainTooDeep {
                    permission: *id,
                    depth: d,
                    max,
                });
            }
            depth.insert(*id, d);
        }
    }

    Ok(())
}
