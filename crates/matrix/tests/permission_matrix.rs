use std::collections::BTreeSet;
use std::sync::Arc;

use permatrix_matrix::{
    Action, EditedRole, GroupState, MatrixConfig, MatrixError, MatrixSession, Module, Page,
    Permission, PermissionCatalog, PermissionId, RoleId, RowState, SelectionSnapshot,
};

const VIEW_X: PermissionId = PermissionId::new(1);
const EDIT_X: PermissionId = PermissionId::new(2);
const A: PermissionId = PermissionId::new(10);
const B: PermissionId = PermissionId::new(11);

fn set(ids: &[PermissionId]) -> BTreeSet<PermissionId> {
    ids.iter().copied().collect()
}

fn catalog() -> anyhow::Result<Arc<PermissionCatalog>> {
    let catalog = PermissionCatalog::from_modules(vec![
        Module::new("ecn", "ECN Change Management").with_page(
            Page::new("ecn.changes", "Changes")
                .with_permission(Permission::new(VIEW_X, "VIEW_X", Action::View))
                .with_permission(Permission::new(EDIT_X, "EDIT_X", Action::Edit).depends_on(VIEW_X)),
        ),
        Module::new("proj", "Project Boards").with_page(
            Page::new("P", "Project Board")
                .with_permission(Permission::new(A, "A", Action::View))
                .with_permission(Permission::new(B, "B", Action::Create)),
        ),
    ])?;
    Ok(Arc::new(catalog))
}

fn session(inherited: &[PermissionId]) -> anyhow::Result<MatrixSession> {
    permatrix_observability::init_for_tests();
    Ok(MatrixSession::open(
        catalog()?,
        EditedRole::new(RoleId::new(), "engineer").with_parent("staff"),
        std::iter::empty::<PermissionId>(),
        inherited.iter().copied(),
        &MatrixConfig::default(),
    )?)
}

#[test]
fn selecting_a_dependent_grants_its_prerequisite() -> anyhow::Result<()> {
    let mut session = session(&[])?;
    session.toggle_permission(EDIT_X)?;
    assert_eq!(session.explicit(), &set(&[VIEW_X, EDIT_X]));
    Ok(())
}

#[test]
fn removing_a_prerequisite_in_use_is_refused() -> anyhow::Result<()> {
    let mut session = session(&[])?;
    session.toggle_permission(EDIT_X)?;

    let err = session.toggle_permission(VIEW_X).unwrap_err();
    assert_eq!(
        err,
        MatrixError::DependencyConflict {
            requested: set(&[VIEW_X]),
            blocking: set(&[EDIT_X]),
        }
    );
    assert_eq!(session.explicit(), &set(&[VIEW_X, EDIT_X]));
    Ok(())
}

#[test]
fn removing_dependent_first_then_prerequisite_clears_selection() -> anyhow::Result<()> {
    let mut session = session(&[])?;
    session.toggle_permission(EDIT_X)?;
    assert!(session.toggle_permission(VIEW_X).is_err());

    session.toggle_permission(EDIT_X)?;
    session.toggle_permission(VIEW_X)?;
    assert!(session.explicit().is_empty());
    Ok(())
}

#[test]
fn page_toggle_skips_inherited_members() -> anyhow::Result<()> {
    let mut session = session(&[A])?;
    session.toggle_page("P")?;

    assert_eq!(session.explicit(), &set(&[B]));
    assert_eq!(session.group_state([A, B]), GroupState::All);
    assert_eq!(session.page_state("proj", "P")?, GroupState::All);
    assert_eq!(session.row_state(A), RowState::Inherited);
    assert_eq!(session.row_state(B), RowState::Selected);
    Ok(())
}

#[test]
fn toggling_an_inherited_permission_is_read_only() -> anyhow::Result<()> {
    let mut session = session(&[A])?;
    let err = session.toggle_permission(A).unwrap_err();
    assert_eq!(err, MatrixError::ReadOnlyPermission(A));
    assert!(session.explicit().is_empty());
    assert_eq!(session.inherited(), &set(&[A]));
    Ok(())
}

#[test]
fn projection_is_stable_between_mutations() -> anyhow::Result<()> {
    let mut session = session(&[])?;
    session.toggle_permission(VIEW_X)?;
    let first = session.module_state("ecn")?;
    let second = session.module_state("ecn")?;
    assert_eq!(first, GroupState::Partial);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn catalog_from_provider_json_drives_a_session() -> anyhow::Result<()> {
    let json = r#"[
        {"moduleCode": "proc", "name": "Procurement", "pages": [
            {"pageCode": "proc.po", "name": "Purchase Orders", "permissions": [
                {"id": 100, "code": "proc.po.view", "action": "view"},
                {"id": 101, "code": "proc.po.create", "action": "create", "dependsOnId": 100},
                {"id": 102, "code": "proc.po.approve", "action": "approve", "dependsOnId": 101}
            ]}
        ]}
    ]"#;
    let catalog = Arc::new(PermissionCatalog::from_json(json)?);
    let role = EditedRole::new(RoleId::new(), "buyer");
    let mut session = MatrixSession::open(
        catalog,
        role.clone(),
        Vec::<PermissionId>::new(),
        Vec::<PermissionId>::new(),
        &MatrixConfig::default(),
    )?;

    session.toggle_permission(PermissionId::new(102))?;
    let snapshot = session.snapshot();

    let decoded: SelectionSnapshot = serde_json::from_str(&snapshot.to_json()?)?;
    assert_eq!(decoded.role_id, role.id);
    assert_eq!(
        decoded.explicit_set(),
        set(&[PermissionId::new(100), PermissionId::new(101), PermissionId::new(102)])
    );
    assert_eq!(
        decoded.explicit,
        vec![PermissionId::new(100), PermissionId::new(101), PermissionId::new(102)]
    );

    let view = serde_json::to_value(session.view())?;
    assert_eq!(view["modules"][0]["state"], "all");
    Ok(())
}
