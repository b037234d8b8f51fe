use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use permatrix_matrix::{
    Action, EditedRole, MatrixConfig, MatrixSession, Module, Page, Permission, PermissionCatalog,
    PermissionId, RoleId,
};

const ACTIONS: [Action; 6] = Action::ALL;

/// `modules` modules of 4 pages each; every page has one row per action,
/// each depending on the page's view row.
fn build_catalog(modules: usize) -> Arc<PermissionCatalog> {
    let mut next = 0u64;
    let tree = (0..modules)
        .map(|m| {
            let mut module = Module::new(format!("m{m}"), format!("Module {m}"));
            for p in 0..4 {
                let mut page = Page::new(format!("m{m}.p{p}"), format!("Page {p}"));
                let view = next;
                for action in ACTIONS {
                    let mut permission =
                        Permission::new(next, format!("m{m}.p{p}.{action}"), action);
                    if next != view {
                        permission = permission.depends_on(view);
                    }
                    page = page.with_permission(permission);
                    next += 1;
                }
                module = module.with_page(page);
            }
            module
        })
        .collect();

    Arc::new(PermissionCatalog::from_modules(tree).expect("generated catalog is valid"))
}

fn open(catalog: &Arc<PermissionCatalog>) -> MatrixSession {
    MatrixSession::open(
        Arc::clone(catalog),
        EditedRole::new(RoleId::new(), "bench"),
        Vec::<PermissionId>::new(),
        Vec::<PermissionId>::new(),
        &MatrixConfig::default(),
    )
    .expect("empty selection is consistent")
}

fn bench_toggle_module(c: &mut Criterion) {
    let mut group = c.benchmark_group("toggle_module");
    for modules in [2usize, 8, 16] {
        let catalog = build_catalog(modules);
        group.bench_with_input(BenchmarkId::from_parameter(catalog.len()), &catalog, |b, catalog| {
            b.iter(|| {
                let mut session = open(catalog);
                session.toggle_module("m0").expect("select");
                session.toggle_module("m0").expect("deselect");
                black_box(session.explicit().len())
            })
        });
    }
    group.finish();
}

fn bench_full_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("view");
    for modules in [2usize, 8, 16] {
        let catalog = build_catalog(modules);
        let mut session = open(&catalog);
        for m in (0..modules).step_by(2) {
            session.toggle_module(&format!("m{m}")).expect("select");
        }
        group.bench_with_input(BenchmarkId::from_parameter(catalog.len()), &session, |b, session| {
            b.iter(|| black_box(session.view()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_toggle_module, bench_full_view);
criterion_main!(benches);
