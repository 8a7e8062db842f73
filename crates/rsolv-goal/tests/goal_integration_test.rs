//! End-to-end goal tests: staging, solving, listings and diagnostics

use std::rc::Rc;

use rsolv_evr::Relation;
use rsolv_goal::solver::TESTCASE_FILE;
use rsolv_goal::{
    Comparison, EventType, FilterKey, Goal, GoalActions, GoalError, JobFlags, MemorySink, Package,
    PackageId, PackageSet, PackageState, Reason, SelectorError, Selector, Solver, Testcase, Universe,
    DEFAULT_PRIORITY,
};

fn pkg(name: &str, evr: &str) -> Package {
    Package::parse(name, evr, "x86_64").unwrap()
}

fn rel(s: &str) -> Relation {
    Relation::parse(s).unwrap()
}

fn nevras(universe: &Universe, ids: &[PackageId]) -> Vec<String> {
    let mut names: Vec<String> = ids.iter().map(|&id| universe.package(id).unwrap().nevra()).collect();
    names.sort();
    names
}

fn name_selector(name: &str) -> Selector {
    let mut sltr = Selector::new();
    sltr.set(FilterKey::Name, Comparison::EQ, name).unwrap();
    sltr
}

fn kernel(version: &str) -> Package {
    Package::parse("kernel", version, "x86_64").unwrap()
}

fn kernel_universe(release: Option<&str>) -> (Universe, PackageId) {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(kernel("6.1-1"));
    universe.add_installed(kernel("6.2-1"));
    let new = universe.add_package(repo, kernel("6.3-1"));
    universe.set_installonly(vec!["kernel".to_string()], 2);
    universe.set_kernel_release(release.map(str::to_string));
    (universe, new)
}

#[test]
fn test_multiple_match_values_rejected() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_package(repo, pkg("a", "1-1"));
    universe.add_package(repo, pkg("b", "1-1"));

    let mut sltr = name_selector("a");
    sltr.set(FilterKey::Name, Comparison::EQ, "b").unwrap();

    let mut goal = Goal::new(&universe);
    let result = goal.install_selector(&sltr, false);
    assert!(matches!(
        result,
        Err(GoalError::IllFormedSelector(SelectorError::MultipleMatchObjects))
    ));
    assert_eq!(goal.job_length(), 0);
}

#[test]
fn test_optional_filters_only_rejected() {
    let universe = Universe::new();
    let mut sltr = Selector::new();
    sltr.set(FilterKey::Arch, Comparison::EQ, "x86_64").unwrap();

    let mut goal = Goal::new(&universe);
    assert!(matches!(
        goal.erase_selector(&sltr, JobFlags::empty()),
        Err(GoalError::IllFormedSelector(SelectorError::MissingRequiredFilter))
    ));
}

#[test]
fn test_install_staged_twice_listed_once() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let a = universe.add_package(repo, pkg("a", "1-1"));

    let mut goal = Goal::new(&universe);
    goal.install(a, false);
    goal.install_selector(&name_selector("a"), false).unwrap();
    assert_eq!(goal.job_length(), 2);

    goal.run(GoalActions::empty()).unwrap();
    assert_eq!(goal.list_installs().unwrap(), vec![a]);
}

#[test]
fn test_installonly_limit_erases_oldest() {
    let (universe, new) = kernel_universe(None);
    let sink = Rc::new(MemorySink::new());

    let mut goal = Goal::with_sink(&universe, sink.clone());
    goal.install(new, false);
    goal.run(GoalActions::empty()).unwrap();

    assert!(sink.has(EventType::InstallonlyLimited));
    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["kernel-6.1-1.x86_64"]);
    assert_eq!(goal.list_installs().unwrap(), vec![new]);
}

#[test]
fn test_installonly_limit_spares_running_kernel() {
    let (universe, new) = kernel_universe(Some("6.1-1.x86_64"));

    let mut goal = Goal::new(&universe);
    goal.install(new, false);
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["kernel-6.2-1.x86_64"]);
    assert!(goal.protected().has(1));
}

#[test]
fn test_installonly_limit_spares_kernel_dependents() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let running = universe.add_installed(
        Package::parse("kernel-core", "6.2-1", "x86_64")
            .unwrap()
            .with_provides(rel("kernel-uname-r = 6.2-1.x86_64")),
    );
    universe.add_installed(kernel("6.1-1").with_requires(rel("kernel-uname-r = 6.2-1.x86_64")));
    universe.add_installed(kernel("6.2-1"));
    let new = universe.add_package(repo, kernel("6.3-1"));
    universe.set_installonly(vec!["kernel".to_string()], 2);
    universe.set_kernel_release(Some("6.2-1.x86_64".to_string()));
    assert_eq!(universe.running_kernel(), Some(running));

    let mut goal = Goal::new(&universe);
    goal.install(new, false);
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["kernel-6.2-1.x86_64"]);
}

#[test]
fn test_upgrade_all_installonly_respects_limit() {
    let (universe, new) = kernel_universe(None);

    let mut goal = Goal::new(&universe);
    goal.upgrade_all();
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(goal.list_installs().unwrap(), vec![new]);
    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["kernel-6.1-1.x86_64"]);
    assert!(goal.list_upgrades().unwrap().is_empty());
}

#[test]
fn test_upgrade_all_installonly_with_allow_uninstall() {
    let (universe, new) = kernel_universe(None);

    let mut goal = Goal::new(&universe);
    goal.upgrade_all();
    goal.run(GoalActions::ALLOW_UNINSTALL).unwrap();

    assert_eq!(goal.list_installs().unwrap(), vec![new]);
    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["kernel-6.1-1.x86_64"]);
}

#[test]
fn test_upgrade_installonly_package() {
    let (universe, new) = kernel_universe(None);

    let mut goal = Goal::new(&universe);
    goal.upgrade(new);
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(goal.list_installs().unwrap(), vec![new]);
    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["kernel-6.1-1.x86_64"]);
}

#[test]
fn test_upgrade_selector_installonly_package() {
    let (universe, new) = kernel_universe(Some("6.1-1.x86_64"));

    let mut goal = Goal::new(&universe);
    goal.upgrade_selector(&name_selector("kernel")).unwrap();
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(goal.list_installs().unwrap(), vec![new]);
    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["kernel-6.2-1.x86_64"]);
}

#[test]
fn test_upgrade_installonly_without_newer_build() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(kernel("6.1-1"));
    universe.add_installed(kernel("6.3-1"));
    universe.add_package(repo, kernel("6.2-1"));
    universe.set_installonly(vec!["kernel".to_string()], 3);

    let mut goal = Goal::new(&universe);
    goal.upgrade_all();
    goal.run(GoalActions::empty()).unwrap();

    assert!(goal.transaction().unwrap().is_empty());
}

#[test]
fn test_erasing_protected_package_fails() {
    let mut universe = Universe::new();
    universe.add_repo("fedora", DEFAULT_PRIORITY);
    let sudo = universe.add_installed(pkg("sudo", "1.9-1"));

    let sink = Rc::new(MemorySink::new());
    let mut goal = Goal::with_sink(&universe, sink.clone());
    goal.add_protected(&[sudo].into_iter().collect());
    goal.erase(sudo, JobFlags::empty());

    assert!(matches!(
        goal.run(GoalActions::empty()),
        Err(GoalError::RemovalOfProtectedPackage)
    ));
    assert!(sink.has(EventType::ProtectedRemoval));
    assert!(goal.removal_of_protected().has(sudo));
    assert_eq!(goal.list_erasures().unwrap(), vec![sudo]);

    assert_eq!(goal.count_problems(), 1);
    assert_eq!(
        goal.describe_problem_rules(0).unwrap(),
        vec!["The operation would result in removing the following protected packages: sudo".to_string()]
    );
}

#[test]
fn test_protected_obsoleted_package_fails() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let old = universe.add_installed(pkg("old", "1-1"));
    let new = universe.add_package(repo, pkg("new", "1-1").with_obsoletes(rel("old")));

    let mut goal = Goal::new(&universe);
    goal.set_protected([old].into_iter().collect());
    goal.install(new, false);

    assert!(matches!(
        goal.run(GoalActions::empty()),
        Err(GoalError::RemovalOfProtectedPackage)
    ));
    assert!(goal.transaction().is_some());
    assert_eq!(goal.list_obsoleted().unwrap(), vec![old]);
}

#[test]
fn test_protected_package_with_broken_dependency_is_described() {
    let mut universe = Universe::new();
    universe.add_repo("fedora", DEFAULT_PRIORITY);
    let p = universe.add_installed(pkg("p", "1-1").with_requires(rel("lib")));
    let lib = universe.add_installed(pkg("lib", "1-1"));

    let mut goal = Goal::new(&universe);
    goal.set_protected([p].into_iter().collect());
    goal.erase(lib, JobFlags::empty());

    assert!(matches!(
        goal.run(GoalActions::ALLOW_UNINSTALL),
        Err(GoalError::NoSolutionPossible)
    ));
    assert!(goal.removal_of_protected().is_empty());
    assert_eq!(goal.count_problems(), 1);
    assert_eq!(
        goal.describe_problem_rules(0).unwrap(),
        vec!["The operation would result in removing the following protected packages: p".to_string()]
    );
}

#[test]
fn test_listings_are_disjoint() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(pkg("a", "1-1"));
    let b = universe.add_installed(pkg("b", "1-1"));
    let gone = universe.add_installed(pkg("gone", "1-1"));
    let a2 = universe.add_package(repo, pkg("a", "2-1"));
    let c = universe.add_package(repo, pkg("c", "1-1").with_obsoletes(rel("b")));
    let d = universe.add_package(repo, pkg("d", "1-1"));

    let mut goal = Goal::new(&universe);
    goal.upgrade_all();
    goal.install(c, false);
    goal.install(d, false);
    goal.erase(gone, JobFlags::empty());
    goal.run(GoalActions::empty()).unwrap();

    let installs = goal.list_installs().unwrap();
    let erasures = goal.list_erasures().unwrap();
    let upgrades = goal.list_upgrades().unwrap();

    assert_eq!(nevras(&universe, &installs), vec!["c-1-1.x86_64", "d-1-1.x86_64"]);
    assert_eq!(erasures, vec![gone]);
    assert_eq!(upgrades, vec![a2]);
    for id in &installs {
        assert!(!erasures.contains(id) && !upgrades.contains(id));
    }
    assert!(!erasures.iter().any(|id| upgrades.contains(id)));

    assert_eq!(goal.list_obsoleted().unwrap(), vec![b]);
    assert_eq!(goal.list_obsoleted_by_package(c).unwrap(), vec![b]);
    for obsoleted in goal.list_obsoleted().unwrap() {
        assert!(installs
            .iter()
            .chain(&upgrades)
            .any(|&id| goal.list_obsoleted_by_package(id).unwrap().contains(&obsoleted)));
    }
    assert!(goal.list_downgrades().unwrap().is_empty());
    assert!(goal.list_reinstalls().unwrap().is_empty());
}

#[test]
fn test_distupgrade_all_empty_universe() {
    let universe = Universe::new();
    let mut goal = Goal::new(&universe);
    goal.distupgrade_all().unwrap();
    assert_eq!(goal.job_length(), 0);
    assert!(goal.has_actions(GoalActions::DISTUPGRADE_ALL));

    goal.run(GoalActions::empty()).unwrap();
    assert!(goal.transaction().unwrap().is_empty());
    assert!(goal.list_installs().unwrap().is_empty());
    assert!(goal.list_erasures().unwrap().is_empty());
}

#[test]
fn test_upgrade_all_picks_newest_httpd() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(pkg("httpd", "2.2-1"));
    let newest = universe.add_package(repo, pkg("httpd", "2.4-1"));
    universe.add_package(repo, pkg("httpd", "2.2-1"));

    let mut goal = Goal::new(&universe);
    goal.upgrade_all();
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(goal.list_upgrades().unwrap(), vec![newest]);
    assert!(goal.list_erasures().unwrap().is_empty());
}

#[test]
fn test_distupgrade_package_syncs_to_repo_version() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(pkg("a", "2-1"));
    let b = universe.add_installed(pkg("b", "1-1"));
    let older = universe.add_package(repo, pkg("a", "1-1"));
    universe.add_package(repo, pkg("b", "2-1"));

    let mut goal = Goal::new(&universe);
    goal.distupgrade(older);
    assert!(goal.has_actions(GoalActions::DISTUPGRADE));
    assert!(!goal.has_actions(GoalActions::DISTUPGRADE_ALL));
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(goal.list_downgrades().unwrap(), vec![older]);
    assert!(goal.list_upgrades().unwrap().is_empty());
    assert!(!goal.transaction().unwrap().contains(b));
}

#[test]
fn test_distupgrade_selector() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(pkg("a", "1-1"));
    let a2 = universe.add_package(repo, pkg("a", "2-1"));

    let mut goal = Goal::new(&universe);
    goal.distupgrade_selector(&name_selector("a")).unwrap();
    assert_eq!(goal.job_length(), 1);
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(goal.list_upgrades().unwrap(), vec![a2]);
    assert!(goal.list_erasures().unwrap().is_empty());
}

#[test]
fn test_force_best_flag() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let a1 = universe.add_package(repo, pkg("a", "1-1"));
    universe.add_package(repo, pkg("a", "2-1").with_requires(rel("missing")));

    let mut goal = Goal::new(&universe);
    goal.install_selector(&name_selector("a"), false).unwrap();
    goal.run(GoalActions::empty()).unwrap();
    assert_eq!(goal.list_installs().unwrap(), vec![a1]);

    assert!(matches!(goal.run(GoalActions::FORCE_BEST), Err(GoalError::NoSolutionPossible)));
    assert!(goal.has_actions(GoalActions::FORCE_BEST));
}

#[test]
fn test_user_installed_is_never_unneeded() {
    let mut universe = Universe::new();
    universe.add_repo("fedora", DEFAULT_PRIORITY);
    let a = universe.add_installed(pkg("a", "1-1"));
    let b = universe.add_installed(pkg("b", "1-1"));
    let c = universe.add_installed(pkg("c", "1-1"));

    let mut plain = Goal::new(&universe);
    plain.run(GoalActions::empty()).unwrap();
    let unneeded = plain.list_unneeded().unwrap();
    assert!(unneeded.has(a) && unneeded.has(b) && unneeded.has(c));

    let mut goal = Goal::new(&universe);
    goal.user_installed(a);
    goal.user_installed_set(&[b, c].into_iter().collect());
    assert_eq!(goal.job_length(), 3);
    goal.run(GoalActions::empty()).unwrap();

    assert!(goal.list_unneeded().unwrap().is_empty());
    assert!(goal.transaction().unwrap().is_empty());
}

#[test]
fn test_install_older_version_downgrades() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(pkg("a", "2-1"));
    let older = universe.add_package(repo, pkg("a", "1-1"));

    let mut goal = Goal::new(&universe);
    goal.install(older, false);
    assert!(goal.has_actions(GoalActions::ALLOW_DOWNGRADE));
    goal.run(GoalActions::empty()).unwrap();
    assert_eq!(goal.list_downgrades().unwrap(), vec![older]);
}

#[test]
fn test_cleandeps_reason_and_unneeded() {
    let mut universe = Universe::new();
    universe.add_repo("fedora", DEFAULT_PRIORITY);
    let app = universe.add_installed(pkg("app", "1-1").with_requires(rel("lib")));
    let lib = universe.add_installed(pkg("lib", "1-1"));
    let tool = universe.add_installed(pkg("tool", "1-1"));
    let orphan = universe.add_installed(pkg("orphan", "1-1"));

    let mut goal = Goal::new(&universe);
    goal.erase(app, JobFlags::CLEANDEPS);
    goal.user_installed_set(&[tool].into_iter().collect());
    goal.run(GoalActions::empty()).unwrap();

    assert_eq!(nevras(&universe, &goal.list_erasures().unwrap()), vec!["app-1-1.x86_64", "lib-1-1.x86_64"]);
    assert_eq!(goal.get_reason(lib), Reason::Clean);
    assert_eq!(goal.get_reason(app), Reason::User);

    let unneeded = goal.list_unneeded().unwrap();
    assert!(unneeded.has(orphan));
    assert!(!unneeded.has(tool));
}

#[test]
fn test_allow_uninstall_flag_permits_dependent_removal() {
    let mut universe = Universe::new();
    universe.add_repo("fedora", DEFAULT_PRIORITY);
    universe.add_installed(pkg("app", "1-1").with_requires(rel("lib")));
    let lib = universe.add_installed(pkg("lib", "1-1"));

    let mut goal = Goal::new(&universe);
    goal.erase(lib, JobFlags::empty());
    assert!(matches!(goal.run(GoalActions::empty()), Err(GoalError::NoSolutionPossible)));
    assert!(goal.count_problems() > 0);

    goal.run(GoalActions::ALLOW_UNINSTALL).unwrap();
    assert_eq!(goal.list_erasures().unwrap().len(), 2);
}

#[test]
fn test_ignore_weak_reports_failed_optional_install() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let broken = universe.add_package(repo, pkg("broken", "1-1").with_requires(rel("missing")));

    let mut goal = Goal::new(&universe);
    goal.install(broken, true);
    goal.run(GoalActions::empty()).unwrap();
    assert!(goal.list_installs().unwrap().is_empty());

    assert!(matches!(goal.run(GoalActions::IGNORE_WEAK), Err(GoalError::NoSolutionPossible)));
    assert!(goal.list_broken_dependency_pkgs(PackageState::Available).has(broken));
    assert!(goal.list_conflict_pkgs(PackageState::All).is_empty());
}

#[test]
fn test_debugdata_round_trip() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let a = universe.add_package(repo, pkg("a", "1-1").with_requires(rel("b")));
    universe.add_package(repo, pkg("b", "1-1"));

    let mut goal = Goal::new(&universe);
    assert!(matches!(goal.write_debugdata("unused"), Err(GoalError::Internal(_))));

    goal.install(a, false);
    goal.run(GoalActions::empty()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = goal.write_debugdata(dir.path().join("debug")).unwrap();
    assert!(written.is_absolute());
    assert!(written.join(TESTCASE_FILE).exists());

    let testcase = Testcase::read(&written).unwrap();
    let replay_universe = testcase.to_universe().unwrap();
    let replay_job = testcase.to_job(&replay_universe).unwrap();
    let mut solver = Solver::with_flags(&replay_universe, testcase.flags);
    assert!(solver.solve(&replay_job));

    let result = testcase.result.unwrap();
    assert_eq!(result.transaction.len(), 2);
    assert!(result.problems.is_empty());
}

#[test]
fn test_debugdata_unwritable_dir() {
    let mut universe = Universe::new();
    universe.add_repo("fedora", DEFAULT_PRIORITY);

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("occupied");
    std::fs::write(&file, "not a directory").unwrap();

    let mut goal = Goal::new(&universe);
    goal.run(GoalActions::empty()).unwrap();
    match goal.write_debugdata(&file) {
        Err(GoalError::DebugData { message, source }) => {
            assert!(message.starts_with("failed writing debugdata to"));
            assert!(source.is_some());
        }
        other => panic!("unexpected result: {:?}", other.map(|p| p.display().to_string())),
    }
}

#[test]
fn test_rerun_rebuilds_from_staging() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let a = universe.add_package(repo, pkg("a", "1-1"));

    let mut goal = Goal::new(&universe);
    goal.install(a, false);
    goal.run(GoalActions::empty()).unwrap();
    goal.run(GoalActions::VERIFY).unwrap();

    assert!(goal.has_actions(GoalActions::VERIFY));
    assert_eq!(goal.job_length(), 1);
    assert_eq!(goal.list_installs().unwrap(), vec![a]);

    let copy = goal.clone();
    assert!(copy.transaction().is_none());
    assert_eq!(copy.protected(), &PackageSet::new());
}
