/// Integration tests for the configuration system
///
/// These tests verify loading from files and environment variables, and that a loaded
/// configuration changes how a goal resolves.

use rsolv_goal::config::{ConfigLoader, ConfigSource, GoalConfig, CONFIG_FILE};
use rsolv_goal::{Goal, GoalActions, GoalError, Package, Universe, DEFAULT_PRIORITY};
use std::env;
use std::fs;
use tempfile::TempDir;

fn pkg(name: &str, evr: &str) -> Package {
    Package::parse(name, evr, "x86_64").unwrap()
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(false);

    let config = loader.load(dir.path()).unwrap();
    assert_eq!(config, GoalConfig::default());
    assert_eq!(loader.source_of("installonly-limit", dir.path()), ConfigSource::Default);
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{
            "installonlypkgs": ["kernel"],
            "installonly-limit": 2,
            "protected-packages": ["sudo", "glibc"],
            "best": true,
            "clean-requirements-on-remove": true,
            "debug-solver-dir": "debugdata"
        }"#,
    )
    .unwrap();

    let loader = ConfigLoader::new(false);
    let config = loader.load(dir.path()).unwrap();

    assert_eq!(config.installonlypkgs, vec!["kernel"]);
    assert_eq!(config.installonly_limit, 2);
    assert_eq!(config.protected_packages, vec!["sudo", "glibc"]);
    assert!(config.best);
    assert!(config.clean_requirements_on_remove);
    assert!(config.allow_vendor_change);
    assert_eq!(config.debug_solver_dir.as_deref(), Some(std::path::Path::new("debugdata")));
    assert_eq!(
        loader.source_of("best", dir.path()),
        ConfigSource::File(dir.path().join(CONFIG_FILE))
    );
}

#[test]
fn test_invalid_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE), r#"{"installonly-limit": "many"}"#).unwrap();

    let loader = ConfigLoader::new(false);
    match loader.load(dir.path()) {
        Err(GoalError::Config(message)) => assert!(message.starts_with("Failed to parse")),
        other => panic!("expected a config error, got {:?}", other),
    }
}

#[test]
fn test_environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE), r#"{"installonly-limit": 2, "best": true}"#).unwrap();

    env::set_var("RSOLV_INSTALLONLY_LIMIT", "5");
    env::set_var("RSOLV_PROTECTED_PACKAGES", "sudo, dnf");
    env::set_var("RSOLV_BEST", "false");

    let with_env = ConfigLoader::new(true).load(dir.path());
    let source = ConfigLoader::new(true).source_of("installonly-limit", dir.path());
    let without_env = ConfigLoader::new(false).load(dir.path());

    env::set_var("RSOLV_INSTALLONLY_LIMIT", "lots");
    let invalid = ConfigLoader::new(true).load(dir.path());

    env::remove_var("RSOLV_INSTALLONLY_LIMIT");
    env::remove_var("RSOLV_PROTECTED_PACKAGES");
    env::remove_var("RSOLV_BEST");

    let config = with_env.unwrap();
    assert_eq!(config.installonly_limit, 5);
    assert_eq!(config.protected_packages, vec!["sudo", "dnf"]);
    assert!(!config.best);
    assert_eq!(source, ConfigSource::Environment("RSOLV_INSTALLONLY_LIMIT".to_string()));

    let config = without_env.unwrap();
    assert_eq!(config.installonly_limit, 2);
    assert!(config.best);

    assert!(matches!(invalid, Err(GoalError::Config(_))));
}

#[test]
fn test_config_protects_installed_packages() {
    let mut universe = Universe::new();
    universe.add_repo("fedora", DEFAULT_PRIORITY);
    let sudo = universe.add_installed(pkg("sudo", "1.9-1"));

    let config = GoalConfig {
        protected_packages: vec!["sudo".to_string()],
        kernel_release: Some("0.0-0.none".to_string()),
        ..GoalConfig::default()
    };
    config.apply(&mut universe);

    let mut goal = Goal::with_config(&universe, &config).unwrap();
    assert!(goal.protected().has(sudo));

    goal.erase(sudo, config.erase_flags());
    assert!(matches!(
        goal.run(GoalActions::empty()),
        Err(GoalError::RemovalOfProtectedPackage)
    ));
}

#[test]
fn test_config_best_forces_best_candidate() {
    let mut universe = Universe::new();
    let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
    let a = universe.add_package(repo, pkg("a", "2-1").with_requires("missing".parse().unwrap()));
    universe.add_package(repo, pkg("a", "1-1"));

    let mut sltr = rsolv_goal::Selector::new();
    sltr.set(rsolv_goal::FilterKey::Name, rsolv_goal::Comparison::EQ, "a")
        .unwrap();

    let lenient = GoalConfig::default();
    let mut goal = Goal::with_config(&universe, &lenient).unwrap();
    goal.install_selector(&sltr, false).unwrap();
    goal.run(GoalActions::empty()).unwrap();
    assert_eq!(goal.list_installs().unwrap().len(), 1);
    assert!(!goal.list_installs().unwrap().contains(&a));

    let strict = GoalConfig {
        best: true,
        ..GoalConfig::default()
    };
    let mut goal = Goal::with_config(&universe, &strict).unwrap();
    goal.install_selector(&sltr, false).unwrap();
    assert!(matches!(goal.run(GoalActions::empty()), Err(GoalError::NoSolutionPossible)));
    assert!(goal.has_actions(GoalActions::FORCE_BEST));
}
