//! Tests for DeployService: end-to-end pipeline with in-memory boundaries

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use drones_deploy::application::ApplicationError;
use drones_deploy::config::{DependencyMode, Settings};
use drones_deploy::domain::{fleet, DeployStep, ServiceRole, ServiceState, StepStatus};
use drones_deploy::infrastructure::di::ServiceContainer;
use drones_deploy::infrastructure::traits::RealFileSystem;
use drones_deploy::util::testing::{
    FakeDependencyInstaller, FakeParameterStore, FakeServiceManager,
};

/// Lay out an app checkout with every unit template, a secrets dir and a
/// unit dir under `root`.
fn test_settings(root: &Path) -> Settings {
    let mut settings = Settings {
        app_dir: root.join("drones"),
        python_env_dir: root.join("drones-env"),
        secrets_dir: root.join("drones-secrets"),
        unit_dir: root.join("systemd"),
        ..Settings::default()
    };
    settings.parameters.path = Some("/drones/prod".into());
    settings.parameters.named.clear();

    fs::create_dir_all(settings.units_source_dir()).unwrap();
    fs::create_dir_all(&settings.unit_dir).unwrap();
    for service in fleet(&settings.units_source_dir(), &settings.unit_dir, true) {
        for file in service.definition_files() {
            fs::write(&file, format!("# {}\n", service.name)).unwrap();
        }
    }
    settings
}

fn store() -> FakeParameterStore {
    FakeParameterStore::new()
        .with_parameter("/drones/prod", "DRONES_DB_URI", "postgres://db/drones")
        .with_parameter("/drones/prod", "REDIS_URL", "redis://localhost:6379/0")
}

fn container(
    settings: Settings,
    store: FakeParameterStore,
    manager: &Arc<FakeServiceManager>,
    installer: &Arc<FakeDependencyInstaller>,
) -> ServiceContainer {
    ServiceContainer::with_deps(
        settings,
        Arc::new(RealFileSystem),
        Arc::new(store),
        manager.clone(),
        installer.clone(),
    )
}

// ============================================================
// plan() tests
// ============================================================

#[test]
fn given_defaults_when_plan_then_fixed_order() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(FakeServiceManager::new());
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(test_settings(temp.path()), store(), &manager, &installer);

    let steps: Vec<String> = c
        .deploy_service()
        .plan()
        .iter()
        .map(|s| s.to_string())
        .collect();

    assert_eq!(
        steps,
        vec![
            "install-dependencies",
            "fetch-parameters",
            "cache:drones-redis",
            "primary:drones",
            "companion:drones-statistics",
            "companion:drones-reports",
            "companion:drones-journal-rules",
        ]
    );
}

#[test]
fn given_cache_disabled_when_plan_then_no_cache_step() {
    let temp = TempDir::new().unwrap();
    let mut settings = test_settings(temp.path());
    settings.deploy_cache = false;
    let manager = Arc::new(FakeServiceManager::new());
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(settings, store(), &manager, &installer);

    let plan = c.deploy_service().plan();

    assert!(!plan.iter().any(|s| matches!(
        s,
        DeployStep::Service {
            role: ServiceRole::Cache,
            ..
        }
    )));
    assert_eq!(plan.len(), 6);
}

// ============================================================
// run() tests
// ============================================================

#[test]
fn given_fresh_host_when_run_then_every_step_succeeds_in_order() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = test_settings(temp.path());
    let env_file = settings.env_file_path();
    let app_dir = settings.app_dir.clone();
    let manager = Arc::new(FakeServiceManager::new());
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(settings, store(), &manager, &installer);

    // Act
    let report = c.deploy_service().run();

    // Assert
    assert!(report.is_success(), "failure: {:?}", report.failure);
    assert!(report.finished_at.is_some());
    assert_eq!(report.outcomes.len(), 7);
    assert!(report
        .outcomes
        .iter()
        .all(|o| matches!(o.status, StepStatus::Succeeded(_))));
    assert_eq!(installer.calls(), vec![(app_dir, DependencyMode::Locked)]);
    assert_eq!(
        fs::read_to_string(&env_file).unwrap(),
        "DRONES_DB_URI=postgres://db/drones\nREDIS_URL=redis://localhost:6379/0\n"
    );
    let restarts: Vec<_> = manager
        .mutating_calls()
        .into_iter()
        .filter(|c| c.starts_with("restart"))
        .collect();
    assert_eq!(
        restarts,
        vec![
            "restart drones-redis.service",
            "restart drones.service",
            "restart drones-statistics.timer",
            "restart drones-reports.timer",
            "restart drones-journal-rules.timer",
        ]
    );
    assert_eq!(manager.state("drones.service"), ServiceState::Active);
}

#[test]
fn given_running_cache_when_run_then_cache_skipped_and_rest_continues() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(
        FakeServiceManager::new().with_state("drones-redis.service", ServiceState::Active),
    );
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(test_settings(temp.path()), store(), &manager, &installer);

    let report = c.deploy_service().run();

    assert!(report.is_success());
    assert!(matches!(report.outcomes[2].status, StepStatus::Skipped(_)));
    assert!(!manager
        .mutating_calls()
        .iter()
        .any(|c| c.ends_with("drones-redis.service")));
    assert_eq!(report.outcomes.len(), 7);
}

#[test]
fn given_unreachable_store_when_run_then_halts_before_any_service() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = test_settings(temp.path());
    let env_file = settings.env_file_path();
    let manager = Arc::new(FakeServiceManager::new());
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(
        settings,
        FakeParameterStore::new().unreachable(),
        &manager,
        &installer,
    );

    // Act
    let report = c.deploy_service().run();

    // Assert
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.failed_step().unwrap().step, DeployStep::Parameters);
    assert!(manager.calls().is_empty());
    assert!(!env_file.exists());
    assert!(matches!(
        report.into_result(),
        Err(ApplicationError::Fetch { .. })
    ));
}

#[test]
fn given_failing_dependency_install_when_run_then_nothing_else_happens() {
    let temp = TempDir::new().unwrap();
    let settings = test_settings(temp.path());
    let env_file = settings.env_file_path();
    let manager = Arc::new(FakeServiceManager::new());
    let installer = Arc::new(FakeDependencyInstaller::failing());
    let c = container(settings, store(), &manager, &installer);

    let report = c.deploy_service().run();

    assert_eq!(report.outcomes.len(), 1);
    assert!(matches!(
        report.failure,
        Some(ApplicationError::Dependencies { .. })
    ));
    assert!(!env_file.exists());
    assert!(manager.calls().is_empty());
}

#[test]
fn given_reload_refused_when_run_then_halts_before_restart() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(FakeServiceManager::new().failing_reload());
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(test_settings(temp.path()), store(), &manager, &installer);

    let report = c.deploy_service().run();

    assert!(matches!(report.failure, Some(ApplicationError::Reload { .. })));
    assert_eq!(report.outcomes.len(), 3);
    assert!(!manager.calls().iter().any(|c| c.starts_with("restart")));
}

#[test]
fn given_primary_fails_to_start_when_run_then_companions_untouched() {
    let temp = TempDir::new().unwrap();
    let manager = Arc::new(FakeServiceManager::new().stuck("drones.service"));
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(test_settings(temp.path()), store(), &manager, &installer);

    let report = c.deploy_service().run();

    assert_eq!(
        report.failed_step().unwrap().step.to_string(),
        "primary:drones"
    );
    assert!(!manager
        .calls()
        .iter()
        .any(|c| c.contains("drones-statistics")));
}

#[test]
fn given_completed_deploy_when_run_again_then_succeeds_with_same_env_file() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let settings = test_settings(temp.path());
    let env_file = settings.env_file_path();
    let manager = Arc::new(FakeServiceManager::new());
    let installer = Arc::new(FakeDependencyInstaller::new());
    let c = container(settings, store(), &manager, &installer);

    // Act
    let first = c.deploy_service().run();
    let content_after_first = fs::read_to_string(&env_file).unwrap();
    let second = c.deploy_service().run();

    // Assert
    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(fs::read_to_string(&env_file).unwrap(), content_after_first);
    // Second run finds the cache active and leaves it alone
    assert!(matches!(second.outcomes[2].status, StepStatus::Skipped(_)));
}
