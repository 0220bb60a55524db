//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{
    DeployService, LifecycleService, ParameterService, UnitInstaller,
};
use crate::config::Settings;
use crate::infrastructure::pip::PipInstaller;
use crate::infrastructure::ssm::AwsCliParameterStore;
use crate::infrastructure::systemd::SystemctlManager;
use crate::infrastructure::traits::{
    CommandRunner, DependencyInstaller, FileSystem, ParameterStore, RealCommandRunner,
    RealFileSystem, ServiceManager,
};

/// Container holding the I/O boundaries every service is built from.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Parameter store client
    pub store: Arc<dyn ParameterStore>,

    /// Service manager client
    pub manager: Arc<dyn ServiceManager>,

    /// Runtime dependency installer
    pub installer: Arc<dyn DependencyInstaller>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let cmd: Arc<dyn CommandRunner> = Arc::new(RealCommandRunner);
        let store = Arc::new(AwsCliParameterStore::new(
            cmd.clone(),
            settings.parameters.aws_cli.clone(),
        ));
        let manager = Arc::new(SystemctlManager::new(cmd.clone(), settings.systemctl.clone()));
        let installer = Arc::new(PipInstaller::new(
            cmd,
            &settings.python_env_dir,
            settings.dependencies.requirements_file.clone(),
        ));

        Self::with_deps(settings, Arc::new(RealFileSystem), store, manager, installer)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn ParameterStore>,
        manager: Arc<dyn ServiceManager>,
        installer: Arc<dyn DependencyInstaller>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            store,
            manager,
            installer,
        }
    }

    pub fn parameter_service(&self) -> ParameterService {
        ParameterService::new(self.fs.clone(), self.store.clone(), self.settings.clone())
    }

    pub fn unit_installer(&self) -> UnitInstaller {
        UnitInstaller::new(self.fs.clone(), self.manager.clone())
    }

    pub fn lifecycle_service(&self) -> LifecycleService {
        LifecycleService::new(self.unit_installer(), self.manager.clone())
    }

    pub fn deploy_service(&self) -> DeployService {
        DeployService::new(
            self.settings.clone(),
            self.installer.clone(),
            self.parameter_service(),
            self.lifecycle_service(),
        )
    }
}
