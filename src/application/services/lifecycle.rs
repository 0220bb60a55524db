//! Per-service lifecycle decisions
//!
//! Decides whether a service is left alone (skip-if-active) or installed,
//! optionally enabled, and restarted.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::services::units::{InstalledUnit, UnitInstaller};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ServiceDefinition, ServiceState};
use crate::infrastructure::traits::ServiceManager;
use crate::infrastructure::InfraError;

/// What the controller did with a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Already active under a skip-if-active policy
    Skipped { state: ServiceState },
    /// Definitions installed and restart target restarted
    Restarted { installed: Vec<InstalledUnit> },
}

/// Brings one service to "running with the latest definition".
pub struct LifecycleService {
    installer: UnitInstaller,
    manager: Arc<dyn ServiceManager>,
}

fn lifecycle_error(service: &ServiceDefinition, action: &str, e: InfraError) -> ApplicationError {
    ApplicationError::Lifecycle {
        service: service.name.clone(),
        action: action.to_string(),
        exit_code: e.exit_code(),
        status: e.to_string(),
    }
}

impl LifecycleService {
    pub fn new(installer: UnitInstaller, manager: Arc<dyn ServiceManager>) -> Self {
        Self { installer, manager }
    }

    /// Execute the minimal action for `service`.
    pub fn converge(&self, service: &ServiceDefinition) -> ApplicationResult<LifecycleAction> {
        let target = service.restart_target();
        let state = self
            .manager
            .is_active(target)
            .map_err(|e| lifecycle_error(service, "is-active", e))?;
        debug!("converge: {} is {}", target, state);

        if service.policy.skip_if_active && state.is_active() {
            warn!("{} is already active, leaving it untouched", target);
            return Ok(LifecycleAction::Skipped { state });
        }

        let installed = self
            .installer
            .install(&service.definition_files(), &service.install_dir)?;

        if service.policy.enable {
            self.manager
                .enable(target)
                .map_err(|e| lifecycle_error(service, "enable", e))?;
            debug!("converge: enabled {}", target);
        }

        self.manager
            .restart(target)
            .map_err(|e| lifecycle_error(service, "restart", e))?;
        info!("restarted {}", target);

        if service.policy.verify_active {
            self.verify_active(service)?;
        }

        Ok(LifecycleAction::Restarted { installed })
    }

    /// Liveness sanity check after a restart.
    fn verify_active(&self, service: &ServiceDefinition) -> ApplicationResult<()> {
        let status = self
            .manager
            .status(&service.unit_name)
            .map_err(|e| lifecycle_error(service, "status", e))?;

        if !status.state.is_active() {
            return Err(ApplicationError::Lifecycle {
                service: service.name.clone(),
                action: "status".into(),
                status: status.summary,
                exit_code: status.exit_code,
            });
        }
        info!("{}: {}", service.unit_name, status.summary);
        Ok(())
    }
}
