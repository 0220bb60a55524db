//! Deployment orchestration
//!
//! Runs the fixed pipeline: runtime dependencies, parameters, cache,
//! primary service, companions. The first failing step stops the run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::application::services::lifecycle::{LifecycleAction, LifecycleService};
use crate::application::services::parameters::ParameterService;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{fleet, DeployStep, ServiceDefinition, StepOutcome, StepStatus};
use crate::infrastructure::traits::DependencyInstaller;

/// Ordered outcomes of one run plus the error that stopped it, if any.
#[derive(Debug)]
pub struct RunReport {
    pub host: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<StepOutcome>,
    pub failure: Option<ApplicationError>,
}

impl RunReport {
    fn start() -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".into());
        Self {
            host,
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The step that stopped the run.
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.outcomes.iter().find(|o| o.is_failure())
    }

    /// Split into outcomes and the first failure.
    pub fn into_result(self) -> ApplicationResult<Vec<StepOutcome>> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.outcomes),
        }
    }
}

/// The orchestrator.
pub struct DeployService {
    settings: Arc<Settings>,
    installer: Arc<dyn DependencyInstaller>,
    parameters: ParameterService,
    lifecycle: LifecycleService,
}

impl DeployService {
    pub fn new(
        settings: Arc<Settings>,
        installer: Arc<dyn DependencyInstaller>,
        parameters: ParameterService,
        lifecycle: LifecycleService,
    ) -> Self {
        Self {
            settings,
            installer,
            parameters,
            lifecycle,
        }
    }

    /// Services of this run, in deployment order.
    pub fn services(&self) -> Vec<ServiceDefinition> {
        fleet(
            &self.settings.units_source_dir(),
            &self.settings.unit_dir,
            self.settings.deploy_cache,
        )
    }

    /// Steps of this run, in execution order.
    pub fn plan(&self) -> Vec<DeployStep> {
        let mut steps = vec![DeployStep::Dependencies, DeployStep::Parameters];
        steps.extend(self.services().into_iter().map(|s| DeployStep::Service {
            name: s.name,
            role: s.role,
        }));
        steps
    }

    /// Run every step in order, stopping at the first failure.
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::start();
        let services = self.services();
        let steps = self.plan();
        let total = steps.len();
        info!("deploying {} steps on {}", total, report.host);

        for (i, step) in steps.into_iter().enumerate() {
            let index = i + 1;
            info!("[{}/{}] {}", index, total, step);

            match self.execute(&step, &services) {
                Ok(status) => {
                    match &status {
                        StepStatus::Skipped(reason) => {
                            warn!("[{}/{}] {} skipped: {}", index, total, step, reason)
                        }
                        _ => info!("[{}/{}] {} done", index, total, step),
                    }
                    report.outcomes.push(StepOutcome {
                        index,
                        step,
                        status,
                    });
                }
                Err(e) => {
                    error!("[{}/{}] {} failed: {}", index, total, step, e);
                    report.outcomes.push(StepOutcome {
                        index,
                        step,
                        status: StepStatus::Failed(e.to_string()),
                    });
                    report.failure = Some(e);
                    break;
                }
            }
        }

        report.finished_at = Some(Utc::now());
        if report.is_success() {
            info!("deployment finished on {}", report.host);
        }
        report
    }

    fn execute(
        &self,
        step: &DeployStep,
        services: &[ServiceDefinition],
    ) -> ApplicationResult<StepStatus> {
        match step {
            DeployStep::Dependencies => {
                let mode = self.settings.dependencies.mode;
                self.installer
                    .install(&self.settings.app_dir, mode)
                    .map_err(|e| ApplicationError::Dependencies {
                        exit_code: e.exit_code(),
                        message: e.to_string(),
                    })?;
                Ok(StepStatus::Succeeded(format!("{mode:?} install").to_lowercase()))
            }
            DeployStep::Parameters => {
                let env = self.parameters.materialize()?;
                Ok(StepStatus::Succeeded(format!(
                    "{} variables -> {}",
                    env.variables,
                    env.path.display()
                )))
            }
            DeployStep::Service { name, .. } => {
                let service = services
                    .iter()
                    .find(|s| &s.name == name)
                    .ok_or_else(|| ApplicationError::Config {
                        message: format!("service not in fleet: {name}"),
                    })?;
                match self.lifecycle.converge(service)? {
                    LifecycleAction::Skipped { state } => Ok(StepStatus::Skipped(format!(
                        "{} already {}",
                        service.restart_target(),
                        state
                    ))),
                    LifecycleAction::Restarted { installed } => {
                        let changed = installed.iter().filter(|u| u.changed).count();
                        Ok(StepStatus::Succeeded(format!(
                            "restarted {} ({} of {} definitions changed)",
                            service.restart_target(),
                            changed,
                            installed.len()
                        )))
                    }
                }
            }
        }
    }
}
