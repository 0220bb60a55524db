//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, ServiceManager, etc.)
//! but are themselves concrete structs, not traits.

mod deploy;
mod lifecycle;
mod parameters;
mod units;

pub use deploy::{DeployService, RunReport};
pub use lifecycle::{LifecycleAction, LifecycleService};
pub use parameters::{MaterializedEnv, ParameterService, ENV_FILE_MODE};
pub use units::{InstalledUnit, UnitInstaller, UNIT_FILE_MODE};
