//! drones-deploy: converge a single host to the current release.
//!
//! Layers, innermost first:
//! - [`domain`]: fleet table, parameters, service states
//! - [`application`]: deploy pipeline and its services
//! - [`infrastructure`]: systemd, parameter store, pip, filesystem
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
