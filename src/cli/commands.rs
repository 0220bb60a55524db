//! Command dispatch

use std::collections::BTreeMap;
use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, ParamsCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{DeployStep, ServiceDefinition};
use crate::infrastructure::di::ServiceContainer;

/// Load settings for this invocation: config layers plus CLI flags.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let settings = Settings::load(cli.config.as_deref())?
        .with_overrides(cli.region.clone(), cli.parameter_path.clone());
    debug!("settings: {:?}", settings);
    Ok(settings)
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Deploy => cmd_deploy(load_settings(cli)?),
        Commands::Plan => cmd_plan(load_settings(cli)?),
        Commands::Status => cmd_status(load_settings(cli)?),
        Commands::Converge { service } => cmd_converge(load_settings(cli)?, service),
        Commands::Params { command } => match command {
            ParamsCommands::Extract { outfile, export } => {
                let mut settings = load_settings(cli)?;
                settings.parameters.export |= *export;
                cmd_params_extract(settings, outfile.as_deref())
            }
            ParamsCommands::Print => cmd_params_print(load_settings(cli)?),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                output::info(&load_settings(cli)?.to_toml()?);
                Ok(())
            }
            ConfigCommands::Template => {
                output::info(&Settings::template());
                Ok(())
            }
            ConfigCommands::Path => {
                let path = global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine config directory".into())
                })?;
                println!("{}", path.display());
                Ok(())
            }
        },
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

#[instrument(skip_all)]
fn cmd_deploy(settings: Settings) -> CliResult<()> {
    let container = ServiceContainer::new(settings);
    let report = container.deploy_service().run();

    output::header(&format!("deploy on {}", report.host));
    for outcome in &report.outcomes {
        output::step(outcome);
    }

    let outcomes = report.into_result()?;
    output::success(&format!("{} steps completed", outcomes.len()));
    Ok(())
}

fn service_node(service: &ServiceDefinition) -> Tree<String> {
    let mut node = Tree::new(format!("{} ({})", service.name, service.role));
    for file in service.definition_files() {
        node.push(format!(
            "install {} -> {}",
            file.display(),
            service.install_dir.display()
        ));
    }
    let policy = service.policy;
    if policy.skip_if_active {
        node.push(format!("skip if {} is active", service.restart_target()));
    }
    if policy.enable {
        node.push(format!("enable {}", service.restart_target()));
    }
    node.push(format!("restart {}", service.restart_target()));
    if policy.verify_active {
        node.push(format!("verify {} is active", service.unit_name));
    }
    node
}

fn cmd_plan(settings: Settings) -> CliResult<()> {
    let env_file = settings.env_file_path();
    let app_dir = settings.app_dir.clone();
    let mode = settings.dependencies.mode;
    let container = ServiceContainer::new(settings);
    let deploy = container.deploy_service();
    let services = deploy.services();

    let mut root = Tree::new("deploy".to_string());
    for (i, step) in deploy.plan().iter().enumerate() {
        let label = format!("{}. {}", i + 1, step);
        let node = match step {
            DeployStep::Dependencies => Tree::new(label)
                .with_leaves([format!("{:?} install in {}", mode, app_dir.display())]),
            DeployStep::Parameters => {
                Tree::new(label).with_leaves([format!("write {}", env_file.display())])
            }
            DeployStep::Service { name, .. } => match services.iter().find(|s| &s.name == name) {
                Some(service) => {
                    let mut node = service_node(service);
                    node.root = label;
                    node
                }
                None => Tree::new(label),
            },
        };
        root.push(node);
    }

    output::info(&root);
    Ok(())
}

fn cmd_status(settings: Settings) -> CliResult<()> {
    let container = ServiceContainer::new(settings);
    let services = container.deploy_service().services();

    for service in &services {
        let mut units = vec![service.unit_name.as_str()];
        if let Some(timer) = &service.timer_name {
            units.push(timer);
        }
        for unit in units {
            let state = container.manager.is_active(unit)?;
            output::unit_state(unit, state);
        }
    }
    Ok(())
}

#[instrument(skip(settings))]
fn cmd_converge(settings: Settings, name: &str) -> CliResult<()> {
    let container = ServiceContainer::new(settings);
    let services = container.deploy_service().services();
    let service = services
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| {
            let known: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
            CliError::InvalidArgs(format!(
                "unknown service {name:?} (known: {})",
                known.join(", ")
            ))
        })?;

    let action = container.lifecycle_service().converge(service)?;
    output::success(&format!("{}: {:?}", service.name, action));
    Ok(())
}

fn cmd_params_extract(settings: Settings, outfile: Option<&std::path::Path>) -> CliResult<()> {
    let export = settings.parameters.export;
    let container = ServiceContainer::new(settings);
    let params = container.parameter_service();
    let set = params.fetch()?;

    match outfile {
        Some(path) => {
            params.write(&set, path)?;
            output::success(&format!("{} variables -> {}", set.len(), path.display()));
        }
        None => output::info(&set.render(export)),
    }
    Ok(())
}

fn cmd_params_print(settings: Settings) -> CliResult<()> {
    let named: BTreeMap<_, _> = settings.named_parameters().collect();
    let json = serde_json::to_string_pretty(&named)
        .map_err(|e| CliError::Usage(format!("serialize named parameters: {e}")))?;
    println!("{json}");
    Ok(())
}
