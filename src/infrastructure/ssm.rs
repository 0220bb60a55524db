//! AWS SSM Parameter Store driven through the `aws` CLI
//!
//! Calls `aws ssm get-parameters-by-path` / `aws ssm get-parameter` with
//! decryption and JSON output, following `NextToken` until exhausted.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::domain::Parameter;
use crate::infrastructure::traits::{CommandRunner, ParameterStore};
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawParameter {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParametersPage {
    #[serde(default)]
    parameters: Vec<RawParameter>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SingleParameter {
    parameter: RawParameter,
}

impl From<RawParameter> for Parameter {
    fn from(raw: RawParameter) -> Self {
        Parameter::new(raw.name, raw.value)
    }
}

/// `ParameterStore` backed by the `aws` CLI.
pub struct AwsCliParameterStore {
    cmd: Arc<dyn CommandRunner>,
    program: String,
}

impl AwsCliParameterStore {
    pub fn new(cmd: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            cmd,
            program: program.into(),
        }
    }

    fn run_json<T: for<'de> Deserialize<'de>>(&self, args: &[&str]) -> InfraResult<T> {
        // Arguments carry no secrets; output does and is never logged
        debug!("{} {}", self.program, args.join(" "));
        let output = self
            .cmd
            .run(&self.program, args)
            .map_err(|e| InfraError::io(format!("run {}", self.program), e))?;

        if !output.status.success() {
            return Err(InfraError::command(
                format!("{} {}", self.program, args[..2.min(args.len())].join(" ")),
                &output,
            ));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| InfraError::Parse {
            program: self.program.clone(),
            message: e.to_string(),
        })
    }
}

impl ParameterStore for AwsCliParameterStore {
    fn get_parameters_by_path(&self, path: &str, region: &str) -> InfraResult<Vec<Parameter>> {
        let mut parameters = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut args = vec![
                "ssm",
                "get-parameters-by-path",
                "--path",
                path,
                "--region",
                region,
                "--no-recursive",
                "--with-decryption",
                "--output",
                "json",
            ];
            if let Some(token) = next_token.as_deref() {
                args.extend(["--starting-token", token]);
            }

            let page: ParametersPage = self.run_json(&args)?;
            debug!(
                "get_parameters_by_path: path={}, page_size={}",
                path,
                page.parameters.len()
            );
            parameters.extend(page.parameters.into_iter().map(Parameter::from));

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(parameters)
    }

    fn get_parameter(&self, name: &str, region: &str) -> InfraResult<Parameter> {
        let args = [
            "ssm",
            "get-parameter",
            "--name",
            name,
            "--region",
            region,
            "--with-decryption",
            "--output",
            "json",
        ];
        let single: SingleParameter = self.run_json(&args)?;
        Ok(single.parameter.into())
    }
}
