use std::ffi::OsString;
use std::path::PathBuf;

use serde_json::json;
use tracing::debug;

use super::manager::CondaManager;
use super::outcome::{CommandGroup, CommandInfo, ExecutionOutcome};
use crate::config::Config;
use crate::Result;

/// One front-end request against an installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CondaCommand {
    Version,
    Envs,
    Create {
        name: String,
        force: bool,
        file: Option<PathBuf>,
        extra: Vec<String>,
    },
    Install(PackageRequest),
    Uninstall(PackageRequest),
    Update(PackageRequest),
    PipInstall(PackageRequest),
    PipUninstall(PackageRequest),
    Run {
        env: Option<String>,
        args: Vec<String>,
    },
    Vars {
        env: Option<String>,
    },
    Conda {
        args: Vec<String>,
    },
}

/// Packages to act on, optionally in a named environment instead of `base`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRequest {
    pub env: Option<String>,
    pub packages: Vec<String>,
}

impl CondaCommand {
    #[must_use]
    pub fn info(&self) -> CommandInfo {
        match self {
            Self::Version => CommandInfo::new(CommandGroup::Version, "version"),
            Self::Envs => CommandInfo::new(CommandGroup::Envs, "envs"),
            Self::Create { .. } => CommandInfo::new(CommandGroup::Create, "create"),
            Self::Install(_) => CommandInfo::new(CommandGroup::Install, "install"),
            Self::Uninstall(_) => CommandInfo::new(CommandGroup::Uninstall, "uninstall"),
            Self::Update(_) => CommandInfo::new(CommandGroup::Update, "update"),
            Self::PipInstall(_) => CommandInfo::new(CommandGroup::Pip, "install"),
            Self::PipUninstall(_) => CommandInfo::new(CommandGroup::Pip, "uninstall"),
            Self::Run { .. } => CommandInfo::new(CommandGroup::Run, "run"),
            Self::Vars { .. } => CommandInfo::new(CommandGroup::Vars, "vars"),
            Self::Conda { .. } => CommandInfo::new(CommandGroup::Conda, "conda"),
        }
    }
}

/// Opens the installation described by `config` and runs `command` against it.
/// Every failure, including bootstrap, is folded into the outcome.
#[must_use]
pub fn execute(config: &Config, command: &CondaCommand) -> ExecutionOutcome {
    match CondaManager::with_config(config) {
        Ok(mut manager) => execute_with(&mut manager, command),
        Err(err) => ExecutionOutcome::from_error(&err),
    }
}

#[must_use]
pub fn execute_with(manager: &mut CondaManager, command: &CondaCommand) -> ExecutionOutcome {
    debug!(command = %command.info().group, "dispatching");
    dispatch(manager, command).unwrap_or_else(|err| ExecutionOutcome::from_error(&err))
}

fn dispatch(manager: &mut CondaManager, command: &CondaCommand) -> Result<ExecutionOutcome> {
    match command {
        CondaCommand::Version => {
            let version = manager.version()?;
            Ok(ExecutionOutcome::success(
                version.clone(),
                json!({
                    "version": version,
                    "root": manager.root().display().to_string(),
                    "platform": manager.platform().to_string(),
                    "passthrough": true,
                }),
            ))
        }
        CondaCommand::Envs => {
            let names = manager.environment_names()?;
            Ok(ExecutionOutcome::success(
                names.join("\n"),
                json!({ "environments": names, "passthrough": true }),
            ))
        }
        CondaCommand::Create {
            name,
            force,
            file,
            extra,
        } => {
            let mut args: Vec<OsString> = Vec::new();
            if let Some(file) = file {
                args.push("-f".into());
                args.push(file.clone().into_os_string());
            }
            args.extend(extra.iter().map(OsString::from));
            manager.create(name, *force, args)?;
            Ok(ExecutionOutcome::success(
                format!("created environment {name}"),
                json!({ "environment": name, "file": file }),
            ))
        }
        CondaCommand::Install(request) => {
            activate(manager, request.env.as_deref())?;
            manager.install(&request.packages)?;
            Ok(package_outcome(manager, "installed", request))
        }
        CondaCommand::Uninstall(request) => {
            activate(manager, request.env.as_deref())?;
            manager.uninstall(&request.packages)?;
            Ok(package_outcome(manager, "uninstalled", request))
        }
        CondaCommand::Update(request) => {
            activate(manager, request.env.as_deref())?;
            manager.update(&request.packages)?;
            Ok(package_outcome(manager, "updated", request))
        }
        CondaCommand::PipInstall(request) => {
            activate(manager, request.env.as_deref())?;
            manager.pip_install(&request.packages)?;
            Ok(package_outcome(manager, "installed", request))
        }
        CondaCommand::PipUninstall(request) => {
            activate(manager, request.env.as_deref())?;
            manager.pip_uninstall(&request.packages)?;
            Ok(package_outcome(manager, "uninstalled", request))
        }
        CondaCommand::Run { env, args } => {
            activate(manager, env.as_deref())?;
            manager.run_python(args)?;
            Ok(ExecutionOutcome::success(
                format!("python exited cleanly in {}", manager.active_environment()),
                json!({ "environment": manager.active_environment(), "args": args }),
            ))
        }
        CondaCommand::Vars { env } => {
            activate(manager, env.as_deref())?;
            let vars = manager.environment_variables()?;
            let lines: Vec<String> = vars
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            Ok(ExecutionOutcome::success(
                lines.join("\n"),
                json!({
                    "environment": manager.active_environment(),
                    "variables": vars,
                    "passthrough": true,
                }),
            ))
        }
        CondaCommand::Conda { args } => {
            manager.run_conda(args)?;
            Ok(ExecutionOutcome::success(String::new(), json!({ "args": args })))
        }
    }
}

fn activate(manager: &mut CondaManager, env: Option<&str>) -> Result<()> {
    match env {
        Some(env) => manager.activate(env),
        None => Ok(()),
    }
}

fn package_outcome(
    manager: &CondaManager,
    verb: &str,
    request: &PackageRequest,
) -> ExecutionOutcome {
    let env = manager.active_environment();
    let message = match request.packages.as_slice() {
        [] => format!("{verb} nothing in {env}"),
        [single] => format!("{verb} {single} in {env}"),
        many => format!("{verb} {} packages in {env}", many.len()),
    };
    ExecutionOutcome::success(
        message,
        json!({ "environment": env, "packages": request.packages }),
    )
}
