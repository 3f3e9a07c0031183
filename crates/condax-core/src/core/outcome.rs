use std::error::Error as _;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::CondaError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    /// Outcome for a failed operation; user errors keep exit code 1.
    #[must_use]
    pub fn from_error(err: &CondaError) -> Self {
        let mut details = json!({ "reason": reason(err) });
        if let Some(code) = err.exit_code() {
            details["code"] = json!(code);
        }
        if let Some(cause) = err.source() {
            details["cause"] = json!(cause.to_string());
        }
        if let Some(hint) = hint(err) {
            details["hint"] = json!(hint);
        }
        if err.is_user_error() {
            Self::user_error(err.to_string(), details)
        } else {
            Self::failure(err.to_string(), details)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}

impl CommandStatus {
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            CommandStatus::Ok => 0,
            CommandStatus::UserError => 1,
            CommandStatus::Failure => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandGroup {
    Version,
    Envs,
    Create,
    Install,
    Uninstall,
    Update,
    Pip,
    Run,
    Vars,
    Conda,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Version => "version",
            CommandGroup::Envs => "envs",
            CommandGroup::Create => "create",
            CommandGroup::Install => "install",
            CommandGroup::Uninstall => "uninstall",
            CommandGroup::Update => "update",
            CommandGroup::Pip => "pip",
            CommandGroup::Run => "run",
            CommandGroup::Vars => "vars",
            CommandGroup::Conda => "conda",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

fn reason(err: &CondaError) -> &'static str {
    match err {
        CondaError::UnsupportedPlatform { .. } => "unsupported_platform",
        CondaError::Download { .. } => "download_failed",
        CondaError::Installation { .. } => "installer_failed",
        CondaError::InstallationVerification { .. } => "installation_unusable",
        CondaError::EnvironmentExists { .. } => "environment_exists",
        CondaError::UnknownEnvironment { .. } => "unknown_environment",
        CondaError::CommandFailed { .. } => "command_failed",
        CondaError::MalformedVariableLine { .. } => "malformed_variables",
        CondaError::InvalidVersion { .. } => "invalid_version",
        CondaError::Config { .. } => "invalid_config",
        CondaError::Process { .. } => "spawn_failed",
        CondaError::Io { .. } => "io",
    }
}

fn hint(err: &CondaError) -> Option<&'static str> {
    match err {
        CondaError::EnvironmentExists { .. } => Some("Pass --force to recreate it."),
        CondaError::UnknownEnvironment { .. } => {
            Some("Run `condax envs` to list available environments.")
        }
        CondaError::Download { .. } => {
            Some("Check connectivity or point CONDAX_INSTALLER_URL at a reachable mirror.")
        }
        CondaError::InstallationVerification { .. } => {
            Some("Remove the installation root and rerun to reinstall.")
        }
        _ => None,
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("condax {}", info.name)
    } else {
        format!("condax {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}
