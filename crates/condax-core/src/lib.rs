mod core;

pub(crate) use crate::core::{config, net, platform, registry};

#[cfg(test)]
pub(crate) use crate::core::test_support;

pub use crate::core::commands::{execute, execute_with, CondaCommand, PackageRequest};
pub use crate::core::config::{Config, DownloadConfig};
pub use crate::core::effects::{Downloader, Effects, ProcessRunner, SharedEffects, SystemEffects};
pub use crate::core::envvars::{parse_variables, EnvironmentVariables};
pub use crate::core::errors::{CondaError, Result};
pub use crate::core::installer::ensure_installed;
pub use crate::core::manager::CondaManager;
pub use crate::core::outcome::{
    format_status_message, to_json_response, CommandGroup, CommandInfo, CommandStatus,
    ExecutionOutcome,
};
pub use crate::core::platform::{Arch, OsFamily, Platform};
pub use crate::core::process::{CommandInvocation, RunOutput};
pub use crate::core::registry::BASE_ENVIRONMENT;
pub use crate::core::runner::{CommandRunner, RunOptions};
pub use crate::core::version::CondaVersion;
