use std::env;
use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::effects::SharedEffects;
use super::process::{CommandInvocation, RunOutput};
use crate::platform::Platform;
use crate::registry::BASE_ENVIRONMENT;
use crate::{CondaError, Result};

const ENVS_DIR: &str = "envs";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub envs: Vec<(OsString, OsString)>,
    pub inherit_io: bool,
}

impl RunOptions {
    #[must_use]
    pub fn inherit() -> Self {
        Self {
            envs: Vec::new(),
            inherit_io: true,
        }
    }
}

/// Builds and executes every subprocess against one installation root.
#[derive(Clone)]
pub struct CommandRunner {
    root: PathBuf,
    platform: Platform,
    effects: SharedEffects,
}

impl CommandRunner {
    pub fn new(root: impl Into<PathBuf>, platform: Platform, effects: SharedEffects) -> Self {
        Self {
            root: root.into(),
            platform,
            effects,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn envs_dir(&self) -> PathBuf {
        self.root.join(ENVS_DIR)
    }

    /// Directory holding `env`; `base` lives at the root itself.
    #[must_use]
    pub fn env_dir(&self, env: &str) -> PathBuf {
        if env == BASE_ENVIRONMENT {
            self.root.clone()
        } else {
            self.envs_dir().join(env)
        }
    }

    #[must_use]
    pub fn conda_program(&self) -> PathBuf {
        self.root.join(self.platform.conda_launcher())
    }

    #[must_use]
    pub fn python_program(&self, env: &str) -> PathBuf {
        self.env_dir(env).join(self.platform.python_launcher())
    }

    /// Argument vector for a conda subcommand, launcher first.
    #[must_use]
    pub fn conda_argv<I, S>(&self, args: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        std::iter::once(self.conda_program().into_os_string())
            .chain(args.into_iter().map(Into::into))
            .collect()
    }

    /// Wraps `argv` for the platform shell when required and pins the working
    /// directory to the installation root.
    #[must_use]
    pub fn invocation(&self, argv: &[OsString], options: &RunOptions) -> CommandInvocation {
        let (program, rest) = match argv.split_first() {
            Some((program, rest)) => (program.clone(), rest),
            None => (OsString::new(), &[][..]),
        };
        let invocation = if self.platform.wraps_in_shell() {
            CommandInvocation::new("cmd")
                .args(["/c"])
                .arg(program)
                .args(rest.iter().cloned())
        } else {
            CommandInvocation::new(program).args(rest.iter().cloned())
        };
        let mut invocation = invocation
            .current_dir(&self.root)
            .inherit_io(options.inherit_io);
        invocation.envs.extend(options.envs.iter().cloned());
        invocation
    }

    /// Runs `argv` to completion; a non-zero exit is an error.
    ///
    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on non-zero exit and
    /// [`CondaError::Process`] when the child cannot be started.
    pub fn run(&self, argv: &[OsString], options: &RunOptions) -> Result<RunOutput> {
        let invocation = self.invocation(argv, options);
        let processes = self.effects.processes();
        let output = if invocation.inherit_io {
            processes.run_passthrough(&invocation)?
        } else {
            processes.run_captured(&invocation)?
        };
        if output.success() {
            Ok(output)
        } else {
            Err(CondaError::CommandFailed {
                program: program_label(argv),
                code: output.code,
            })
        }
    }

    /// Runs `argv` with stdout captured and returns the raw exit code; used for
    /// probes whose diagnostics matter even on failure.
    ///
    /// # Errors
    /// Returns [`CondaError::Process`] when the child cannot be started.
    pub fn run_capturing(&self, argv: &[OsString]) -> Result<RunOutput> {
        let invocation = self.invocation(argv, &RunOptions::default());
        self.effects.processes().run_captured(&invocation)
    }

    /// `PATH` entry for a python run inside `env`, when the platform needs one.
    ///
    /// # Errors
    /// Returns an error if the environment path cannot be joined into `PATH`.
    pub fn path_overlay(&self, env: &str) -> Result<Option<(OsString, OsString)>> {
        if !self.platform.prepends_env_path() {
            return Ok(None);
        }
        let env_dir = self.env_dir(env);
        let inherited = env::var_os("PATH");
        let value = prepend_env_path(&env_dir, inherited.as_deref())?;
        debug!(env, path = ?value, "prepending environment directories to PATH");
        Ok(Some((OsString::from("PATH"), value)))
    }
}

fn program_label(argv: &[OsString]) -> String {
    argv.first()
        .map(|program| program.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Puts `Library\Bin`, `Library`, `Scripts` and the environment root ahead of
/// the inherited entries.
pub(crate) fn prepend_env_path(env_dir: &Path, inherited: Option<&OsStr>) -> Result<OsString> {
    let mut entries = vec![
        env_dir.join("Library").join("Bin"),
        env_dir.join("Library"),
        env_dir.join("Scripts"),
        env_dir.to_path_buf(),
    ];
    if let Some(inherited) = inherited {
        entries.extend(env::split_paths(inherited));
    }
    env::join_paths(entries)
        .map_err(|err| CondaError::io(env_dir, io::Error::new(io::ErrorKind::InvalidInput, err)))
}
