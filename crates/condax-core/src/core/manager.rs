use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::effects::{SharedEffects, SystemEffects};
use super::envvars::{parse_variables, EnvironmentVariables};
use super::installer::ensure_installed;
use super::registry::{self, ActiveEnvironment};
use super::runner::{CommandRunner, RunOptions};
use super::version::CondaVersion;
use crate::config::Config;
use crate::platform::Platform;
use crate::{CondaError, Result};

/// Drives one conda installation.
///
/// Construction bootstraps the installation if needed. Calls without an
/// explicit environment name act on the active environment, which starts as
/// `base` and lives only as long as this value.
pub struct CondaManager {
    runner: CommandRunner,
    active: ActiveEnvironment,
}

impl CondaManager {
    /// Opens (installing first if missing) the installation at `root`, using
    /// process environment settings for everything else.
    ///
    /// # Errors
    /// Returns an error if configuration is invalid or the installation cannot
    /// be bootstrapped or verified.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let config = Config::from_env()?.with_root(root);
        Self::with_config(&config)
    }

    /// # Errors
    /// See [`CondaManager::new`].
    pub fn with_config(config: &Config) -> Result<Self> {
        Self::with_effects(config, Platform::detect()?, SystemEffects::shared())
    }

    /// # Errors
    /// See [`CondaManager::new`].
    pub fn with_effects(config: &Config, platform: Platform, effects: SharedEffects) -> Result<Self> {
        ensure_installed(config.root(), platform, config.download(), &effects)?;
        Ok(Self {
            runner: CommandRunner::new(config.root().clone(), platform, effects),
            active: ActiveEnvironment::default(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.runner.root()
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.runner.platform()
    }

    /// First line of `conda -V`, e.g. `conda 23.1.0`.
    ///
    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn version(&self) -> Result<String> {
        let argv = self.runner.conda_argv(["-V"]);
        let output = self.runner.run_capturing(&argv)?;
        if !output.success() {
            return Err(CondaError::CommandFailed {
                program: self.runner.conda_program().display().to_string(),
                code: output.code,
            });
        }
        // Older releases print the version on stderr.
        let line = first_line(&output.stdout)
            .or_else(|| first_line(&output.stderr))
            .ok_or_else(|| CondaError::InvalidVersion { raw: String::new() })?;
        Ok(line.to_string())
    }

    /// # Errors
    /// Returns an error if `version` fails or its output cannot be parsed.
    pub fn parsed_version(&self) -> Result<CondaVersion> {
        CondaVersion::parse(&self.version()?)
    }

    /// Runs conda with `args`, streaming its output.
    ///
    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn run_conda<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let argv = self.runner.conda_argv(args);
        self.runner.run(&argv, &RunOptions::inherit()).map(|_| ())
    }

    /// `base` followed by the environments found under `envs/`.
    ///
    /// # Errors
    /// Returns [`CondaError::Io`] if the environments directory is unreadable.
    pub fn environment_names(&self) -> Result<Vec<String>> {
        registry::environment_names(&self.runner.envs_dir())
    }

    /// Creates `name`. Unless `force` is set an existing name is rejected
    /// before conda runs. Arguments that point at an environment file go
    /// through `conda env create` first and fall back to `conda create`.
    ///
    /// # Errors
    /// Returns [`CondaError::EnvironmentExists`] or the failure of the last
    /// conda command attempted.
    pub fn create<I, S>(&self, name: &str, force: bool, extra_args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let extra: Vec<OsString> = extra_args.into_iter().map(Into::into).collect();
        if !force && self.environment_names()?.iter().any(|env| env == name) {
            return Err(CondaError::EnvironmentExists {
                name: name.to_string(),
            });
        }
        info!(env = name, "creating environment");
        if names_environment_file(&extra) {
            let argv = self.runner.conda_argv(
                ["env", "create", "--force", "-n", name]
                    .into_iter()
                    .map(OsString::from)
                    .chain(extra.iter().cloned()),
            );
            match self.runner.run(&argv, &RunOptions::inherit()) {
                Ok(_) => return Ok(()),
                Err(err @ CondaError::CommandFailed { .. }) => {
                    warn!(env = name, error = %err, "`conda env create` failed; retrying with `conda create`");
                }
                Err(err) => return Err(err),
            }
        }
        self.run_conda(
            ["create", "-y", "-n", name]
                .into_iter()
                .map(OsString::from)
                .chain(extra),
        )
    }

    /// Creates `name` from an environment file such as `environment.yml`.
    ///
    /// # Errors
    /// See [`CondaManager::create`].
    pub fn create_from_file(&self, name: &str, file: &Path, force: bool) -> Result<()> {
        self.create(
            name,
            force,
            [OsString::from("-f"), file.as_os_str().to_os_string()],
        )
    }

    /// # Errors
    /// Returns [`CondaError::UnknownEnvironment`] if `name` is not listed.
    pub fn activate(&mut self, name: &str) -> Result<()> {
        let known = self.environment_names()?;
        self.active.activate(name, &known)?;
        debug!(env = name, "activated environment");
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active.deactivate();
    }

    #[must_use]
    pub fn active_environment(&self) -> &str {
        self.active.name()
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn install<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.install_in(self.active.name(), args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn install_in<I, S>(&self, env: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run_scoped("install", env, args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn uninstall<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.uninstall_in(self.active.name(), args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn uninstall_in<I, S>(&self, env: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run_scoped("uninstall", env, args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn update<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.update_in(self.active.name(), args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn update_in<I, S>(&self, env: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run_scoped("update", env, args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn pip_install<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.pip_install_in(self.active.name(), args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn pip_install_in<I, S>(&self, env: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run_python_in(env, prefixed(&["-m", "pip", "install"], args))
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn pip_uninstall<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.pip_uninstall_in(self.active.name(), args)
    }

    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn pip_uninstall_in<I, S>(&self, env: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run_python_in(env, prefixed(&["-m", "pip", "uninstall", "-y"], args))
    }

    /// Runs the active environment's interpreter.
    ///
    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit.
    pub fn run_python<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run_python_in(self.active.name(), args)
    }

    /// Runs `env`'s interpreter with its declared variables exported.
    ///
    /// # Errors
    /// Returns [`CondaError::CommandFailed`] when the variables cannot be listed
    /// or python exits non-zero.
    pub fn run_python_in<I, S>(&self, env: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut options = RunOptions::inherit();
        if let Some(path) = self.runner.path_overlay(env)? {
            options.envs.push(path);
        }
        options.envs.extend(
            self.environment_variables_in(env)?
                .into_iter()
                .map(|(key, value)| (OsString::from(key), OsString::from(value))),
        );
        let argv: Vec<OsString> = std::iter::once(self.runner.python_program(env).into_os_string())
            .chain(args.into_iter().map(Into::into))
            .collect();
        self.runner.run(&argv, &options).map(|_| ())
    }

    /// # Errors
    /// See [`CondaManager::environment_variables_in`].
    pub fn environment_variables(&self) -> Result<EnvironmentVariables> {
        self.environment_variables_in(self.active.name())
    }

    /// Variables declared for `env` via `conda env config vars`.
    ///
    /// # Errors
    /// Returns [`CondaError::CommandFailed`] on a non-zero exit and
    /// [`CondaError::MalformedVariableLine`] on unexpected output.
    pub fn environment_variables_in(&self, env: &str) -> Result<EnvironmentVariables> {
        let argv = self
            .runner
            .conda_argv(["env", "config", "vars", "list", "-n", env]);
        let output = self.runner.run_capturing(&argv)?;
        if !output.success() {
            return Err(CondaError::CommandFailed {
                program: self.runner.conda_program().display().to_string(),
                code: output.code,
            });
        }
        parse_variables(&output.stdout)
    }

    fn run_scoped<I, S>(&self, subcommand: &str, env: &str, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.run_conda(prefixed(&[subcommand, "-y", "-n", env], args))
    }
}

fn prefixed<I, S>(head: &[&str], tail: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    head.iter()
        .map(OsString::from)
        .chain(tail.into_iter().map(Into::into))
        .collect()
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// True when `args` name an environment file rather than packages.
fn names_environment_file(args: &[OsString]) -> bool {
    args.iter().any(|arg| {
        arg.to_str()
            .is_some_and(|arg| arg == "-f" || arg == "--file" || arg.starts_with("--file="))
    })
}
