//! In-memory stand-ins for the process and download effects.
//!
//! `FakeEffects` behaves like a tiny conda: it answers `-V`, creates
//! environment directories under the invocation's working directory, prints
//! configured variables, and lays out a root when the installer runs.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::effects::{Downloader, Effects, ProcessRunner, SharedEffects};
use super::process::{CommandInvocation, RunOutput};
use crate::config::DownloadConfig;
use crate::{CondaError, Result};

pub(crate) const FAKE_VERSION: &str = "conda 23.1.0";

#[derive(Default)]
struct FakeState {
    calls: Vec<CommandInvocation>,
    downloads: Vec<String>,
    codes: HashMap<String, i32>,
    variables: HashMap<String, String>,
    env_create_code: i32,
    env_create_unspawnable: bool,
    create_code: i32,
    installer_code: i32,
    version_code: i32,
    download_fails: bool,
}

#[derive(Clone, Default)]
pub(crate) struct FakeEffects {
    state: Arc<Mutex<FakeState>>,
}

impl FakeEffects {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn shared(&self) -> SharedEffects {
        Arc::new(self.clone())
    }

    /// Any program whose file name is `program` exits with `code`.
    pub(crate) fn respond_with_code(&self, program: &str, code: i32) {
        self.lock().codes.insert(program.to_string(), code);
    }

    /// Raw stdout of `env config vars list` for `env`.
    pub(crate) fn set_variables_output(&self, env: &str, output: &str) {
        self.lock()
            .variables
            .insert(env.to_string(), output.to_string());
    }

    pub(crate) fn fail_env_create(&self, code: i32) {
        self.lock().env_create_code = code;
    }

    /// `env create` cannot be started at all.
    pub(crate) fn fail_env_create_spawn(&self) {
        self.lock().env_create_unspawnable = true;
    }

    /// Plain `create` exits with `code`.
    pub(crate) fn fail_create(&self, code: i32) {
        self.lock().create_code = code;
    }

    pub(crate) fn fail_installer(&self, code: i32) {
        self.lock().installer_code = code;
    }

    pub(crate) fn fail_version_probe(&self, code: i32) {
        self.lock().version_code = code;
    }

    pub(crate) fn fail_downloads(&self) {
        self.lock().download_fails = true;
    }

    pub(crate) fn calls(&self) -> Vec<CommandInvocation> {
        self.lock().calls.clone()
    }

    /// Argument vectors with any `cmd /c` wrapper and launcher paths reduced to
    /// file names, for readable assertions.
    pub(crate) fn argvs(&self) -> Vec<Vec<String>> {
        self.calls().iter().map(normalized_argv).collect()
    }

    pub(crate) fn downloads(&self) -> Vec<String> {
        self.lock().downloads.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake effects lock")
    }

    fn execute(&self, invocation: &CommandInvocation) -> Result<RunOutput> {
        let argv = normalized_argv(invocation);
        let cwd = invocation.cwd.clone().unwrap_or_default();
        let mut state = self.lock();
        state.calls.push(invocation.clone());
        if let Some(code) = argv.first().and_then(|program| state.codes.get(program)) {
            return Ok(output(*code, ""));
        }
        let args: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();
        match argv.first().map(String::as_str) {
            Some(program @ ("conda" | "conda.bat")) => conda(&state, program, &cwd, &args),
            Some(program) if program == "bash" || program.starts_with("miniconda") => {
                if state.installer_code != 0 {
                    return Ok(output(state.installer_code, ""));
                }
                let root = installer_prefix(&args).ok_or_else(|| {
                    CondaError::process(program, std::io::Error::other("missing prefix"))
                })?;
                fs::create_dir_all(root.join("condabin"))
                    .and_then(|()| fs::create_dir_all(root.join("envs")))
                    .map_err(|err| CondaError::io(&root, err))?;
                Ok(output(0, ""))
            }
            _ => Ok(output(0, "")),
        }
    }
}

fn conda(state: &FakeState, program: &str, cwd: &Path, args: &[&str]) -> Result<RunOutput> {
    let name = flag_value(args, "-n");
    let out = match args {
        ["-V", ..] => {
            if state.version_code == 0 {
                output(0, &format!("{FAKE_VERSION}\n"))
            } else {
                output(state.version_code, "")
            }
        }
        ["env", "config", "vars", "list", ..] => {
            let vars = name
                .and_then(|name| state.variables.get(name))
                .cloned()
                .unwrap_or_default();
            output(0, &vars)
        }
        ["env", "create", ..] if state.env_create_unspawnable => {
            return Err(CondaError::process(
                program,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
            ));
        }
        ["env", "create", ..] if state.env_create_code != 0 => output(state.env_create_code, ""),
        ["create", ..] if state.create_code != 0 => output(state.create_code, ""),
        ["env", "create", ..] | ["create", ..] => make_env(cwd, name),
        _ => output(0, ""),
    };
    Ok(out)
}

fn make_env(cwd: &Path, name: Option<&str>) -> RunOutput {
    match name {
        Some(name) if fs::create_dir_all(cwd.join("envs").join(name)).is_ok() => output(0, ""),
        _ => output(1, ""),
    }
}

fn flag_value<'a>(args: &[&'a str], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| *arg == flag)
        .and_then(|idx| args.get(idx + 1))
        .copied()
}

fn installer_prefix(args: &[&str]) -> Option<PathBuf> {
    if let Some(prefix) = flag_value(args, "-p") {
        return Some(PathBuf::from(prefix));
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("/D="))
        .map(PathBuf::from)
}

fn normalized_argv(invocation: &CommandInvocation) -> Vec<String> {
    let mut parts: Vec<OsString> = std::iter::once(invocation.program.clone())
        .chain(invocation.args.iter().cloned())
        .collect();
    if parts.first().is_some_and(|program| program == "cmd") && parts.len() >= 2 {
        parts.drain(0..2);
    }
    parts
        .iter()
        .enumerate()
        .map(|(idx, part)| {
            if idx == 0 {
                Path::new(part)
                    .file_name()
                    .map_or_else(|| part.to_string_lossy(), |name| name.to_string_lossy())
                    .into_owned()
            } else {
                part.to_string_lossy().into_owned()
            }
        })
        .collect()
}

fn output(code: i32, stdout: &str) -> RunOutput {
    RunOutput {
        code,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

impl ProcessRunner for FakeEffects {
    fn run_captured(&self, invocation: &CommandInvocation) -> Result<RunOutput> {
        self.execute(invocation)
    }

    fn run_passthrough(&self, invocation: &CommandInvocation) -> Result<RunOutput> {
        self.execute(invocation).map(|out| output(out.code, ""))
    }
}

impl Downloader for FakeEffects {
    fn download(&self, url: &str, dest: &Path, _config: &DownloadConfig) -> Result<()> {
        let mut state = self.lock();
        state.downloads.push(url.to_string());
        if state.download_fails {
            return Err(CondaError::download(
                url,
                std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
            ));
        }
        fs::write(dest, "#!/bin/sh\n").map_err(|err| CondaError::download(url, err))
    }
}

impl Effects for FakeEffects {
    fn processes(&self) -> &dyn ProcessRunner {
        self
    }

    fn downloader(&self) -> &dyn Downloader {
        self
    }
}
