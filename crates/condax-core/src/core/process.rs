use std::{
    ffi::{OsStr, OsString},
    io::{self, Read},
    path::PathBuf,
    process::{Command, Stdio},
    thread,
};

use tracing::debug;

use crate::{CondaError, Result};

const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;

fn max_capture_bytes() -> usize {
    std::env::var("CONDAX_MAX_CAPTURE_BYTES")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES)
}

/// One subprocess execution: what to run, where, and with which overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    /// `None` keeps the caller's working directory.
    pub cwd: Option<PathBuf>,
    pub envs: Vec<(OsString, OsString)>,
    pub inherit_io: bool,
    /// Indices into `args` that reach the Windows command line unquoted.
    pub verbatim_args: Vec<usize>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
            inherit_io: false,
            verbatim_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an argument that Windows receives exactly as written, without
    /// the quoting and escaping `std` applies. Elsewhere it is a plain argument.
    #[must_use]
    pub fn raw_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.verbatim_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn inherit_io(mut self, inherit: bool) -> Self {
        self.inherit_io = inherit;
        self
    }

    /// Human-readable program name for errors and logs.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// The argument vector, program first.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Execute a program and capture stdout/stderr once it has exited.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or the I/O streams cannot
/// be read entirely.
pub fn run_command(invocation: &CommandInvocation) -> Result<RunOutput> {
    let program = invocation.program_name();
    let mut command = configured_command(invocation);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|err| CondaError::process(&program, err))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CondaError::process(&program, io::Error::other("stdout missing")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| CondaError::process(&program, io::Error::other("stderr missing")))?;
    let limit = max_capture_bytes();
    let stdout_handle = thread::spawn(move || read_to_string_limited(stdout, limit));
    let stderr_handle = thread::spawn(move || read_to_string_limited(stderr, limit));

    let status = child
        .wait()
        .map_err(|err| CondaError::process(&program, err))?;
    let code = status.code().unwrap_or(-1);
    let (mut stdout, stdout_truncated) = join_reader(stdout_handle, &program)?;
    let (mut stderr, stderr_truncated) = join_reader(stderr_handle, &program)?;
    if stdout_truncated {
        stdout.push_str("\n[...truncated...]\n");
    }
    if stderr_truncated {
        stderr.push_str("\n[...truncated...]\n");
    }
    debug!(program = %program, code, "captured command finished");
    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

/// Execute a program with inherited stdio.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or waited on.
pub fn run_command_passthrough(invocation: &CommandInvocation) -> Result<RunOutput> {
    let program = invocation.program_name();
    let mut command = configured_command(invocation);
    command.stdin(Stdio::inherit());
    command.stdout(Stdio::inherit());
    command.stderr(Stdio::inherit());

    let status = command
        .status()
        .map_err(|err| CondaError::process(&program, err))?;
    let code = status.code().unwrap_or(-1);
    debug!(program = %program, code, "passthrough command finished");
    Ok(RunOutput {
        code,
        stdout: String::new(),
        stderr: String::new(),
    })
}

fn configured_command(invocation: &CommandInvocation) -> Command {
    debug!(
        argv = ?invocation.argv(),
        cwd = ?invocation.cwd,
        overlay = invocation.envs.len(),
        "spawning"
    );
    let mut command = Command::new(&invocation.program);
    for (index, arg) in invocation.args.iter().enumerate() {
        push_arg(&mut command, arg, invocation.verbatim_args.contains(&index));
    }
    for (key, value) in &invocation.envs {
        command.env(key, value);
    }
    if let Some(cwd) = &invocation.cwd {
        command.current_dir(cwd);
    }
    command
}

#[cfg(windows)]
fn push_arg(command: &mut Command, arg: &OsStr, verbatim: bool) {
    use std::os::windows::process::CommandExt;

    if verbatim {
        command.raw_arg(arg);
    } else {
        command.arg(arg);
    }
}

#[cfg(not(windows))]
fn push_arg(command: &mut Command, arg: &OsStr, _verbatim: bool) {
    command.arg(arg);
}

fn join_reader(
    handle: thread::JoinHandle<io::Result<(String, bool)>>,
    program: &str,
) -> Result<(String, bool)> {
    handle
        .join()
        .map_err(|_| CondaError::process(program, io::Error::other("output reader panicked")))?
        .map_err(|err| CondaError::process(program, err))
}

fn read_to_string_limited(mut reader: impl Read, limit: usize) -> io::Result<(String, bool)> {
    let mut buffer = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        append_limited(&mut buffer, &chunk[..read], limit, &mut truncated);
    }
    Ok((String::from_utf8_lossy(&buffer).to_string(), truncated))
}

fn append_limited(buffer: &mut Vec<u8>, chunk: &[u8], limit: usize, truncated: &mut bool) {
    if limit == 0 {
        return;
    }
    if buffer.len().saturating_add(chunk.len()) <= limit {
        buffer.extend_from_slice(chunk);
        return;
    }
    *truncated = true;
    let old_len = buffer.len();
    let excess = old_len.saturating_add(chunk.len()).saturating_sub(limit);
    if excess >= old_len {
        buffer.clear();
        let drop_from_chunk = excess.saturating_sub(old_len).min(chunk.len());
        buffer.extend_from_slice(&chunk[drop_from_chunk..]);
    } else {
        buffer.drain(0..excess);
        buffer.extend_from_slice(chunk);
    }
}
