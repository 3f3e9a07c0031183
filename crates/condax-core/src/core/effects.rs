use std::path::Path;
use std::sync::Arc;

use super::process::{run_command, run_command_passthrough, CommandInvocation, RunOutput};
use crate::config::DownloadConfig;
use crate::net;
use crate::Result;

/// Executes fully-built invocations. Implementations must block until the
/// child has exited.
pub trait ProcessRunner: Send + Sync {
    fn run_captured(&self, invocation: &CommandInvocation) -> Result<RunOutput>;
    fn run_passthrough(&self, invocation: &CommandInvocation) -> Result<RunOutput>;
}

pub trait Downloader: Send + Sync {
    fn download(&self, url: &str, dest: &Path, config: &DownloadConfig) -> Result<()>;
}

pub trait Effects: Send + Sync {
    fn processes(&self) -> &dyn ProcessRunner;
    fn downloader(&self) -> &dyn Downloader;
}

pub type SharedEffects = Arc<dyn Effects>;

pub struct SystemEffects {
    processes: Arc<SystemProcessRunner>,
    downloader: Arc<HttpDownloader>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            processes: Arc::new(SystemProcessRunner),
            downloader: Arc::new(HttpDownloader),
        }
    }

    #[must_use]
    pub fn shared() -> SharedEffects {
        Arc::new(Self::new())
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn processes(&self) -> &dyn ProcessRunner {
        self.processes.as_ref()
    }

    fn downloader(&self) -> &dyn Downloader {
        self.downloader.as_ref()
    }
}

struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run_captured(&self, invocation: &CommandInvocation) -> Result<RunOutput> {
        run_command(invocation)
    }

    fn run_passthrough(&self, invocation: &CommandInvocation) -> Result<RunOutput> {
        run_command_passthrough(invocation)
    }
}

struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path, config: &DownloadConfig) -> Result<()> {
        net::download_to(url, dest, config).map(|_| ())
    }
}
