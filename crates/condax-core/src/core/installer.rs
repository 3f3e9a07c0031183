use std::ffi::OsString;
use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, info};

use super::effects::SharedEffects;
use super::process::CommandInvocation;
use super::runner::CommandRunner;
use crate::config::DownloadConfig;
use crate::platform::Platform;
use crate::{CondaError, Result};

/// Makes sure a usable installation exists at `root`.
///
/// A missing root is bootstrapped from the platform installer; an existing
/// root is trusted as-is. Either way the launcher must answer `-V` with a zero
/// exit status afterwards.
///
/// # Errors
/// Fails with [`CondaError::UnsupportedPlatform`] when a missing root has no
/// installer to download, and with [`CondaError::Download`],
/// [`CondaError::Installation`] or [`CondaError::InstallationVerification`]
/// depending on the failing step.
pub fn ensure_installed(
    root: &Path,
    platform: Platform,
    download: &DownloadConfig,
    effects: &SharedEffects,
) -> Result<()> {
    if root.exists() {
        debug!(root = %root.display(), "installation root present; skipping bootstrap");
    } else {
        bootstrap(root, platform, download, effects)?;
    }
    verify(root, platform, effects)
}

fn bootstrap(
    root: &Path,
    platform: Platform,
    download: &DownloadConfig,
    effects: &SharedEffects,
) -> Result<()> {
    let url = download
        .url_override
        .as_deref()
        .or_else(|| platform.installer_url())
        .ok_or_else(|| platform.unsupported())?;
    let installer = fetch_installer(url, platform, download, effects)?;
    info!(root = %root.display(), "running conda installer");
    let invocation = installer_invocation(&installer, root, platform);
    let output = effects.processes().run_passthrough(&invocation)?;
    drop(installer);
    if output.success() {
        info!(root = %root.display(), "conda installed");
        Ok(())
    } else {
        Err(CondaError::Installation { code: output.code })
    }
}

fn fetch_installer(
    url: &str,
    platform: Platform,
    download: &DownloadConfig,
    effects: &SharedEffects,
) -> Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix("miniconda")
        .suffix(platform.installer_suffix())
        .tempfile()
        .map_err(|err| CondaError::download(url, err))?;
    let path = file.into_temp_path();
    effects.downloader().download(url, &path, download)?;
    Ok(path)
}

/// NSIS only honors `/D=` as the final argument and unquoted, even when the
/// path contains spaces.
fn installer_invocation(installer: &Path, root: &Path, platform: Platform) -> CommandInvocation {
    if platform.is_windows() {
        let mut target = OsString::from("/D=");
        target.push(root);
        CommandInvocation::new(installer)
            .args([
                "/InstallationType=JustMe",
                "/AddToPath=0",
                "/RegisterPython=0",
                "/S",
            ])
            .raw_arg(target)
            .inherit_io(true)
    } else {
        CommandInvocation::new("bash")
            .arg(installer)
            .args(["-b", "-p"])
            .arg(root)
            .inherit_io(true)
    }
}

fn verify(root: &Path, platform: Platform, effects: &SharedEffects) -> Result<()> {
    let runner = CommandRunner::new(root, platform, effects.clone());
    let output = runner.run_capturing(&runner.conda_argv(["-V"]))?;
    if output.success() {
        debug!(version = %output.stdout.trim(), "conda responded to version probe");
        Ok(())
    } else {
        Err(CondaError::InstallationVerification { code: output.code })
    }
}
