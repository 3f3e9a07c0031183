//! Host capabilities that drive every OS-specific decision.
//!
//! The lookup happens once per manager; the installer and the runner only ask
//! the resulting [`Platform`] and never branch on `cfg!` themselves.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{CondaError, Result};

const DOWNLOAD_URL_LINUX: &str =
    "https://repo.anaconda.com/miniconda/Miniconda3-latest-Linux-x86_64.sh";
const DOWNLOAD_URL_MAC: &str =
    "https://repo.anaconda.com/miniconda/Miniconda3-latest-MacOSX-x86_64.sh";
const DOWNLOAD_URL_MAC_ARM64: &str =
    "https://repo.anaconda.com/miniconda/Miniconda3-latest-MacOSX-arm64.sh";
const DOWNLOAD_URL_WINDOWS: &str =
    "https://repo.anaconda.com/miniconda/Miniconda3-latest-Windows-x86_64.exe";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
    /// Any other `std::env::consts::ARCH` value, kept by name.
    Other(&'static str),
}

impl Arch {
    fn from_name(name: &'static str) -> Self {
        match name {
            "x86_64" => Self::X86_64,
            "aarch64" => Self::Aarch64,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::Other(name) => *name,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Platform {
    os: OsFamily,
    arch: Arch,
}

impl Platform {
    /// Resolves the platform of the running process.
    ///
    /// # Errors
    /// Returns [`CondaError::UnsupportedPlatform`] when the host OS has no
    /// known conda layout.
    pub fn detect() -> Result<Self> {
        Self::from_target(env::consts::OS, env::consts::ARCH)
    }

    /// Resolves a platform from `std::env::consts`-style names.
    ///
    /// Any architecture is accepted for linux, macos and windows. Whether an
    /// installer can be downloaded is a separate question, see
    /// [`Platform::installer_url`].
    ///
    /// # Errors
    /// Returns [`CondaError::UnsupportedPlatform`] for any other OS.
    pub fn from_target(os: &'static str, arch: &'static str) -> Result<Self> {
        let family = match os {
            "linux" => OsFamily::Linux,
            "macos" => OsFamily::MacOs,
            "windows" => OsFamily::Windows,
            _ => {
                return Err(CondaError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
        Ok(Self {
            os: family,
            arch: Arch::from_name(arch),
        })
    }

    #[must_use]
    pub fn os(&self) -> OsFamily {
        self.os
    }

    #[must_use]
    pub fn arch(&self) -> Arch {
        self.arch
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == OsFamily::Windows
    }

    /// Published Miniconda installer for this host, if there is one.
    #[must_use]
    pub fn installer_url(&self) -> Option<&'static str> {
        match (self.os, self.arch) {
            (OsFamily::Linux, Arch::X86_64) => Some(DOWNLOAD_URL_LINUX),
            (OsFamily::MacOs, Arch::X86_64) => Some(DOWNLOAD_URL_MAC),
            (OsFamily::MacOs, Arch::Aarch64) => Some(DOWNLOAD_URL_MAC_ARM64),
            (OsFamily::Windows, Arch::X86_64) => Some(DOWNLOAD_URL_WINDOWS),
            _ => None,
        }
    }

    /// The error a bootstrap reports when there is nothing to download.
    #[must_use]
    pub fn unsupported(&self) -> CondaError {
        CondaError::UnsupportedPlatform {
            os: self.os_name().to_string(),
            arch: self.arch.name().to_string(),
        }
    }

    fn os_name(&self) -> &'static str {
        match self.os {
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
            OsFamily::Windows => "windows",
        }
    }

    #[must_use]
    pub fn installer_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ".sh"
        }
    }

    /// Launcher location relative to the installation root.
    #[must_use]
    pub fn conda_launcher(&self) -> PathBuf {
        if self.is_windows() {
            Path::new("condabin").join("conda.bat")
        } else {
            Path::new("condabin").join("conda")
        }
    }

    /// Interpreter location relative to an environment directory.
    #[must_use]
    pub fn python_launcher(&self) -> PathBuf {
        if self.is_windows() {
            PathBuf::from("python.exe")
        } else {
            Path::new("bin").join("python")
        }
    }

    /// The Windows launcher is a batch script and needs `cmd /c`.
    #[must_use]
    pub fn wraps_in_shell(&self) -> bool {
        self.is_windows()
    }

    /// Environment-local DLLs are only found through `PATH` on Windows.
    #[must_use]
    pub fn prepends_env_path(&self) -> bool {
        self.is_windows()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os_name(), self.arch.name())
    }
}
