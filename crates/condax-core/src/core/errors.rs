use std::io;
use std::path::PathBuf;

pub type Result<T, E = CondaError> = std::result::Result<T, E>;

/// Failures surfaced by the manager. Nothing is retried internally apart from
/// the create-from-file fallback in [`crate::CondaManager::create`].
#[derive(Debug, thiserror::Error)]
pub enum CondaError {
    #[error("no conda installer is published for {os}-{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("failed to download conda installer from {url}")]
    Download {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("conda installer exited with status {code}")]
    Installation { code: i32 },

    #[error("conda installation is unusable: `conda -V` exited with status {code}")]
    InstallationVerification { code: i32 },

    #[error("environment `{name}` already exists")]
    EnvironmentExists { name: String },

    #[error("environment `{name}` not found")]
    UnknownEnvironment { name: String },

    #[error("{program} exited with status {code}")]
    CommandFailed { program: String, code: i32 },

    #[error("unexpected line in `conda env config vars list` output: {line:?}")]
    MalformedVariableLine { line: String },

    #[error("unable to parse conda version from {raw:?}")]
    InvalidVersion { raw: String },

    #[error("invalid value {value:?} for {key}")]
    Config { key: &'static str, value: String },

    #[error("failed to run {program}")]
    Process {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CondaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn process(program: impl Into<String>, source: io::Error) -> Self {
        Self::Process {
            program: program.into(),
            source,
        }
    }

    pub(crate) fn download(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Download {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Errors the caller can fix by choosing different input.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::EnvironmentExists { .. }
                | Self::UnknownEnvironment { .. }
                | Self::UnsupportedPlatform { .. }
                | Self::Config { .. }
        )
    }

    /// Exit status of the failed subprocess, when the failure came from one.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. }
            | Self::Installation { code }
            | Self::InstallationVerification { code } => Some(*code),
            _ => None,
        }
    }
}
