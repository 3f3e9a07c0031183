use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dirs_next::home_dir;

use crate::{CondaError, Result};

const ROOT_ENV: &str = "CONDAX_ROOT";
const INSTALLER_URL_ENV: &str = "CONDAX_INSTALLER_URL";
const CONNECT_TIMEOUT_ENV: &str = "CONDAX_CONNECT_TIMEOUT";
const READ_TIMEOUT_ENV: &str = "CONDAX_READ_TIMEOUT";
const KEEP_PROXIES_ENV: &str = "CONDAX_KEEP_PROXIES";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const PROXY_KEYS: &[&str] = &[
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
    "NO_PROXY",
    "no_proxy",
];

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) root: PathBuf,
    pub(crate) download: DownloadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Replaces the platform installer URL when set.
    pub url_override: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub keep_proxies: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url_override: None,
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            keep_proxies: false,
        }
    }
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if a numeric setting cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    /// Configuration for an explicit root with default download settings.
    #[must_use]
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            download: DownloadConfig::default(),
        }
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let root = match snapshot.var(ROOT_ENV).filter(|value| !value.trim().is_empty()) {
            Some(value) => PathBuf::from(value),
            None => default_root(),
        };
        Ok(Self {
            root,
            download: DownloadConfig {
                url_override: snapshot
                    .var(INSTALLER_URL_ENV)
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .map(ToOwned::to_owned),
                connect_timeout: timeout_setting(snapshot, CONNECT_TIMEOUT_ENV)?,
                read_timeout: timeout_setting(snapshot, READ_TIMEOUT_ENV)?,
                keep_proxies: keep_proxies(snapshot),
            },
        })
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_download(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    #[must_use]
    pub fn download(&self) -> &DownloadConfig {
        &self.download
    }
}

fn default_root() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".condax")
        .join("miniconda3")
}

fn timeout_setting(snapshot: &EnvSnapshot, key: &'static str) -> Result<Duration> {
    match snapshot.var(key) {
        None => Ok(DEFAULT_TIMEOUT),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| CondaError::Config {
                key,
                value: raw.to_string(),
            }),
    }
}

/// Decide whether the installer download should honor proxy variables.
///
/// - `CONDAX_KEEP_PROXIES=1/true/yes/on` forces proxies on.
/// - `CONDAX_KEEP_PROXIES=0/false/no/off/""` forces proxies off.
/// - If unset, proxies are used only when at least one proxy variable is set.
fn keep_proxies(snapshot: &EnvSnapshot) -> bool {
    match snapshot.var(KEEP_PROXIES_ENV) {
        Some(raw) => {
            let value = raw.trim().to_ascii_lowercase();
            !matches!(value.as_str(), "" | "0" | "false" | "no" | "off")
        }
        None => PROXY_KEYS.iter().any(|key| {
            snapshot
                .var(key)
                .is_some_and(|value| !value.trim().is_empty())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_ten_second_timeouts() {
        let config = Config::from_snapshot(&EnvSnapshot::testing(&[])).unwrap();
        assert_eq!(config.download().connect_timeout, Duration::from_secs(10));
        assert_eq!(config.download().read_timeout, Duration::from_secs(10));
        assert!(config.download().url_override.is_none());
        assert!(config.root().ends_with(PathBuf::from(".condax").join("miniconda3")));
    }

    #[test]
    fn root_and_installer_url_come_from_env() {
        let snapshot = EnvSnapshot::testing(&[
            ("CONDAX_ROOT", "/opt/conda"),
            ("CONDAX_INSTALLER_URL", " http://mirror.example/installer.sh "),
            ("CONDAX_READ_TIMEOUT", "30"),
        ]);
        let config = Config::from_snapshot(&snapshot).unwrap();
        assert_eq!(config.root(), &PathBuf::from("/opt/conda"));
        assert_eq!(
            config.download().url_override.as_deref(),
            Some("http://mirror.example/installer.sh")
        );
        assert_eq!(config.download().read_timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_timeout_is_a_config_error() {
        let snapshot = EnvSnapshot::testing(&[("CONDAX_CONNECT_TIMEOUT", "soon")]);
        let err = Config::from_snapshot(&snapshot).unwrap_err();
        assert!(
            matches!(err, CondaError::Config { key: "CONDAX_CONNECT_TIMEOUT", .. }),
            "unexpected error {err:?}"
        );
        let zero = EnvSnapshot::testing(&[("CONDAX_READ_TIMEOUT", "0")]);
        assert!(Config::from_snapshot(&zero).is_err());
    }

    #[test]
    fn keep_proxies_defaults_to_enabled_when_proxy_env_is_set() {
        let snapshot = EnvSnapshot::testing(&[("HTTPS_PROXY", "http://proxy.example")]);
        assert!(keep_proxies(&snapshot));
        let blank = EnvSnapshot::testing(&[("HTTPS_PROXY", "  ")]);
        assert!(!keep_proxies(&blank));
    }

    #[test]
    fn keep_proxies_env_var_overrides_detection() {
        let forced_off = EnvSnapshot::testing(&[
            ("CONDAX_KEEP_PROXIES", "off"),
            ("HTTP_PROXY", "http://proxy.example"),
        ]);
        assert!(!keep_proxies(&forced_off));
        let forced_on = EnvSnapshot::testing(&[("CONDAX_KEEP_PROXIES", "yes")]);
        assert!(keep_proxies(&forced_on));
    }
}
