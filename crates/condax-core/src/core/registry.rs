use std::fs;
use std::path::Path;

use tracing::trace;

use crate::{CondaError, Result};

/// The root installation's own environment; never a folder under `envs/`.
pub const BASE_ENVIRONMENT: &str = "base";

/// Lists `base` followed by every visible, UTF-8 named directory under
/// `envs_dir`, in the order the filesystem returns them.
///
/// # Errors
/// Returns [`CondaError::Io`] if `envs_dir` cannot be read.
pub fn environment_names(envs_dir: &Path) -> Result<Vec<String>> {
    let mut names = vec![BASE_ENVIRONMENT.to_string()];
    let entries = fs::read_dir(envs_dir).map_err(|err| CondaError::io(envs_dir, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| CondaError::io(envs_dir, err))?;
        let file_type = entry
            .file_type()
            .map_err(|err| CondaError::io(entry.path(), err))?;
        let is_dir = file_type.is_dir() || (file_type.is_symlink() && entry.path().is_dir());
        if !is_dir {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                trace!(name = ?raw, "skipping environment directory with a non-UTF-8 name");
                continue;
            }
        };
        if name.starts_with('.') {
            trace!(%name, "skipping hidden environment directory");
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

/// Which environment calls without an explicit name operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEnvironment {
    name: String,
}

impl Default for ActiveEnvironment {
    fn default() -> Self {
        Self {
            name: BASE_ENVIRONMENT.to_string(),
        }
    }
}

impl ActiveEnvironment {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Switches to `name` if it is one of `known`.
    ///
    /// # Errors
    /// Returns [`CondaError::UnknownEnvironment`] and leaves the state untouched
    /// when `name` is not listed.
    pub fn activate(&mut self, name: &str, known: &[String]) -> Result<()> {
        if known.iter().any(|candidate| candidate == name) {
            self.name = name.to_string();
            Ok(())
        } else {
            Err(CondaError::UnknownEnvironment {
                name: name.to_string(),
            })
        }
    }

    pub fn deactivate(&mut self) {
        self.name = BASE_ENVIRONMENT.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_container_lists_only_base() {
        let temp = tempdir().unwrap();
        assert_eq!(environment_names(temp.path()).unwrap(), vec!["base"]);
    }

    #[test]
    fn hidden_entries_and_files_are_skipped() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("science")).unwrap();
        fs::create_dir(temp.path().join(".trash")).unwrap();
        fs::write(temp.path().join(".conda_envs_dir_test"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        let names = environment_names(temp.path()).unwrap();

        assert_eq!(names, vec!["base", "science"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("good")).unwrap();
        fs::create_dir(temp.path().join(OsStr::from_bytes(b"bad\xff"))).unwrap();

        let names = environment_names(temp.path()).unwrap();

        assert_eq!(names, vec!["base", "good"]);
    }

    #[test]
    fn base_comes_first_even_with_many_environments() {
        let temp = tempdir().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            fs::create_dir(temp.path().join(name)).unwrap();
        }
        let names = environment_names(temp.path()).unwrap();
        assert_eq!(names.first().map(String::as_str), Some("base"));
        let mut rest = names[1..].to_vec();
        rest.sort();
        assert_eq!(rest, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn missing_container_is_an_io_error() {
        let temp = tempdir().unwrap();
        let err = environment_names(&temp.path().join("envs")).unwrap_err();
        assert!(matches!(err, CondaError::Io { .. }), "unexpected {err:?}");
    }

    #[test]
    fn activation_is_guarded_by_membership() {
        let known = vec!["base".to_string(), "x".to_string()];
        let mut active = ActiveEnvironment::default();
        assert_eq!(active.name(), "base");

        active.activate("x", &known).unwrap();
        assert_eq!(active.name(), "x");

        let err = active.activate("missing", &known).unwrap_err();
        assert!(matches!(err, CondaError::UnknownEnvironment { .. }));
        assert_eq!(active.name(), "x");

        active.deactivate();
        assert_eq!(active.name(), "base");
    }
}
