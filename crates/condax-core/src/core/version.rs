use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use pep440_rs::Version;

use crate::{CondaError, Result};

/// Parsed `conda -V` output such as `conda 23.1.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondaVersion {
    pub tool: String,
    pub version: Version,
}

impl CondaVersion {
    /// # Errors
    /// Returns [`CondaError::InvalidVersion`] unless `raw` is `<tool> <version>`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || CondaError::InvalidVersion {
            raw: raw.to_string(),
        };
        let mut parts = raw.split_whitespace();
        let (Some(tool), Some(version), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let version = Version::from_str(version).map_err(|_| invalid())?;
        Ok(Self {
            tool: tool.to_string(),
            version,
        })
    }
}

impl PartialOrd for CondaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CondaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.tool.cmp(&other.tool))
    }
}

impl fmt::Display for CondaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tool, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_and_version() {
        let parsed = CondaVersion::parse("conda 23.1.0").unwrap();
        assert_eq!(parsed.tool, "conda");
        assert_eq!(parsed.to_string(), "conda 23.1.0");
    }

    #[test]
    fn orders_by_version_not_text() {
        let older = CondaVersion::parse("conda 4.9.2").unwrap();
        let newer = CondaVersion::parse("conda 4.10.0").unwrap();
        assert!(older < newer);
    }

    #[test]
    fn rejects_unexpected_shapes() {
        for raw in ["", "conda", "conda 23.1.0 extra", "conda not-a-version"] {
            assert!(
                matches!(CondaVersion::parse(raw), Err(CondaError::InvalidVersion { .. })),
                "{raw:?} should not parse"
            );
        }
    }
}
