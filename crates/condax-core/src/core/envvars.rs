use indexmap::IndexMap;

use crate::{CondaError, Result};

const SEPARATOR: &str = " = ";

/// Variables declared for one environment, in the order conda printed them.
pub type EnvironmentVariables = IndexMap<String, String>;

/// Parses `conda env config vars list` output.
///
/// Every non-blank line must read `KEY = VALUE`; the value is everything after
/// the first separator, so values may themselves contain `" = "`. A line
/// without the separator fails the whole parse.
///
/// # Errors
/// Returns [`CondaError::MalformedVariableLine`] for the first offending line.
pub fn parse_variables(output: &str) -> Result<EnvironmentVariables> {
    let mut vars = IndexMap::new();
    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(SEPARATOR)
            .ok_or_else(|| CondaError::MalformedVariableLine {
                line: line.to_string(),
            })?;
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
