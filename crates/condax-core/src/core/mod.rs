//! Implementation modules for `condax-core`.
//!
//! Callers normally go through [`crate::CondaManager`] or
//! [`crate::execute`] rather than these modules.

pub mod commands;
pub mod config;
pub mod effects;
pub mod envvars;
pub mod errors;
pub mod installer;
pub mod manager;
pub(crate) mod net;
pub mod outcome;
pub mod platform;
pub mod process;
pub mod registry;
pub mod runner;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;
