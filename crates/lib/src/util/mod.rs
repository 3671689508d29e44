//! Shared utilities.
//!
//! Filesystem helpers used by the installer and app maintenance, plus test
//! helpers.

pub mod fs;

#[cfg(test)]
pub mod testutil;
