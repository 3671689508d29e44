//! dockerapp-lib: packaging, installing and running desktop apps in containers
//!
//! This crate provides the building blocks of dockerapp:
//! - `Manifest`: the package descriptor found in every `.dockerApp` archive
//! - `AppPaths`: the on-disk layout of an installed app
//! - `Artifacts`: the Dockerfile, bridge/entry scripts and shims of an install
//! - `Session`: the shared per-app container and its consumers

pub mod app;
pub mod app_lock;
pub mod archive;
pub mod consts;
pub mod engine;
pub mod generate;
pub mod install;
pub mod manifest;
pub mod platform;
pub mod session;
pub mod store;
pub mod util;
