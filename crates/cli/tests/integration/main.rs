//! End-to-end CLI tests against a scripted container engine.

#![cfg(unix)]

mod common;
mod install_tests;
mod maintenance_tests;
mod session_tests;
