//! # ccon-common
//!
//! Shared error definitions, the container configuration model, runtime
//! constants, and bounded path helpers used across the ccon workspace.
//!
//! This crate is the leaf of the dependency graph — it depends on no other
//! internal crate and provides the foundational primitives that the core
//! and runtime crates build upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod paths;
