//! Shared test utilities for the quicklooks workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic PPI sweep generators
//! - A JSON fixture format and matching `SweepDecoder`
//! - Scratch directory helpers for day-tree layouts
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{synthetic_sweep, write_fixture, JsonSweepDecoder};
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

