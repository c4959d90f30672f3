//! Testing utilities for package runs.
//!
//! This module provides:
//! - A recording mock framework and fixed-state tools
//! - A project fixture wired to the mock
//! - Assertions over stage errors and sink outcomes

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_outcomes, assert_stage_failure};
pub use fixtures::{SharedBuffer, TestFixture};
pub use mocks::{MockFrameworkService, StaticTool};
