//! Integration test suite for opsbot.
//!
//! These tests drive real `sh` subprocesses through the full command
//! session pipeline against a recording display sink. They verify the
//! end-to-end behavior the operator sees: progress updates while a
//! command runs, and exactly one finalized report when it exits.
//!
//! # Test Categories
//!
//! - `command_session`: full invocation lifecycle tests
//! - `progress`: mid-run progress streaming and throttling
//!
//! # CI Compatibility
//!
//! No network access is required; the display sink is an in-memory mock
//! and the only external dependency is a POSIX `sh`.

mod fixtures;

mod command_session;
mod progress;
