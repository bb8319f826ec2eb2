// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Branch-per-issue tracking on top of Git.
//!
//! Twig keeps each issue on its own branch of a Git repository. The fields of
//! an issue live in a single plain text record file, which is checked out into
//! the working tree whenever that issue is the open one. The main branch holds
//! no issue, and acts as the resting state when nothing is open.
//!
//! # Layout
//!
//! - [`id`] encodes sequential issue identifiers.
//! - [`branch`] maps identifiers onto branch names.
//! - [`record`] parses and serializes issue records.
//! - [`config`] handles per-repository settings.
//! - [`tracker`] drives the issue lifecycle, queries, and history.

pub mod branch;
pub mod config;
pub mod id;
pub mod record;
pub mod tracker;

pub use branch::{BranchKind, BranchMapper};
pub use config::{editor_from_env, TrackerSettings};
pub use id::IssueId;
pub use record::{Field, FieldValue, Record};
pub use tracker::{vcs::Git2Vcs, Tracker, TrackerError};
