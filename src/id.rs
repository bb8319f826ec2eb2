// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Issue identifiers.
//!
//! Every issue is named by a sequential non-negative integer. The textual form
//! of an identifier is always zero-padded to [`IssueId::WIDTH`] digits, e.g.,
//! issue 7 is written as "0007". This padded form doubles as the suffix of the
//! branch that holds the issue.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Sequential issue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IssueId(u32);

impl IssueId {
    /// Width that all encoded identifiers are padded to.
    pub const WIDTH: usize = 4;

    /// Identifier handed out when no issue exists yet.
    pub const FIRST: Self = Self(1);

    /// Construct identifier from raw number.
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Raw number behind identifier.
    pub fn number(self) -> u32 {
        self.0
    }

    /// Encode identifier into its zero-padded textual form.
    pub fn encode(self) -> String {
        format!("{:0width$}", self.0, width = Self::WIDTH)
    }

    /// Decode identifier from text.
    ///
    /// Returns `None` for anything that is not a non-negative integer. Leading
    /// zeros are accepted, so "7", "07", and "0007" all name the same issue.
    pub fn decode(text: impl AsRef<str>) -> Option<Self> {
        let text = text.as_ref();
        if text.is_empty() || !text.bytes().all(|byte| byte.is_ascii_digit()) {
            return None;
        }

        text.parse::<u32>().ok().map(Self)
    }

    /// Identifier that directly follows this one.
    ///
    /// Saturates at `u32::MAX`, i.e., the largest identifier is its own successor.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Canonicalize identifier text, i.e., decode then encode it again.
    pub fn canonicalize(text: impl AsRef<str>) -> Option<String> {
        Self::decode(text).map(Self::encode)
    }
}

impl Display for IssueId {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.encode().as_str())
    }
}

impl FromStr for IssueId {
    type Err = IdError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::decode(text).ok_or_else(|| IdError::Invalid(text.to_string()))
    }
}

/// Identifier error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// Text does not decode into an identifier.
    #[error("{0:?} is not a valid issue identifier")]
    Invalid(String),
}
