// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Mapping between issues and branches.
//!
//! Each issue lives on its own branch named by a fixed prefix followed by the
//! padded issue identifier, e.g., "issue/0007". The main branch is the resting
//! state of the tracker and never holds an issue. Every other branch is
//! __foreign__ and gets ignored, even if it happens to carry the prefix.

use crate::id::IssueId;

/// What a given branch means to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchKind {
    /// The main branch.
    Main,

    /// Branch that holds an issue.
    Issue(IssueId),

    /// Branch the tracker does not own.
    Foreign,
}

/// Convert issue identifiers to branch names and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchMapper {
    prefix: String,
    main: String,
}

impl BranchMapper {
    /// Construct new branch mapper.
    pub fn new(prefix: impl Into<String>, main: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            main: main.into(),
        }
    }

    /// Name of main branch.
    pub fn main(&self) -> &str {
        self.main.as_str()
    }

    /// Branch name of given issue.
    pub fn issue_branch(&self, id: IssueId) -> String {
        format!("{}{}", self.prefix, id.encode())
    }

    /// Map identifier text to branch name.
    ///
    /// The name of the main branch passes through unchanged. Anything else is
    /// canonicalized as an issue identifier first. Returns `None` if the text
    /// does not decode, so an invalid identifier can never name a branch.
    pub fn to_branch(&self, text: impl AsRef<str>) -> Option<String> {
        let text = text.as_ref();
        if text == self.main {
            return Some(self.main.clone());
        }

        IssueId::decode(text).map(|id| self.issue_branch(id))
    }

    /// Map branch name to issue identifier.
    ///
    /// Returns `None` for the main branch and for foreign branches.
    pub fn to_id(&self, branch: impl AsRef<str>) -> Option<IssueId> {
        match self.classify(branch) {
            BranchKind::Issue(id) => Some(id),
            BranchKind::Main | BranchKind::Foreign => None,
        }
    }

    /// Determine what a branch means to the tracker.
    ///
    /// Only suffixes in canonical form count as issues, which keeps the
    /// mapping between identifiers and branch names one-to-one. Thus,
    /// "issue/7" is foreign while "issue/0007" is issue 7.
    pub fn classify(&self, branch: impl AsRef<str>) -> BranchKind {
        let branch = branch.as_ref();
        if branch == self.main {
            return BranchKind::Main;
        }

        branch
            .strip_prefix(self.prefix.as_str())
            .and_then(|suffix| {
                IssueId::decode(suffix).filter(|id| id.encode() == suffix)
            })
            .map_or(BranchKind::Foreign, BranchKind::Issue)
    }
}
