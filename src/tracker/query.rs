// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Issue queries.
//!
//! Queries read the record of each issue straight out of the tip commit of its
//! branch. Nothing gets checked out, so the working tree and the open issue
//! stay exactly as they were.
//!
//! # Filtering
//!
//! A filter is a key plus an optional value. An empty key matches every issue.
//! Otherwise, an issue matches if its record has a field with that key, and,
//! when a value is given, the field holds exactly that value. There is no
//! pattern or partial matching.

use crate::{
    id::IssueId,
    record::Record,
    tracker::{Result, Tracker, TrackerError},
    tracker::vcs::{Vcs, VcsError},
};

use std::collections::BTreeSet;
use tracing::warn;

impl<V> Tracker<V>
where
    V: Vcs,
{
    /// Identifiers of all issues in ascending order.
    ///
    /// The main branch and foreign branches are skipped.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`](crate::tracker::TrackerError::Vcs) if
    ///   branches cannot be listed.
    pub fn issue_ids(&self) -> Result<Vec<IssueId>> {
        let ids = self
            .vcs
            .branches()?
            .iter()
            .filter_map(|branch| self.mapper.to_id(branch))
            .collect::<BTreeSet<_>>();

        Ok(ids.into_iter().collect())
    }

    /// Record text of issue as last saved.
    ///
    /// A branch lacking the record file yields empty text.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`](crate::tracker::TrackerError::Vcs) if
    ///   the branch cannot be read.
    pub fn issue_text(&self, id: IssueId) -> Result<String> {
        let branch = self.mapper.issue_branch(id);
        Ok(self
            .vcs
            .file_at(&branch, self.record_filename())?
            .unwrap_or_default())
    }

    /// Parsed record of issue as last saved.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError`](crate::tracker::TrackerError) if the record
    ///   cannot be read or parsed.
    pub fn record_of(&self, id: IssueId) -> Result<Record> {
        Ok(self.issue_text(id)?.parse()?)
    }

    /// Look up field value of issue as last saved.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError`](crate::tracker::TrackerError) if the record
    ///   cannot be read or parsed.
    pub fn field_of(&self, id: IssueId, key: impl AsRef<str>) -> Result<Option<String>> {
        Ok(self.record_of(id)?.get(key).map(ToString::to_string))
    }

    /// Identifiers of all issues matching filter, in ascending order.
    ///
    /// Issues whose record cannot be parsed, or is not text, are reported, and
    /// treated as if they had no fields at all.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`](crate::tracker::TrackerError::Vcs) if
    ///   branches or records cannot be read.
    pub fn matching(&self, key: impl AsRef<str>, value: impl AsRef<str>) -> Result<Vec<IssueId>> {
        let (key, value) = (key.as_ref(), value.as_ref());
        let mut matches = Vec::new();
        for id in self.issue_ids()? {
            if key.is_empty() {
                matches.push(id);
                continue;
            }

            let text = match self.issue_text(id) {
                Ok(text) => text,
                Err(TrackerError::Vcs(error @ VcsError::NotUtf8 { .. })) => {
                    warn!("skipping issue {id}: {error}");
                    continue;
                }
                Err(error) => return Err(error),
            };

            let record: Record = match text.parse() {
                Ok(record) => record,
                Err(error) => {
                    warn!("skipping issue {id}: {error}");
                    continue;
                }
            };

            if record
                .get(key)
                .is_some_and(|found| value.is_empty() || found == value)
            {
                matches.push(id);
            }
        }

        Ok(matches)
    }
}
