// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Issue lifecycle management.
//!
//! A __tracker__ is a Git repository whose branches hold issues. Each issue
//! branch carries a single record file at the top-level of the working tree,
//! and the main branch carries the default record that new issues start from.
//!
//! # Open Issues
//!
//! At most one issue is __open__ at any time, i.e., the issue whose branch is
//! currently checked out. When the main branch is checked out, no issue is
//! open. The tracker never keeps track of this on its own. Every operation
//! asks the repository which branch is checked out, because a user is free to
//! switch branches by hand in between two invocations.
//!
//! The lifecycle of an open issue looks like this:
//!
//! 1. [`Tracker::new_issue`] or [`Tracker::open_issue`] checks out a branch.
//! 2. The record file gets edited, either by hand or [`Tracker::set_field`].
//! 3. [`Tracker::save`] commits the record onto the issue branch.
//! 4. [`Tracker::cancel`] drops unsaved edits, and returns to main.
//!
//! [`Tracker::close`] combines steps three and four.
//!
//! # Dirty Working Trees
//!
//! Switching issues while uncommitted changes exist would either drag those
//! changes along to the other branch, or lose them. By default the tracker
//! refuses to do so, see [`TrackerSettings::require_clean_checkout`].
//!
//! # See Also
//!
//! 1. [`vcs`]
//! 2. [`query`]

pub mod history;
pub mod query;
pub mod store;
pub mod vcs;

use crate::{
    branch::{BranchKind, BranchMapper},
    config::{TrackerSettings, SETTINGS_FILE},
    id::IssueId,
    record::Record,
    tracker::vcs::{Git2Vcs, Vcs},
};

use std::{
    fs::write,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Commit message of initial commit on main.
pub const INIT_MESSAGE: &str = "Issue repo initialized.";

/// Commit message of every save.
pub const SAVE_MESSAGE: &str = "Updated issue.";

/// Branch-per-issue tracker.
#[derive(Debug)]
pub struct Tracker<V = Git2Vcs>
where
    V: Vcs,
{
    pub(crate) vcs: V,
    pub(crate) settings: TrackerSettings,
    pub(crate) mapper: BranchMapper,
}

impl<V> Tracker<V>
where
    V: Vcs,
{
    /// Construct tracker on top of already opened repository.
    pub fn new(vcs: V, settings: TrackerSettings) -> Self {
        let mapper = BranchMapper::new(&settings.branch_prefix, &settings.main_branch);
        Self {
            vcs,
            settings,
            mapper,
        }
    }

    /// Initialize a new tracker.
    ///
    /// Creates a new repository at target path whose first commit on the main
    /// branch holds the default issue record. The settings are stored inside
    /// the gitdir so later invocations pick them up.
    ///
    /// Nothing is rolled back if a step fails midway.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`] if a repository already exists at
    ///   path, or repository operations fail.
    /// - Return [`TrackerError::Io`] if record file cannot be written.
    /// - Return [`TrackerError::Config`] if settings cannot be written.
    #[instrument(skip(path, settings), level = "debug")]
    pub fn init(path: impl AsRef<Path>, settings: TrackerSettings) -> Result<Self> {
        let vcs = V::init(path.as_ref(), &settings.main_branch)?;
        settings.save(vcs.gitdir().join(SETTINGS_FILE))?;
        let tracker = Self::new(vcs, settings);

        let record_path = tracker.record_path();
        write(&record_path, Record::default_issue().to_string()).map_err(|source| {
            TrackerError::Io {
                path: record_path.clone(),
                source,
            }
        })?;
        tracker.vcs.stage(tracker.record_filename())?;
        tracker.vcs.commit(INIT_MESSAGE)?;
        info!("initialized tracker at {:?}", tracker.vcs.workdir().display());

        Ok(tracker)
    }

    /// Open existing tracker.
    ///
    /// Searches for the repository at target path or any of its parents, and
    /// loads its settings.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`] if no repository can be found.
    /// - Return [`TrackerError::Config`] if settings are invalid.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let vcs = V::discover(path.as_ref())?;
        let settings = TrackerSettings::load(vcs.gitdir().join(SETTINGS_FILE))?;

        Ok(Self::new(vcs, settings))
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn mapper(&self) -> &BranchMapper {
        &self.mapper
    }

    /// Currently open issue, if any.
    ///
    /// Returns `None` when main, a foreign branch, or a detached HEAD is
    /// checked out.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`] if current branch cannot be determined.
    pub fn current_issue(&self) -> Result<Option<IssueId>> {
        let branch = self.vcs.current_branch()?;
        match self.mapper.classify(&branch) {
            BranchKind::Issue(id) => Ok(Some(id)),
            BranchKind::Main => Ok(None),
            BranchKind::Foreign => {
                warn!("foreign branch {branch:?} is checked out");
                Ok(None)
            }
        }
    }

    /// Check for uncommitted changes in working tree.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`] if status cannot be determined.
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(self.vcs.is_dirty()?)
    }

    /// Check if issue exists.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`] if branch lookup fails.
    pub fn issue_exists(&self, id: IssueId) -> Result<bool> {
        Ok(self.vcs.branch_exists(&self.mapper.issue_branch(id))?)
    }

    /// Resolve user supplied text into identifier of existing issue.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::InvalidId`] if text is not an identifier.
    /// - Return [`TrackerError::NotFound`] if no such issue exists.
    pub fn resolve(&self, text: impl AsRef<str>) -> Result<IssueId> {
        let text = text.as_ref();
        let id = IssueId::decode(text).ok_or_else(|| TrackerError::InvalidId(text.to_string()))?;
        if !self.issue_exists(id)? {
            return Err(TrackerError::NotFound(id));
        }

        Ok(id)
    }

    /// Create and open a new issue.
    ///
    /// The new issue takes the identifier that follows the largest existing
    /// one, and branches off the tip of main so it starts with the default
    /// record.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Dirty`] if uncommitted changes exist.
    /// - Return [`TrackerError::Vcs`] if branch creation or checkout fails.
    #[instrument(skip(self), level = "debug")]
    pub fn new_issue(&self) -> Result<IssueId> {
        self.ensure_clean("create new issue")?;

        let id = self
            .issue_ids()?
            .into_iter()
            .max()
            .map_or(IssueId::FIRST, IssueId::next);
        let branch = self.mapper.issue_branch(id);
        if self.vcs.branch_exists(&branch)? {
            return Err(TrackerError::Collision(id));
        }

        self.vcs.create_branch(&branch, self.mapper.main())?;
        self.vcs.checkout(&branch)?;
        info!("created issue {id}");

        Ok(id)
    }

    /// Open existing issue.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::NotFound`] if issue does not exist.
    /// - Return [`TrackerError::Dirty`] if uncommitted changes exist.
    /// - Return [`TrackerError::Vcs`] if checkout fails.
    #[instrument(skip(self), level = "debug")]
    pub fn open_issue(&self, id: IssueId) -> Result<()> {
        if !self.issue_exists(id)? {
            return Err(TrackerError::NotFound(id));
        }

        if self.current_issue()? == Some(id) {
            return Ok(());
        }

        self.ensure_clean(format!("open issue {id}"))?;
        self.vcs.checkout(&self.mapper.issue_branch(id))?;
        info!("opened issue {id}");

        Ok(())
    }

    /// Commit record of open issue.
    ///
    /// Stages the record file along with anything attached earlier, and
    /// commits it onto the issue branch. Saving without changes is fine, and
    /// creates no commit. Returns to main afterwards when
    /// [`TrackerSettings::save_returns_to_main`] is set.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::NoOpenIssue`] if no issue is open.
    /// - Return [`TrackerError::Vcs`] if staging or committing fails.
    #[instrument(skip(self), level = "debug")]
    pub fn save(&self) -> Result<()> {
        let id = self.require_open("save")?;
        self.vcs.stage(self.record_filename())?;
        if self.vcs.commit(SAVE_MESSAGE)? {
            info!("saved issue {id}");
        } else {
            info!("issue {id} has no changes to save");
        }

        if self.settings.save_returns_to_main {
            self.vcs.checkout(self.mapper.main())?;
        }

        Ok(())
    }

    /// Drop all uncommitted changes, and return to main.
    ///
    /// Any edit that was not saved is lost for good.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Vcs`] if reset or checkout fails.
    #[instrument(skip(self), level = "debug")]
    pub fn cancel(&self) -> Result<()> {
        self.vcs.reset_hard()?;
        self.vcs.checkout(self.mapper.main())?;
        info!("returned to {}", self.mapper.main());

        Ok(())
    }

    /// Save open issue, then return to main.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError`] from [`Tracker::save`] or
    ///   [`Tracker::cancel`]. Nothing is cancelled if saving fails.
    pub fn close(&self) -> Result<()> {
        self.save()?;
        self.cancel()
    }

    /// Stage file for next save of open issue.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::NoOpenIssue`] if no issue is open.
    /// - Return [`TrackerError::Io`] if file cannot be resolved.
    /// - Return [`TrackerError::OutsideWorkdir`] if file is not inside the
    ///   working tree.
    /// - Return [`TrackerError::Vcs`] if staging fails.
    #[instrument(skip(self, path), level = "debug")]
    pub fn attach(&self, path: impl AsRef<Path>) -> Result<()> {
        let id = self.require_open("attach file")?;
        let path = path.as_ref();
        let absolute = path.canonicalize().map_err(|source| TrackerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let workdir = self
            .vcs
            .workdir()
            .canonicalize()
            .map_err(|source| TrackerError::Io {
                path: self.vcs.workdir().to_path_buf(),
                source,
            })?;
        let relative = absolute
            .strip_prefix(&workdir)
            .map_err(|_| TrackerError::OutsideWorkdir(path.to_path_buf()))?;

        self.vcs.stage(relative)?;
        info!("attached {:?} to issue {id}", relative.display());

        Ok(())
    }

    pub(crate) fn require_open(&self, operation: &'static str) -> Result<IssueId> {
        self.current_issue()?
            .ok_or(TrackerError::NoOpenIssue(operation))
    }

    fn ensure_clean(&self, operation: impl Into<String>) -> Result<()> {
        if self.settings.require_clean_checkout && self.vcs.is_dirty()? {
            return Err(TrackerError::Dirty(operation.into()));
        }

        Ok(())
    }
}

/// Tracker error types.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Text does not decode into an identifier.
    #[error("{0:?} is not a valid issue identifier")]
    InvalidId(String),

    /// Identifier is valid, but no such issue exists.
    #[error("issue {0} does not exist")]
    NotFound(IssueId),

    /// Branch of freshly allocated identifier already exists.
    #[error("branch for new issue {0} already exists")]
    Collision(IssueId),

    /// Uncommitted changes block the operation.
    #[error("cannot {0}: working tree has uncommitted changes (save or cancel first)")]
    Dirty(String),

    /// Operation needs an open issue.
    #[error("cannot {0}: no issue is open")]
    NoOpenIssue(&'static str),

    /// Attached file lies outside of working tree.
    #[error("cannot attach {0:?}: file is outside of working tree")]
    OutsideWorkdir(PathBuf),

    /// Record of open issue has no such field.
    #[error("issue {id} has no field named {key:?}")]
    NoSuchField { id: IssueId, key: String },

    /// Record text is malformed.
    #[error(transparent)]
    Record(#[from] crate::record::RecordError),

    /// File system operations fail.
    #[error("cannot access {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Settings cannot be read or written.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Repository operations fail.
    #[error(transparent)]
    Vcs(#[from] crate::tracker::vcs::VcsError),
}

/// Friendly result alias :3
pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

#[cfg(test)]
pub(crate) mod fake;
