// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control access.
//!
//! The tracker never talks to Git directly. Instead, every repository
//! operation it needs goes through the [`Vcs`] trait. The checked out branch is
//! state owned by the repository itself, and anyone can change it between two
//! calls, e.g., a user running `git checkout` by hand. Thus, implementations
//! must always ask the repository, and never remember the answer.
//!
//! [`Git2Vcs`] is the real implementation backed by libgit2.

use git2::{
    build::CheckoutBuilder, BlameOptions, BranchType, ErrorCode, Oid, Repository,
    RepositoryInitOptions, ResetType, Signature, Status, StatusOptions,
};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Identity used for commits when the user has not configured one.
const FALLBACK_NAME: &str = "twig";
const FALLBACK_EMAIL: &str = "twig@localhost";

/// Annotation for a single line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    /// Abbreviated id of commit that last touched the line.
    pub commit: String,

    /// Author name of that commit.
    pub author: String,

    /// Commit time in seconds since the Unix epoch.
    pub seconds: i64,

    /// Offset of commit time zone from UTC in minutes.
    pub offset_minutes: i32,

    /// Line number starting at 1.
    pub line_number: usize,

    /// Content of the line.
    pub content: String,
}

/// Repository operations that the tracker builds upon.
pub trait Vcs {
    /// Create new repository whose first branch is `main_branch`.
    fn init(path: &Path, main_branch: &str) -> Result<Self>
    where
        Self: Sized;

    /// Find existing repository at or above `path`.
    fn discover(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Top-level of working tree.
    fn workdir(&self) -> &Path;

    /// Directory holding repository metadata.
    fn gitdir(&self) -> &Path;

    /// Name of currently checked out branch.
    fn current_branch(&self) -> Result<String>;

    /// Names of all local branches.
    fn branches(&self) -> Result<Vec<String>>;

    /// Check if local branch exists.
    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Create branch `name` pointing at tip of branch `start`.
    fn create_branch(&self, name: &str, start: &str) -> Result<()>;

    /// Switch working tree and HEAD to branch.
    fn checkout(&self, name: &str) -> Result<()>;

    /// Stage file relative to working tree.
    fn stage(&self, path: &Path) -> Result<()>;

    /// Commit index onto current branch.
    ///
    /// Returns `false` without committing if nothing changed.
    fn commit(&self, message: &str) -> Result<bool>;

    /// Throw away all uncommitted changes to tracked files.
    fn reset_hard(&self) -> Result<()>;

    /// Check for uncommitted changes to tracked files.
    fn is_dirty(&self) -> Result<bool>;

    /// Content of file as committed at tip of branch.
    ///
    /// Returns `None` if the branch does not contain the file, and
    /// [`VcsError::NotUtf8`] if its content is not text.
    fn file_at(&self, branch: &str, path: &Path) -> Result<Option<String>>;

    /// Per-line annotation of file as committed at tip of branch.
    fn blame(&self, branch: &str, path: &Path) -> Result<Vec<BlameLine>>;
}

/// Repository access through libgit2.
pub struct Git2Vcs {
    repository: Repository,
    workdir: PathBuf,
}

impl std::fmt::Debug for Git2Vcs {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Git2Vcs")
            .field("gitdir", &self.repository.path())
            .field("workdir", &self.workdir)
            .finish()
    }
}

impl Git2Vcs {
    fn from_repository(repository: Repository) -> Result<Self> {
        let workdir = repository
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| VcsError::Bare(repository.path().to_path_buf()))?;

        Ok(Self {
            repository,
            workdir,
        })
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repository.signature() {
            Ok(signature) => Ok(signature),
            Err(error) if error.code() == ErrorCode::NotFound => {
                debug!("no user identity configured, using {FALLBACK_NAME}");
                Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn branch_tip(&self, name: &str) -> Result<git2::Commit<'_>> {
        match self.repository.find_branch(name, BranchType::Local) {
            Ok(branch) => Ok(branch.get().peel_to_commit()?),
            Err(error) if error.code() == ErrorCode::NotFound => {
                Err(VcsError::MissingBranch(name.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl Vcs for Git2Vcs {
    #[instrument(skip(path), level = "debug")]
    fn init(path: &Path, main_branch: &str) -> Result<Self> {
        if Repository::open(path).is_ok() {
            return Err(VcsError::AlreadyExists(path.to_path_buf()));
        }

        info!("initialize new repository: {:?}", path.display());
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(main_branch);
        Self::from_repository(Repository::init_opts(path, &opts)?)
    }

    #[instrument(skip(path), level = "debug")]
    fn discover(path: &Path) -> Result<Self> {
        debug!("discover repository from {:?}", path.display());
        Self::from_repository(Repository::discover(path)?)
    }

    fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    fn gitdir(&self) -> &Path {
        self.repository.path()
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repository.head()?;
        match head.shorthand() {
            Some(name) if head.is_branch() => Ok(name.to_string()),
            _ => Ok("HEAD".into()),
        }
    }

    fn branches(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.repository.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        match self.repository.find_branch(name, BranchType::Local) {
            Ok(_) => Ok(true),
            Err(error) if error.code() == ErrorCode::NotFound => Ok(false),
            Err(error) if error.code() == ErrorCode::InvalidSpec => Ok(false),
            Err(error) => Err(error.into()),
        }
    }

    #[instrument(skip(self), level = "debug")]
    fn create_branch(&self, name: &str, start: &str) -> Result<()> {
        let tip = self.branch_tip(start)?;
        self.repository.branch(name, &tip, false)?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn checkout(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{name}");
        let target = self.branch_tip(name)?;

        // INVARIANT: Never overwrite local modifications on checkout.
        let mut builder = CheckoutBuilder::new();
        builder.safe();
        self.repository
            .checkout_tree(target.as_object(), Some(&mut builder))?;
        self.repository.set_head(&refname)?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn stage(&self, path: &Path) -> Result<()> {
        let mut index = self.repository.index()?;
        index.add_path(path)?;
        index.write()?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn commit(&self, message: &str) -> Result<bool> {
        let mut index = self.repository.index()?;
        let tree_oid = index.write_tree()?;

        let parent = match self.repository.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(error) if error.code() == ErrorCode::UnbornBranch => None,
            Err(error) => return Err(error.into()),
        };

        if parent.as_ref().is_some_and(|commit| commit.tree_id() == tree_oid) {
            debug!("nothing to commit");
            return Ok(false);
        }

        let tree = self.repository.find_tree(tree_oid)?;
        let signature = self.signature()?;
        let parents = parent.iter().collect::<Vec<_>>();
        let oid = self.repository.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        debug!("created commit {oid}");

        Ok(true)
    }

    #[instrument(skip(self), level = "debug")]
    fn reset_hard(&self) -> Result<()> {
        let head = self.repository.head()?.peel_to_commit()?;
        self.repository
            .reset(head.as_object(), ResetType::Hard, None)?;

        Ok(())
    }

    fn is_dirty(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(false).include_ignored(false);
        let statuses = self.repository.statuses(Some(&mut opts))?;

        Ok(statuses
            .iter()
            .any(|entry| entry.status() != Status::CURRENT && !entry.status().is_ignored()))
    }

    fn file_at(&self, branch: &str, path: &Path) -> Result<Option<String>> {
        let tree = self.branch_tip(branch)?.tree()?;
        let entry = match tree.get_path(path) {
            Ok(entry) => entry,
            Err(error) if error.code() == ErrorCode::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let blob = self.repository.find_blob(entry.id())?;
        let text = String::from_utf8(blob.content().to_vec()).map_err(|_| VcsError::NotUtf8 {
            branch: branch.to_string(),
            path: path.to_path_buf(),
        })?;

        Ok(Some(text))
    }

    #[instrument(skip(self), level = "debug")]
    fn blame(&self, branch: &str, path: &Path) -> Result<Vec<BlameLine>> {
        let tip = self.branch_tip(branch)?;
        let content = self
            .file_at(branch, path)?
            .ok_or_else(|| VcsError::MissingFile {
                branch: branch.to_string(),
                path: path.to_path_buf(),
            })?;

        let mut opts = BlameOptions::new();
        opts.newest_commit(tip.id());
        let blame = self.repository.blame_file(path, Some(&mut opts))?;

        let mut authors: HashMap<Oid, (String, i64, i32)> = HashMap::new();
        let mut lines = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            let Some(hunk) = blame.get_line(line_number) else {
                continue;
            };

            let oid = hunk.final_commit_id();
            if !authors.contains_key(&oid) {
                let commit = self.repository.find_commit(oid)?;
                let author = commit.author();
                authors.insert(
                    oid,
                    (
                        author.name().unwrap_or("unknown").to_string(),
                        author.when().seconds(),
                        author.when().offset_minutes(),
                    ),
                );
            }

            let (author, seconds, offset_minutes) = authors[&oid].clone();
            lines.push(BlameLine {
                commit: oid.to_string().chars().take(8).collect(),
                author,
                seconds,
                offset_minutes,
                line_number,
                content: line.to_string(),
            });
        }

        Ok(lines)
    }
}

/// Version control error types.
#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    /// Repository already exists where a new one was requested.
    #[error("repository already exists at {0:?}")]
    AlreadyExists(PathBuf),

    /// Repository has no working tree.
    #[error("repository at {0:?} has no working tree")]
    Bare(PathBuf),

    /// Branch does not exist.
    #[error("branch {0:?} does not exist")]
    MissingBranch(String),

    /// File not present at tip of branch.
    #[error("file {path:?} does not exist on branch {branch:?}")]
    MissingFile { branch: String, path: PathBuf },

    /// File content is not valid UTF-8.
    #[error("file {path:?} on branch {branch:?} is not valid UTF-8")]
    NotUtf8 { branch: String, path: PathBuf },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// File system operations fail.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = VcsError> = std::result::Result<T, E>;
