// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! In-memory stand-in for a Git repository.
//!
//! Commits and the index live in memory, while the working tree is a real
//! directory so record files can be edited like usual.

use crate::tracker::vcs::{BlameLine, Result, Vcs, VcsError};

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fs::{create_dir_all, read_to_string, remove_file, write},
    path::{Path, PathBuf},
};

type Files = BTreeMap<PathBuf, String>;

#[derive(Debug, Clone)]
struct Snapshot {
    message: String,
    files: Files,
}

#[derive(Debug, Default)]
struct State {
    head: String,
    branches: BTreeMap<String, Vec<Snapshot>>,
    index: Files,
}

#[derive(Debug)]
pub(crate) struct FakeVcs {
    workdir: PathBuf,
    gitdir: PathBuf,
    state: RefCell<State>,
}

impl FakeVcs {
    /// Commit messages of branch, oldest first.
    pub(crate) fn messages(&self, branch: &str) -> Vec<String> {
        self.state
            .borrow()
            .branches
            .get(branch)
            .map(|history| history.iter().map(|snapshot| snapshot.message.clone()).collect())
            .unwrap_or_default()
    }

    fn tip(&self, branch: &str) -> Files {
        self.state
            .borrow()
            .branches
            .get(branch)
            .and_then(|history| history.last())
            .map(|snapshot| snapshot.files.clone())
            .unwrap_or_default()
    }

    fn history(&self, branch: &str) -> Result<Vec<Snapshot>> {
        self.state
            .borrow()
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| VcsError::MissingBranch(branch.to_string()))
    }

    fn read_working(&self, path: &Path) -> Option<String> {
        read_to_string(self.workdir.join(path)).ok()
    }

    fn write_working(&self, path: &Path, content: &str) -> Result<()> {
        Ok(write(self.workdir.join(path), content)?)
    }

    fn modified_paths(&self) -> BTreeSet<PathBuf> {
        let head = self.state.borrow().head.clone();
        let tip = self.tip(&head);
        let index = self.state.borrow().index.clone();

        tip.keys()
            .chain(index.keys())
            .filter(|path| {
                let committed = tip.get(*path);
                committed != index.get(*path)
                    || committed.cloned() != self.read_working(path)
            })
            .cloned()
            .collect()
    }
}

impl Vcs for FakeVcs {
    fn init(path: &Path, main_branch: &str) -> Result<Self> {
        let gitdir = path.join(".fakegit");
        if gitdir.exists() {
            return Err(VcsError::AlreadyExists(path.to_path_buf()));
        }
        create_dir_all(&gitdir)?;

        Ok(Self {
            workdir: path.to_path_buf(),
            gitdir,
            state: RefCell::new(State {
                head: main_branch.to_string(),
                ..State::default()
            }),
        })
    }

    fn discover(path: &Path) -> Result<Self> {
        Err(VcsError::Bare(path.to_path_buf()))
    }

    fn workdir(&self) -> &Path {
        self.workdir.as_path()
    }

    fn gitdir(&self) -> &Path {
        self.gitdir.as_path()
    }

    fn current_branch(&self) -> Result<String> {
        Ok(self.state.borrow().head.clone())
    }

    fn branches(&self) -> Result<Vec<String>> {
        Ok(self.state.borrow().branches.keys().cloned().collect())
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state.borrow().branches.contains_key(name))
    }

    fn create_branch(&self, name: &str, start: &str) -> Result<()> {
        if self.branch_exists(name)? {
            return Err(git2::Error::from_str("branch already exists").into());
        }

        let history = self.history(start)?;
        self.state
            .borrow_mut()
            .branches
            .insert(name.to_string(), history);

        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let target = self.history(name)?.last().map(|s| s.files.clone()).unwrap_or_default();
        let head = self.current_branch()?;
        let current = self.tip(&head);
        let modified = self.modified_paths();

        // Same rule as a safe checkout: keep local edits unless the target
        // changes that very file.
        if modified.iter().any(|path| current.get(path) != target.get(path)) {
            return Err(git2::Error::from_str("checkout would overwrite local changes").into());
        }

        for path in current.keys().filter(|path| !target.contains_key(*path)) {
            if !modified.contains(path) {
                let _ = remove_file(self.workdir.join(path));
            }
        }

        for (path, content) in &target {
            if !modified.contains(path) {
                self.write_working(path, content)?;
            }
        }

        // Local edits keep whatever the index held for them.
        let mut state = self.state.borrow_mut();
        let mut index = target;
        for path in &modified {
            match state.index.get(path).cloned() {
                Some(staged) => index.insert(path.clone(), staged),
                None => index.remove(path),
            };
        }
        state.index = index;
        state.head = name.to_string();

        Ok(())
    }

    fn stage(&self, path: &Path) -> Result<()> {
        let content = read_to_string(self.workdir.join(path))?;
        self.state
            .borrow_mut()
            .index
            .insert(path.to_path_buf(), content);

        Ok(())
    }

    fn commit(&self, message: &str) -> Result<bool> {
        let head = self.current_branch()?;
        let mut state = self.state.borrow_mut();
        let snapshot = Snapshot {
            message: message.to_string(),
            files: state.index.clone(),
        };

        let history = state.branches.entry(head).or_default();
        if history.last().is_some_and(|tip| tip.files == snapshot.files) {
            return Ok(false);
        }
        history.push(snapshot);

        Ok(true)
    }

    fn reset_hard(&self) -> Result<()> {
        let head = self.current_branch()?;
        let tip = self.tip(&head);
        let index = self.state.borrow().index.clone();

        for path in index.keys().filter(|path| !tip.contains_key(*path)) {
            let _ = remove_file(self.workdir.join(path));
        }

        for (path, content) in &tip {
            self.write_working(path, content)?;
        }

        self.state.borrow_mut().index = tip;

        Ok(())
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(!self.modified_paths().is_empty())
    }

    fn file_at(&self, branch: &str, path: &Path) -> Result<Option<String>> {
        let history = self.history(branch)?;
        Ok(history
            .last()
            .and_then(|snapshot| snapshot.files.get(path).cloned()))
    }

    fn blame(&self, branch: &str, path: &Path) -> Result<Vec<BlameLine>> {
        let history = self.history(branch)?;
        let content = self
            .file_at(branch, path)?
            .ok_or_else(|| VcsError::MissingFile {
                branch: branch.to_string(),
                path: path.to_path_buf(),
            })?;

        let line_at = |snapshot: &Snapshot, index: usize| {
            snapshot
                .files
                .get(path)
                .and_then(|text| text.lines().nth(index).map(ToString::to_string))
        };

        let mut lines = Vec::new();
        for (index, line) in content.lines().enumerate() {
            // INVARIANT: Walk back while the line stays the same.
            let mut origin = history.len() - 1;
            while origin > 0 && line_at(&history[origin - 1], index).as_deref() == Some(line) {
                origin -= 1;
            }

            lines.push(BlameLine {
                commit: format!("{origin:08x}"),
                author: "John Doe".into(),
                seconds: origin as i64,
                offset_minutes: 0,
                line_number: index + 1,
                content: line.to_string(),
            });
        }

        Ok(lines)
    }
}
