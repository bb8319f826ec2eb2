// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Working copy record access.
//!
//! Only one version of the record file exists in the working tree at a time,
//! i.e., the version belonging to whatever branch is checked out. Reads and
//! writes here always target that file.

use crate::{
    record::{Record, RecordError},
    tracker::{Result, Tracker, TrackerError},
    tracker::vcs::Vcs,
};

use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

impl<V> Tracker<V>
where
    V: Vcs,
{
    /// Name of record file, relative to top-level of working tree.
    pub fn record_filename(&self) -> &Path {
        Path::new(self.settings.record_filename.as_str())
    }

    /// Absolute path to record file in working tree.
    pub fn record_path(&self) -> PathBuf {
        self.vcs.workdir().join(self.record_filename())
    }

    /// Parse record file in working tree.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::Io`] if record file cannot be read.
    /// - Return [`TrackerError::Record`] if record file is malformed.
    pub fn working_record(&self) -> Result<Record> {
        let path = self.record_path();
        let text = read_to_string(&path).map_err(|source| TrackerError::Io { path, source })?;

        Ok(text.parse()?)
    }

    /// Look up field value in working tree record.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError`] from [`Tracker::working_record`].
    pub fn working_value(&self, key: impl AsRef<str>) -> Result<Option<String>> {
        Ok(self
            .working_record()?
            .get(key)
            .map(ToString::to_string))
    }

    /// Replace value of existing field in record of open issue.
    ///
    /// The whole record is re-serialized and written back. Nothing is written
    /// if any step before that fails. Fields are never added this way.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::NoOpenIssue`] if no issue is open.
    /// - Return [`TrackerError::NoSuchField`] if record lacks the field.
    /// - Return [`TrackerError::Io`] if record file cannot be read or
    ///   written.
    /// - Return [`TrackerError::Record`] if record file is malformed.
    #[instrument(skip(self, key, value), level = "debug")]
    pub fn set_field(&self, key: impl AsRef<str>, value: impl Into<String>) -> Result<()> {
        let id = self.require_open("set field")?;
        let key = key.as_ref();
        let mut record = self.working_record()?;
        record.set(key, value).map_err(|error| match error {
            RecordError::NoSuchField(key) => TrackerError::NoSuchField { id, key },
            error => TrackerError::Record(error),
        })?;

        let path = self.record_path();
        write(&path, record.to_string()).map_err(|source| TrackerError::Io { path, source })?;
        debug!("set {key:?} on issue {id}");

        Ok(())
    }
}
