// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Record history reporting.

use crate::{
    id::IssueId,
    tracker::{Result, Tracker, TrackerError},
    tracker::vcs::{BlameLine, Vcs},
};

use chrono::{DateTime, FixedOffset};
use std::fmt::Write;

impl<V> Tracker<V>
where
    V: Vcs,
{
    /// Annotate each line of a saved record with the commit that last touched
    /// it.
    ///
    /// Targets the record of the given issue, or the default record on main
    /// if no issue is given. Does not touch the working tree.
    ///
    /// # Errors
    ///
    /// - Return [`TrackerError::NotFound`] if issue does not exist.
    /// - Return [`TrackerError::Vcs`] if blame cannot be computed.
    pub fn blame(&self, target: Option<IssueId>) -> Result<String> {
        let branch = match target {
            Some(id) if !self.issue_exists(id)? => return Err(TrackerError::NotFound(id)),
            Some(id) => self.mapper.issue_branch(id),
            None => self.mapper.main().to_string(),
        };

        let lines = self.vcs.blame(&branch, self.record_filename())?;
        let author_width = lines
            .iter()
            .map(|line| line.author.chars().count())
            .max()
            .unwrap_or(0);
        let number_width = lines.len().to_string().len();

        let mut report = String::new();
        for line in &lines {
            // INVARIANT: Writing into a String cannot fail.
            let _ = writeln!(
                report,
                "{} ({:<author_width$} {} {:>number_width$}) {}",
                line.commit,
                line.author,
                timestamp(line),
                line.line_number,
                line.content,
            );
        }

        Ok(report)
    }
}

fn timestamp(line: &BlameLine) -> String {
    let offset = FixedOffset::east_opt(line.offset_minutes * 60)
        .or_else(|| FixedOffset::east_opt(0));
    match (DateTime::from_timestamp(line.seconds, 0), offset) {
        (Some(time), Some(offset)) => time
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S %z")
            .to_string(),
        _ => line.seconds.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TrackerSettings, tracker::fake::FakeVcs};

    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn timestamp_uses_commit_offset() {
        let line = BlameLine {
            commit: "deadbeef".into(),
            author: "John Doe".into(),
            seconds: 0,
            offset_minutes: 120,
            line_number: 1,
            content: "status:".into(),
        };

        assert_eq!(timestamp(&line), "1970-01-01 02:00:00 +0200");
    }

    #[sealed_test]
    fn blame_reports_every_record_line() -> anyhow::Result<()> {
        let tracker = Tracker::<FakeVcs>::init(".", TrackerSettings::default())?;
        let id = tracker.new_issue()?;
        tracker.set_field("summary", "broken")?;
        tracker.close()?;

        let report = tracker.blame(Some(id))?;
        let lines = report.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with(") summary: broken"));
        assert!(lines[4].ends_with(") description:"));

        let report = tracker.blame(None)?;
        assert!(report.lines().next().is_some_and(|line| line.ends_with(") summary:")));

        Ok(())
    }

    #[sealed_test]
    fn blame_missing_issue_is_not_found() {
        let tracker =
            Tracker::<FakeVcs>::init(".", TrackerSettings::default()).expect("init fake tracker");

        assert!(matches!(
            tracker.blame(Some(IssueId::new(3))),
            Err(TrackerError::NotFound(_))
        ));
    }
}
