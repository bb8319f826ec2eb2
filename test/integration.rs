// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{init_tracker, RepoFixture};

use anyhow::Result;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::fs::{create_dir, read_to_string, write};
use twig::{tracker::vcs::VcsError, IssueId, Record, Tracker, TrackerError, TrackerSettings};

fn ids(raw: &[u32]) -> Vec<IssueId> {
    raw.iter().copied().map(IssueId::new).collect()
}

#[sealed_test]
fn init_seeds_default_record_on_main() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;

    assert_eq!(tracker.current_issue()?, None);
    assert!(!tracker.is_dirty()?);
    assert_eq!(read_to_string("issue")?, Record::default_issue().to_string());
    assert!(std::path::Path::new(".git/twig.toml").exists());

    let repo = git2::Repository::open(".")?;
    let head = repo.head()?;
    assert_eq!(head.shorthand(), Some("main"));
    assert_eq!(head.peel_to_commit()?.message(), Some("Issue repo initialized."));

    Ok(())
}

#[sealed_test]
fn init_refuses_existing_repository() -> Result<()> {
    let fixture = RepoFixture::new(".", "main")?;
    fixture.stage_and_commit("README", "hello")?;

    let result: Result<Tracker, TrackerError> =
        Tracker::init(std::env::current_dir()?, TrackerSettings::default());
    assert!(matches!(result, Err(TrackerError::Vcs(_))));
    assert!(!std::path::Path::new("issue").exists());

    Ok(())
}

#[sealed_test]
fn open_finds_tracker_from_subdirectory() -> Result<()> {
    let settings = TrackerSettings {
        branch_prefix: "bug/".into(),
        ..TrackerSettings::default()
    };
    init_tracker(settings.clone())?;
    create_dir("nested")?;

    let tracker: Tracker = Tracker::open("nested")?;
    assert_eq!(tracker.settings(), &settings);
    assert_eq!(tracker.new_issue()?, IssueId::FIRST);
    assert_eq!(
        git2::Repository::open(".")?.head()?.shorthand(),
        Some("bug/0001")
    );

    Ok(())
}

#[sealed_test]
fn new_issues_are_numbered_in_sequence() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;

    let first = tracker.new_issue()?;
    tracker.set_field("summary", "first")?;
    tracker.save()?;
    let second = tracker.new_issue()?;

    assert_eq!(first.encode(), "0001");
    assert_eq!(second.encode(), "0002");
    assert_eq!(tracker.current_issue()?, Some(second));
    assert_eq!(tracker.working_value("summary")?, Some(String::new()));
    assert_eq!(tracker.field_of(first, "summary")?, Some("first".into()));

    Ok(())
}

#[sealed_test]
fn matching_filters_by_saved_fields() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    for status in ["open", "closed"] {
        tracker.new_issue()?;
        tracker.set_field("status", status)?;
        tracker.close()?;
    }

    assert_eq!(tracker.matching("status", "open")?, ids(&[1]));
    assert_eq!(tracker.matching("status", "")?, ids(&[1, 2]));
    assert_eq!(tracker.matching("nonexistent", "x")?, ids(&[]));
    assert_eq!(tracker.matching("", "")?, ids(&[1, 2]));
    assert_eq!(tracker.current_issue()?, None);

    Ok(())
}

#[sealed_test]
fn foreign_branches_are_not_issues() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    tracker.new_issue()?;
    tracker.close()?;

    let fixture = RepoFixture::open(".")?;
    fixture.branch("issue/7")?;
    fixture.branch("feature")?;

    assert_eq!(tracker.issue_ids()?, ids(&[1]));
    assert_eq!(tracker.new_issue()?, IssueId::new(2));

    Ok(())
}

#[sealed_test]
fn cancel_discards_unsaved_edits() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    let id = tracker.new_issue()?;
    tracker.set_field("status", "open")?;
    tracker.save()?;
    tracker.set_field("status", "closed")?;
    assert!(tracker.is_dirty()?);

    tracker.cancel()?;
    assert_eq!(tracker.current_issue()?, None);
    assert!(!tracker.is_dirty()?);
    assert_eq!(read_to_string("issue")?, Record::default_issue().to_string());

    tracker.open_issue(id)?;
    assert_eq!(tracker.working_value("status")?, Some("open".into()));

    Ok(())
}

#[sealed_test]
fn open_refuses_dirty_working_tree() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    let first = tracker.new_issue()?;
    tracker.close()?;
    tracker.new_issue()?;
    tracker.set_field("summary", "unsaved")?;

    assert!(matches!(tracker.open_issue(first), Err(TrackerError::Dirty(_))));
    assert!(matches!(tracker.new_issue(), Err(TrackerError::Dirty(_))));
    assert_eq!(tracker.working_value("summary")?, Some("unsaved".into()));

    Ok(())
}

#[sealed_test]
fn set_field_is_strict() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    assert!(matches!(
        tracker.set_field("status", "open"),
        Err(TrackerError::NoOpenIssue(_))
    ));

    tracker.new_issue()?;
    let before = read_to_string("issue")?;
    assert!(matches!(
        tracker.set_field("priority", "high"),
        Err(TrackerError::NoSuchField { .. })
    ));
    assert_eq!(read_to_string("issue")?, before);

    Ok(())
}

#[sealed_test]
fn attachments_live_on_issue_branch() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    tracker.new_issue()?;
    write("screenshot.txt", "pretend this is a picture")?;
    tracker.attach("screenshot.txt")?;
    tracker.close()?;

    assert!(!std::path::Path::new("screenshot.txt").exists());

    tracker.open_issue(IssueId::FIRST)?;
    assert_eq!(read_to_string("screenshot.txt")?, "pretend this is a picture");

    Ok(())
}

#[sealed_test]
fn blame_annotates_saved_record() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    let id = tracker.new_issue()?;
    tracker.set_field("summary", "broken build")?;
    tracker.close()?;

    let report = tracker.blame(Some(id))?;
    let lines = report.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].contains("John Doe"));
    assert!(lines[0].ends_with(") summary: broken build"));
    assert!(matches!(
        tracker.blame(Some(IssueId::new(5))),
        Err(TrackerError::NotFound(_))
    ));

    Ok(())
}

#[sealed_test]
fn cancel_from_detached_head_returns_to_main() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    let repo = git2::Repository::open(".")?;
    let tip = repo.head()?.peel_to_commit()?.id();
    repo.set_head_detached(tip)?;
    assert_eq!(tracker.current_issue()?, None);

    tracker.cancel()?;
    assert_eq!(tracker.current_issue()?, None);
    assert_eq!(repo.head()?.shorthand(), Some("main"));
    assert!(!repo.head_detached()?);

    Ok(())
}

#[sealed_test]
fn binary_record_is_reported_not_rewritten() -> Result<()> {
    let tracker = init_tracker(TrackerSettings::default())?;
    let binary = tracker.new_issue()?;
    write("issue", [0xff, 0xfe, b'\n'])?;
    tracker.close()?;
    tracker.new_issue()?;
    tracker.set_field("status", "open")?;
    tracker.close()?;

    assert!(matches!(
        tracker.issue_text(binary),
        Err(TrackerError::Vcs(VcsError::NotUtf8 { .. }))
    ));
    assert_eq!(tracker.matching("status", "")?, ids(&[2]));
    assert_eq!(tracker.matching("", "")?, ids(&[1, 2]));

    Ok(())
}
