// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use twig::{editor_from_env, IssueId, Record, Tracker, TrackerSettings};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{
    env::current_dir,
    fs::read_to_string,
    path::PathBuf,
    process::{exit, Command as Process},
};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "twig [options] [<twig-command>]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command.unwrap_or(Command::Status) {
            Command::Init(opts) => run_init(opts),
            Command::New => run_new(),
            Command::Show(opts) => run_show(opts),
            Command::Open(opts) => run_open(opts),
            Command::Save => open_tracker()?.save().context("cannot save issue"),
            Command::Close => open_tracker()?.close().context("cannot close issue"),
            Command::Cancel => open_tracker()?.cancel().context("cannot cancel issue"),
            Command::Edit(opts) => run_edit(opts),
            Command::Blame(opts) => run_blame(opts),
            Command::Attach(opts) => run_attach(opts),
            Command::Status => run_status(),
            Command::Ids(opts) => run_ids(opts),
            Command::List(opts) => run_list(opts),
            Command::Set(opts) => run_set(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize new issue tracker.
    #[command(override_usage = "twig init [options] [<path>]")]
    Init(InitOptions),

    /// Create and open new issue.
    New,

    /// Show issue records.
    #[command(override_usage = "twig show [<id>... | all]")]
    Show(ShowOptions),

    /// Open existing issue.
    #[command(override_usage = "twig open <id>")]
    Open(OpenOptions),

    /// Save open issue.
    Save,

    /// Save any pending changes, and close open issue.
    Close,

    /// Drop any pending changes, and close open issue.
    Cancel,

    /// Edit issue with $EDITOR.
    #[command(override_usage = "twig edit [<id>]")]
    Edit(TargetOptions),

    /// Show line history of issue record.
    #[command(override_usage = "twig blame [<id>]")]
    Blame(TargetOptions),

    /// Attach files to open issue.
    #[command(visible_alias = "add", override_usage = "twig attach <file>...")]
    Attach(AttachOptions),

    /// Show status of open issue.
    #[command(visible_alias = "state")]
    Status,

    /// List issue ids, optionally filtered by field.
    #[command(visible_alias = "id", override_usage = "twig ids [<key> [<value>]]")]
    Ids(FilterOptions),

    /// List issues, optionally filtered by field.
    #[command(override_usage = "twig list [<key> [<value>]]")]
    List(FilterOptions),

    /// Set field of open issue.
    #[command(override_usage = "twig set <key> <value>")]
    Set(SetOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Directory to create tracker in.
    #[arg(value_name = "path")]
    pub path: Option<PathBuf>,

    /// Branch to use as resting state.
    #[arg(short, long, value_name = "branch")]
    pub main_branch: Option<String>,

    /// Prefix of issue branches.
    #[arg(short, long, value_name = "prefix")]
    pub prefix: Option<String>,

    /// Return to main branch after every save.
    #[arg(long)]
    pub save_returns_to_main: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ShowOptions {
    /// Issues to show, or "all". Shows open issue by default.
    #[arg(value_name = "id")]
    pub ids: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct OpenOptions {
    /// Issue to open.
    #[arg(required = true, value_name = "id")]
    pub id: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct TargetOptions {
    /// Target issue. Uses open issue by default.
    #[arg(value_name = "id")]
    pub id: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AttachOptions {
    /// Files to stage for next save.
    #[arg(required = true, value_name = "file")]
    pub files: Vec<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct FilterOptions {
    /// Only list issues having this field.
    #[arg(value_name = "key")]
    pub key: Option<String>,

    /// Only list issues whose field holds exactly this value.
    #[arg(value_name = "value", requires = "key")]
    pub value: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SetOptions {
    /// Field to change.
    #[arg(required = true, value_name = "key")]
    pub key: String,

    /// New value of field.
    #[arg(required = true, value_name = "value")]
    pub value: String,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:#}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn open_tracker() -> Result<Tracker> {
    Tracker::open(current_dir()?).context("issue tracker repository not found")
}

fn run_init(opts: InitOptions) -> Result<()> {
    let mut settings = TrackerSettings::default();
    if let Some(main_branch) = opts.main_branch {
        settings.main_branch = main_branch;
    }
    if let Some(prefix) = opts.prefix {
        settings.branch_prefix = prefix;
    }
    settings.save_returns_to_main = opts.save_returns_to_main;

    // INVARIANT: Validate overrides the same way a settings file is validated.
    let settings: TrackerSettings = settings.to_string().parse()?;

    let path = match opts.path {
        Some(path) => path,
        None => current_dir()?,
    };
    let _: Tracker = Tracker::init(&path, settings).context("cannot initialize issue tracker")?;

    Ok(())
}

fn run_new() -> Result<()> {
    let id = open_tracker()?
        .new_issue()
        .context("cannot create new issue")?;
    println!("{id}");

    Ok(())
}

fn run_show(opts: ShowOptions) -> Result<()> {
    let tracker = open_tracker()?;

    if opts.ids.is_empty() {
        let Some(id) = tracker.current_issue()? else {
            bail!("cannot show issue: no issue is open");
        };
        let path = tracker.record_path();
        let text = read_to_string(&path)
            .with_context(|| format!("cannot read record {:?}", path.display()))?;
        print!("{}", render(id, &text));
        return Ok(());
    }

    let ids = if opts.ids.len() == 1 && opts.ids[0] == "all" {
        tracker.issue_ids()?
    } else {
        opts.ids
            .iter()
            .map(|text| tracker.resolve(text))
            .collect::<Result<Vec<_>, _>>()?
    };

    let rendered = ids
        .into_iter()
        .map(|id| Ok(render(id, &tracker.issue_text(id)?)))
        .collect::<Result<Vec<_>>>()?;
    print!("{}", rendered.join("\n"));

    Ok(())
}

fn run_open(opts: OpenOptions) -> Result<()> {
    let tracker = open_tracker()?;
    let id = tracker.resolve(&opts.id)?;
    tracker
        .open_issue(id)
        .with_context(|| format!("cannot open issue {id}"))
}

fn run_edit(opts: TargetOptions) -> Result<()> {
    let editor = editor_from_env()?;
    let tracker = open_tracker()?;

    match opts.id {
        Some(text) => {
            let id = tracker.resolve(text)?;
            tracker
                .open_issue(id)
                .with_context(|| format!("cannot open issue {id}"))?;
        }
        None if tracker.current_issue()?.is_none() => {
            bail!("cannot edit issue: no issue is open");
        }
        None => {}
    }

    let mut words = editor.split_whitespace();
    let Some(program) = words.next() else {
        bail!("editor command is empty");
    };
    let status = Process::new(program)
        .args(words)
        .arg(tracker.record_path())
        .status()
        .with_context(|| format!("cannot run editor {program:?}"))?;
    if !status.success() {
        bail!("editor {program:?} exited with {status}");
    }

    if let Err(error) = tracker.working_record() {
        warn!("edited record is not valid: {error}");
    }

    Ok(())
}

fn run_blame(opts: TargetOptions) -> Result<()> {
    let tracker = open_tracker()?;
    let target = match opts.id {
        Some(text) if text == tracker.mapper().main() => None,
        Some(text) => Some(tracker.resolve(text)?),
        None => tracker.current_issue()?,
    };
    print!("{}", tracker.blame(target)?);

    Ok(())
}

fn run_attach(opts: AttachOptions) -> Result<()> {
    let tracker = open_tracker()?;
    for file in opts.files {
        tracker
            .attach(&file)
            .with_context(|| format!("cannot attach {:?}", file.display()))?;
    }

    Ok(())
}

fn run_status() -> Result<()> {
    let tracker = open_tracker()?;
    let marker = if tracker.is_dirty()? { '!' } else { ' ' };
    match tracker.current_issue()? {
        Some(id) => println!("{marker} {}", summary_line(&tracker, id)),
        None => println!("{marker} no issue is open"),
    }

    Ok(())
}

fn run_ids(opts: FilterOptions) -> Result<()> {
    let tracker = open_tracker()?;
    let (key, value) = filter(opts);
    for id in tracker.matching(key, value)? {
        println!("{id}");
    }

    Ok(())
}

fn run_list(opts: FilterOptions) -> Result<()> {
    let tracker = open_tracker()?;
    let (key, value) = filter(opts);
    let current = tracker.current_issue()?;
    let dirty = tracker.is_dirty()?;

    for id in tracker.matching(key, value)? {
        let marker = match current {
            Some(open) if open == id && dirty => '!',
            Some(open) if open == id => '*',
            _ => ' ',
        };
        println!("{marker} {}", summary_line(&tracker, id));
    }

    Ok(())
}

fn run_set(opts: SetOptions) -> Result<()> {
    open_tracker()?
        .set_field(&opts.key, opts.value)
        .with_context(|| format!("cannot set {:?}", opts.key))
}

fn filter(opts: FilterOptions) -> (String, String) {
    (opts.key.unwrap_or_default(), opts.value.unwrap_or_default())
}

fn summary_line(tracker: &Tracker, id: IssueId) -> String {
    let record = match tracker.record_of(id) {
        Ok(record) => record,
        Err(error) => {
            warn!("cannot read issue {id}: {error}");
            Record::new()
        }
    };
    let status = record.get("status").unwrap_or_default();
    let kind = record.get("type").unwrap_or_default();
    let summary = record.get("summary").unwrap_or_default();

    format!("{id} {status:<8} {kind:<8} {summary}")
}

fn render(id: IssueId, text: &str) -> String {
    format!("id: {id}\n{text}")
}
