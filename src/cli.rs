use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

use crate::error::{AppError, AppResult};
use crate::filter::{DateFilter, FilterCriteria};
use crate::matcher::PathAttachment;
use crate::pipeline::RunConfig;

const STYLES: Styles = Styles::styled()
    .header(Style::new().bold())
    .usage(Style::new().bold())
    .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))))
    .literal(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
    .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
    .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightRed))))
    .context(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta))))
    .context_value(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
    );

/// Long-form CLI description shown in `--help`.
const LONG_ABOUT: &str = "repo-notify - watch a remote repository for interesting commits

On every trigger the watcher fetches recent commit history over the
repository's HTTP API, keeps the commits that fall inside the configured
date window and are not excluded by author or message, looks up which of
them touch a watched path, fetches those commits' diffs, and delivers one
aggregated HTML report. A scan that finds nothing delivers nothing.

Every option can also be supplied through the environment variable named
next to it.";

/// Watch a remote repository for commits touching configured paths.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = Some(LONG_ABOUT), styles = STYLES)]
pub struct Cli {
    /// Base URL of the repository's HTTP API,
    /// e.g. https://api.bitbucket.org/2.0/repositories/team/repo
    #[arg(long, env = "REPO_API_URL")]
    pub api_url: String,

    /// Base URL used for commit links in the report
    #[arg(long, env = "REPO_WEB_URL")]
    pub web_url: String,

    /// Human-readable repository name used in the report subject
    #[arg(long, env = "REPO_DESC", default_value = "repository")]
    pub repo_desc: String,

    /// Username for basic authentication
    #[arg(long, env = "REPO_USER")]
    pub user: String,

    /// Password for basic authentication
    #[arg(long, env = "REPO_PASS", hide_env_values = true)]
    pub password: String,

    /// Number of history pages to fetch per scan
    #[arg(long, env = "COMMIT_PAGES", default_value_t = 1)]
    pub pages: u32,

    /// Path substrings that mark a commit as interesting
    #[arg(long, env = "WATCH_LIST", value_delimiter = ',', required = true)]
    pub watch: Vec<String>,

    /// Date window: TODAY for same-day commits, or YYYY-MM-DD for on-or-after
    #[arg(long, env = "COMMITS_FILTER_DATE", default_value = "TODAY")]
    pub filter_date: String,

    /// Author substrings to exclude, matched case-insensitively
    #[arg(long, env = "IGNORE_AUTHORS", value_delimiter = ',')]
    pub ignore_authors: Vec<String>,

    /// Message substrings to exclude, matched case-sensitively
    #[arg(long, env = "IGNORE_COMMITS_WITH_MESSAGES", value_delimiter = ',')]
    pub ignore_messages: Vec<String>,

    /// Branch names excluded from the history listing
    #[arg(long, env = "EXCLUDE_BRANCHES", value_delimiter = ',')]
    pub exclude_branches: Vec<String>,

    /// Trigger spec, e.g. hour:21,minute:10 (required unless --now)
    #[arg(long, env = "SCHEDULE_DATE")]
    pub schedule: Option<String>,

    /// Run a single scan immediately instead of waiting for the trigger
    #[arg(long)]
    pub now: bool,

    /// Which changed paths a matched commit carries into the report
    #[arg(long, value_enum, default_value_t = PathAttachment::Matched)]
    pub attach_paths: PathAttachment,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

impl Cli {
    /// Validate the filter settings and assemble the per-run config.
    /// Invalid values here are fatal before any network I/O happens.
    pub fn run_config(&self) -> AppResult<RunConfig> {
        if self.pages == 0 {
            return Err(AppError::Other(
                "at least one history page must be fetched".to_string(),
            ));
        }
        let criteria = FilterCriteria {
            date: DateFilter::parse(&self.filter_date)?,
            excluded_authors: self.ignore_authors.clone(),
            excluded_messages: self.ignore_messages.clone(),
        };
        Ok(RunConfig {
            pages: self.pages,
            excluded_branches: self.exclude_branches.clone(),
            criteria,
            watch_list: self.watch.clone(),
            attachment: self.attach_paths,
            web_url: self.web_url.trim_end_matches('/').to_string(),
            repo_desc: self.repo_desc.clone(),
        })
    }
}
