use futures::future;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::api::RepoApi;
use crate::diff::{DiffOutcome, collect_diff};
use crate::error::AppResult;
use crate::filter::{FilterCriteria, filter_commits};
use crate::matcher::{MatchOutcome, PathAttachment, match_changes};
use crate::report::{ReportContext, build_report, report_subject};

/// Where finished reports go. Mail transport (or anything else) lives
/// behind this seam; the pipeline only ever sees the trait.
pub trait ReportSink {
    async fn deliver(&self, subject: &str, body: &str) -> AppResult<()>;
}

/// Sink that writes the report to standard output.
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    async fn deliver(&self, subject: &str, body: &str) -> AppResult<()> {
        use std::io::Write;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}\n\n{}", subject, body)?;
        Ok(())
    }
}

/// Per-run settings, validated at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub pages: u32,
    pub excluded_branches: Vec<String>,
    pub criteria: FilterCriteria,
    pub watch_list: Vec<String>,
    pub attachment: PathAttachment,
    pub web_url: String,
    pub repo_desc: String,
}

/// Per-stage counts for one run, for operator logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub filtered: usize,
    pub matched: usize,
    pub reported: usize,
}

/// One full scan: history, filter, two fan-out/fan-in barriers, report,
/// delivery.
///
/// Each barrier is a strict join. Item-level failures are captured inside
/// the launched operations, so the joins only ever see settled outcomes;
/// nothing from the second barrier starts before the first one finishes.
/// Each operation owns its commit and the fold into the next stage's input
/// happens here, after the join.
pub async fn run_pipeline<A: RepoApi, S: ReportSink>(
    api: &A,
    sink: &S,
    config: &RunConfig,
) -> AppResult<RunSummary> {
    let mut summary = RunSummary::default();

    let raw = api
        .fetch_history(config.pages, &config.excluded_branches)
        .await?;
    summary.fetched = raw.len();

    let today = OffsetDateTime::now_utc().date();
    let filtered = filter_commits(&raw, &config.criteria, today);
    summary.filtered = filtered.len();
    info!(
        fetched = summary.fetched,
        filtered = summary.filtered,
        "history narrowed"
    );
    if filtered.is_empty() {
        return Ok(summary);
    }

    // First fan-out: one diffstat lookup per filtered commit.
    let outcomes = future::join_all(filtered.into_iter().map(|commit| {
        match_changes(api, commit, &config.watch_list, config.attachment)
    }))
    .await;
    let matched: Vec<_> = outcomes
        .into_iter()
        .filter_map(MatchOutcome::into_matched)
        .collect();
    summary.matched = matched.len();
    if matched.is_empty() {
        debug!("no watched changes; skipping report");
        return Ok(summary);
    }

    // Second fan-out: one diff fetch per matched commit.
    let outcomes =
        future::join_all(matched.into_iter().map(|commit| collect_diff(api, commit))).await;
    let reported: Vec<_> = outcomes
        .into_iter()
        .filter_map(DiffOutcome::into_collected)
        .collect();
    summary.reported = reported.len();
    if reported.is_empty() {
        debug!("every diff fetch failed; skipping report");
        return Ok(summary);
    }

    let ctx = ReportContext {
        web_url: &config.web_url,
        generated_at: OffsetDateTime::now_utc(),
    };
    let body = build_report(&reported, &ctx)?;
    sink.deliver(&report_subject(&config.repo_desc), &body).await?;
    info!(reported = summary.reported, "report delivered");
    Ok(summary)
}
