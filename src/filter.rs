use time::format_description::{BorrowedFormatItem, well_known::Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::api::RawCommit;
use crate::error::{AppError, AppResult};

/// Display format for normalized commit dates, e.g. `September 4, 1986 8:30 PM`.
pub const DISPLAY_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[month repr:long] [day padding:none], [year] [hour repr:12 padding:none]:[minute] [period]"
);

const DAY_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Which commits the date stage keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Keep commits made on the reference day itself.
    SameDay,
    /// Keep commits made on or after the given day.
    OnOrAfter(Date),
}

impl DateFilter {
    /// Parse the configured threshold. `TODAY` selects same-day mode, any
    /// other value must be a `YYYY-MM-DD` day. An unparseable threshold is a
    /// configuration error, not an empty match.
    pub fn parse(raw: &str) -> AppResult<Self> {
        if raw.trim() == "TODAY" {
            return Ok(DateFilter::SameDay);
        }
        Date::parse(raw.trim(), DAY_FORMAT)
            .map(DateFilter::OnOrAfter)
            .map_err(|_| AppError::InvalidFilterDate(raw.to_string()))
    }
}

/// Filter settings for one run, validated at startup.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    pub date: DateFilter,
    /// Author substrings, matched case-insensitively.
    pub excluded_authors: Vec<String>,
    /// Message substrings, matched case-sensitively.
    pub excluded_messages: Vec<String>,
}

/// Normalized commit as it flows through the pipeline. Paths stay empty
/// until the change matcher attaches them; the diff stays absent until the
/// diff collector fills it in.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub paths: Vec<String>,
    pub diff: Option<String>,
}

/// Narrow a raw history batch down to the commits worth inspecting.
///
/// Stages run in order: date window, author exclusion, message exclusion,
/// then projection to the normalized shape. Pure: the reference day comes in
/// as a parameter so results are reproducible.
pub fn filter_commits(raw: &[RawCommit], criteria: &FilterCriteria, today: Date) -> Vec<Commit> {
    let mut kept = Vec::new();
    for commit in raw {
        let Ok(when) = OffsetDateTime::parse(&commit.date, &Rfc3339) else {
            debug!(hash = %commit.hash, date = %commit.date, "dropping commit with unparseable date");
            continue;
        };
        let in_window = match criteria.date {
            DateFilter::SameDay => when.date() == today,
            DateFilter::OnOrAfter(threshold) => when.date() >= threshold,
        };
        if !in_window {
            continue;
        }

        let author = commit
            .author
            .as_ref()
            .and_then(|author| author.raw.clone())
            .unwrap_or_default();
        let lowered = author.to_lowercase();
        if criteria
            .excluded_authors
            .iter()
            .any(|excluded| lowered.contains(&excluded.to_lowercase()))
        {
            debug!(hash = %commit.hash, "dropping commit from excluded author");
            continue;
        }
        if criteria
            .excluded_messages
            .iter()
            .any(|excluded| commit.message.contains(excluded.as_str()))
        {
            debug!(hash = %commit.hash, "dropping commit with excluded message");
            continue;
        }

        kept.push(Commit {
            hash: commit.hash.clone(),
            message: commit.message.clone(),
            author,
            date: when
                .format(DISPLAY_FORMAT)
                .unwrap_or_else(|_| commit.date.clone()),
            paths: Vec::new(),
            diff: None,
        });
    }
    kept
}
