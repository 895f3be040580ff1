use std::fmt::Display;

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::api::RepoApi;
use crate::filter::Commit;

/// Which changed paths a matched commit carries downstream. Earlier
/// deployments disagreed on this, so it is explicit configuration rather
/// than a hardcoded choice.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PathAttachment {
    /// Attach only the paths that matched the watch list.
    #[default]
    Matched,
    /// Attach every changed path once any of them matched.
    All,
}

impl Display for PathAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PathAttachment::Matched => "matched",
            PathAttachment::All => "all",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of inspecting one commit's diffstat. `Unmatched` and `Failed`
/// are both excluded downstream; keeping them apart preserves observability.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// At least one changed path is watched; the commit carries its paths.
    Matched(Commit),
    /// The commit touches nothing on the watch list.
    Unmatched,
    /// The diffstat fetch failed; the commit is dropped from the report.
    Failed,
}

impl MatchOutcome {
    pub fn into_matched(self) -> Option<Commit> {
        match self {
            MatchOutcome::Matched(commit) => Some(commit),
            MatchOutcome::Unmatched | MatchOutcome::Failed => None,
        }
    }
}

/// Paths that contain any watch-list entry as a substring. The first
/// matching entry wins per path.
pub fn watched_paths(paths: &[String], watch_list: &[String]) -> Vec<String> {
    paths
        .iter()
        .filter(|path| {
            watch_list
                .iter()
                .any(|watched| path.contains(watched.as_str()))
        })
        .cloned()
        .collect()
}

/// Fetch a commit's diffstat and decide whether it touches a watched path.
///
/// A fetch failure is caught and logged here: one commit must never abort
/// the batch it belongs to.
#[tracing::instrument(level = "debug", skip(api, commit, watch_list, attachment), fields(hash = %commit.hash))]
pub async fn match_changes<A: RepoApi>(
    api: &A,
    mut commit: Commit,
    watch_list: &[String],
    attachment: PathAttachment,
) -> MatchOutcome {
    let entries = match api.fetch_diffstat(&commit.hash).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(hash = %commit.hash, error = %err, "diffstat fetch failed");
            return MatchOutcome::Failed;
        }
    };

    let changed: Vec<String> = entries
        .iter()
        .filter_map(|entry| entry.changed_path().map(str::to_string))
        .collect();
    let matched = watched_paths(&changed, watch_list);
    if matched.is_empty() {
        debug!(hash = %commit.hash, "no watched path changed");
        return MatchOutcome::Unmatched;
    }

    commit.paths = match attachment {
        PathAttachment::Matched => matched,
        PathAttachment::All => changed,
    };
    MatchOutcome::Matched(commit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn watch_matching_is_substring_based() {
        let watch = paths(&["src/app"]);
        assert_eq!(
            watched_paths(&paths(&["src/app/main.go", "src/other/main.go"]), &watch),
            paths(&["src/app/main.go"])
        );
    }

    #[test]
    fn empty_watch_list_matches_nothing() {
        assert!(watched_paths(&paths(&["src/app/main.go"]), &[]).is_empty());
    }

    #[test]
    fn a_path_is_kept_once_regardless_of_how_many_entries_match() {
        let watch = paths(&["lib/", "core"]);
        assert_eq!(
            watched_paths(&paths(&["lib/core.go"]), &watch),
            paths(&["lib/core.go"])
        );
    }
}
