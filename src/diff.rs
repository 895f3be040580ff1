use std::fmt::Write;

use tracing::warn;

use crate::api::RepoApi;
use crate::error::AppResult;
use crate::filter::Commit;

/// The diff endpoint takes its path list through the query string, which has
/// a length ceiling on the hosting side. A diff request never names more
/// than this many paths; anything beyond the cap is silently dropped from
/// the diff, a known lossy limitation. The paths table still lists it.
const MAX_DIFF_PATHS: usize = 6;

/// Hunk header marker in unified diff output.
const HUNK_MARKER: &str = "@@";

/// Classification of a single diff line, used only for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Added,
    Removed,
    Header,
    Context,
}

/// A rendered diff line: the raw text plus its presentation tag.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffLine {
    pub text: String,
    pub kind: DiffLineKind,
}

impl DiffLine {
    /// Tag a raw line by its leading characters.
    pub fn classify(raw: &str) -> Self {
        let kind = if raw.starts_with(HUNK_MARKER) {
            DiffLineKind::Header
        } else if raw.starts_with('+') {
            DiffLineKind::Added
        } else if raw.starts_with('-') {
            DiffLineKind::Removed
        } else {
            DiffLineKind::Context
        };
        DiffLine {
            text: raw.to_string(),
            kind,
        }
    }
}

/// Escape text for embedding in the HTML report body.
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// At most the first `MAX_DIFF_PATHS` entries of a matched-path list.
fn truncated(paths: &[String]) -> &[String] {
    &paths[..paths.len().min(MAX_DIFF_PATHS)]
}

/// Render raw diff text into annotated HTML, line by line, in original order.
pub fn render_diff(raw: &str) -> AppResult<String> {
    let mut out = String::new();
    for line in raw.lines() {
        let line = DiffLine::classify(line);
        let text = escape_html(&line.text);
        match line.kind {
            DiffLineKind::Added => {
                write!(out, "<span style=\"color:#22863a\">{}</span><br/>", text)?
            }
            DiffLineKind::Removed => {
                write!(out, "<span style=\"color:#b31d28\">{}</span><br/>", text)?
            }
            DiffLineKind::Header => {
                write!(out, "<span style=\"color:#6f42c1\"><b>{}</b></span><br/>", text)?
            }
            DiffLineKind::Context => write!(out, "{}<br/>", text)?,
        }
    }
    Ok(out)
}

/// Outcome of collecting one matched commit's diff.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOutcome {
    /// The commit now carries its rendered diff text.
    Collected(Commit),
    /// The diff fetch failed; the commit is dropped from the report.
    Failed,
}

impl DiffOutcome {
    pub fn into_collected(self) -> Option<Commit> {
        match self {
            DiffOutcome::Collected(commit) => Some(commit),
            DiffOutcome::Failed => None,
        }
    }
}

/// Fetch and render the diff for a matched commit.
///
/// Like the change matcher, failures are caught at the item boundary and
/// never abort the batch.
#[tracing::instrument(level = "debug", skip(api, commit), fields(hash = %commit.hash))]
pub async fn collect_diff<A: RepoApi>(api: &A, mut commit: Commit) -> DiffOutcome {
    let raw = match api.fetch_diff(&commit.hash, truncated(&commit.paths)).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(hash = %commit.hash, error = %err, "diff fetch failed");
            return DiffOutcome::Failed;
        }
    };
    match render_diff(&raw) {
        Ok(rendered) => {
            commit.diff = Some(rendered);
            DiffOutcome::Collected(commit)
        }
        Err(err) => {
            warn!(hash = %commit.hash, error = %err, "diff render failed");
            DiffOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_classified_by_leading_characters() {
        assert_eq!(DiffLine::classify("+added line").kind, DiffLineKind::Added);
        assert_eq!(DiffLine::classify("-removed line").kind, DiffLineKind::Removed);
        assert_eq!(
            DiffLine::classify("@@ -1,4 +1,6 @@").kind,
            DiffLineKind::Header
        );
        assert_eq!(DiffLine::classify(" unchanged").kind, DiffLineKind::Context);
        assert_eq!(DiffLine::classify("").kind, DiffLineKind::Context);
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain text"), "plain text");
    }

    #[test]
    fn diff_requests_use_at_most_six_paths() {
        let paths: Vec<String> = (0..8).map(|i| format!("src/file{}.go", i)).collect();
        assert_eq!(truncated(&paths).len(), 6);
        assert_eq!(truncated(&paths), &paths[..6]);

        let few: Vec<String> = (0..3).map(|i| format!("src/file{}.go", i)).collect();
        assert_eq!(truncated(&few), few.as_slice());
    }

    #[test]
    fn rendering_keeps_line_order_and_escapes() {
        let rendered = render_diff("@@ -1 +1 @@\n-let x = <old>;\n+let x = <new>;\n context")
            .unwrap();
        let expected = concat!(
            "<span style=\"color:#6f42c1\"><b>@@ -1 +1 @@</b></span><br/>",
            "<span style=\"color:#b31d28\">-let x = &lt;old&gt;;</span><br/>",
            "<span style=\"color:#22863a\">+let x = &lt;new&gt;;</span><br/>",
            " context<br/>",
        );
        assert_eq!(rendered, expected);
    }
}
