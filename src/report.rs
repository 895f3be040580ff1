use std::fmt::Write;

use time::OffsetDateTime;

use crate::diff::escape_html;
use crate::error::AppResult;
use crate::filter::{Commit, DISPLAY_FORMAT};

/// Everything the renderer needs besides the commits themselves.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    /// Base URL for commit links, without a trailing slash.
    pub web_url: &'a str,
    pub generated_at: OffsetDateTime,
}

/// Subject line for a delivered report.
pub fn report_subject(repo_desc: &str) -> String {
    format!("Repository changes for {}", repo_desc)
}

/// Render the final commit set into the HTML report body.
///
/// Pure: no network or filesystem access; the generated-at timestamp comes
/// in through the context.
pub fn build_report(commits: &[Commit], ctx: &ReportContext) -> AppResult<String> {
    let mut body = String::new();
    for commit in commits {
        write!(
            body,
            "<b>Commit:</b> <a href=\"{}/commits/{}\">{}</a><br/>",
            ctx.web_url,
            commit.hash,
            escape_html(&commit.hash)
        )?;
        write!(body, "<b>Author:</b> {}<br/>", escape_html(&commit.author))?;
        write!(body, "<b>Date:</b> {}<br/>", escape_html(&commit.date))?;
        write!(
            body,
            "<b>Message:</b><br/>{}<br/><br/>",
            escape_html(&commit.message)
        )?;
        body.push_str("<b>Changes:</b><br/><table>");
        for path in &commit.paths {
            write!(body, "<tr><td>{}</td></tr>", escape_html(path))?;
        }
        body.push_str("</table><br/>");
        if let Some(diff) = &commit.diff {
            // Diff lines were already escaped when rendered.
            write!(body, "<b>Diff:</b><br/>{}", diff)?;
        }
        body.push_str("<hr>");
    }
    write!(
        body,
        "<h5>Sent by {} | {}</h5>",
        env!("CARGO_PKG_NAME"),
        ctx.generated_at.format(DISPLAY_FORMAT)?
    )?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn commit() -> Commit {
        Commit {
            hash: "8cadbef58759".to_string(),
            message: "fix <bug>".to_string(),
            author: "Bob <bob@example.com>".to_string(),
            date: "August 28, 2026 1:30 PM".to_string(),
            paths: vec!["lib/core.go".to_string()],
            diff: Some("+fixed<br/>".to_string()),
        }
    }

    #[test]
    fn report_contains_link_paths_and_footer() {
        let ctx = ReportContext {
            web_url: "https://bitbucket.org/team/repo",
            generated_at: datetime!(2026-08-28 14:05:00 UTC),
        };
        let body = build_report(&[commit()], &ctx).unwrap();
        assert!(body.contains(
            "<a href=\"https://bitbucket.org/team/repo/commits/8cadbef58759\">8cadbef58759</a>"
        ));
        assert!(body.contains("<b>Author:</b> Bob &lt;bob@example.com&gt;<br/>"));
        assert!(body.contains("fix &lt;bug&gt;"));
        assert!(body.contains("<tr><td>lib/core.go</td></tr>"));
        assert!(body.contains("<b>Diff:</b><br/>+fixed<br/>"));
        assert!(body.contains("<hr>"));
        assert!(body.ends_with("<h5>Sent by repo-notify | August 28, 2026 2:05 PM</h5>"));
    }

    #[test]
    fn blocks_are_separated_per_commit() {
        let ctx = ReportContext {
            web_url: "https://bitbucket.org/team/repo",
            generated_at: datetime!(2026-08-28 14:05:00 UTC),
        };
        let mut second = commit();
        second.hash = "deadbeef0000".to_string();
        let body = build_report(&[commit(), second], &ctx).unwrap();
        assert_eq!(body.matches("<hr>").count(), 2);
        assert!(body.contains("8cadbef58759"));
        assert!(body.contains("deadbeef0000"));
    }

    #[test]
    fn subject_names_the_repository() {
        assert_eq!(
            report_subject("team/widgets"),
            "Repository changes for team/widgets"
        );
    }
}
