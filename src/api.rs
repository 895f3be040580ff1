use futures::future;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Raw commit record as the commits listing returns it. Unknown fields are
/// ignored; Bitbucket sends far more than the pipeline needs.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCommit {
    pub hash: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub raw: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    values: Vec<RawCommit>,
}

/// One changed file in a diffstat response. A change carries at least one
/// side: `old` for modified and deleted entries, `new` for added ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffstatEntry {
    #[serde(default)]
    pub old: Option<DiffstatFile>,
    #[serde(default)]
    pub new: Option<DiffstatFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiffstatFile {
    pub path: String,
}

#[derive(Debug, Deserialize)]
struct DiffstatResponse {
    #[serde(default)]
    values: Vec<DiffstatEntry>,
}

impl DiffstatEntry {
    /// Path of the change, preferring the pre-image side.
    pub fn changed_path(&self) -> Option<&str> {
        self.old
            .as_ref()
            .or(self.new.as_ref())
            .map(|file| file.path.as_str())
    }
}

/// The three repository operations the pipeline needs. A trait so tests can
/// drive the pipeline with an in-memory fake instead of a live server.
pub trait RepoApi {
    /// Fetch `pages` pages of commit history, concatenated in page order.
    async fn fetch_history(
        &self,
        pages: u32,
        excluded_branches: &[String],
    ) -> AppResult<Vec<RawCommit>>;

    /// Fetch the changed-path statistics for one commit.
    async fn fetch_diffstat(&self, hash: &str) -> AppResult<Vec<DiffstatEntry>>;

    /// Fetch raw diff text for one commit, restricted to the given paths.
    async fn fetch_diff(&self, hash: &str, paths: &[String]) -> AppResult<String>;
}

/// HTTP client for the Bitbucket 2.0 repository API, using basic auth.
pub struct BitbucketClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl BitbucketClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self {
            http,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    #[tracing::instrument(level = "debug", skip(self, excluded_branches))]
    async fn fetch_page(
        &self,
        page: u32,
        excluded_branches: &[String],
    ) -> Result<Vec<RawCommit>, reqwest::Error> {
        let mut query: Vec<(&str, String)> = vec![("page", page.to_string())];
        for branch in excluded_branches {
            query.push(("exclude", branch.clone()));
        }
        let response = self
            .http
            .get(format!("{}/commits/", self.base_url))
            .query(&query)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?;
        let listing: PageResponse = response.json().await?;
        debug!(commits = listing.values.len(), "fetched commit page");
        Ok(listing.values)
    }
}

impl RepoApi for BitbucketClient {
    async fn fetch_history(
        &self,
        pages: u32,
        excluded_branches: &[String],
    ) -> AppResult<Vec<RawCommit>> {
        let requests = (1..=pages).map(|page| async move {
            self.fetch_page(page, excluded_branches)
                .await
                .map_err(|source| AppError::HistoryFetch { page, source })
        });
        // A single failed page fails the whole fetch: an incomplete page set
        // would silently under-report commits.
        let fetched = future::try_join_all(requests).await?;
        Ok(fetched.into_iter().flatten().collect())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn fetch_diffstat(&self, hash: &str) -> AppResult<Vec<DiffstatEntry>> {
        let response = self
            .http
            .get(format!("{}/diffstat/{}", self.base_url, hash))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?;
        let stat: DiffstatResponse = response.json().await?;
        Ok(stat.values)
    }

    #[tracing::instrument(level = "debug", skip(self, paths))]
    async fn fetch_diff(&self, hash: &str, paths: &[String]) -> AppResult<String> {
        let query: Vec<(&str, &str)> = paths.iter().map(|path| ("path", path.as_str())).collect();
        let response = self
            .http
            .get(format!("{}/diff/{}", self.base_url, hash))
            .query(&query)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_path_prefers_old_side() {
        let entry: DiffstatEntry = serde_json::from_str(
            r#"{"old": {"path": "src/app/old.go"}, "new": {"path": "src/app/new.go"}}"#,
        )
        .unwrap();
        assert_eq!(entry.changed_path(), Some("src/app/old.go"));

        let added: DiffstatEntry =
            serde_json::from_str(r#"{"new": {"path": "src/app/added.go"}}"#).unwrap();
        assert_eq!(added.changed_path(), Some("src/app/added.go"));

        let empty = DiffstatEntry::default();
        assert_eq!(empty.changed_path(), None);
    }

    #[test]
    fn commit_page_deserializes_with_missing_optionals() {
        let page: PageResponse = serde_json::from_str(
            r#"{
                "pagelen": 30,
                "values": [
                    {
                        "hash": "8cadbef58759",
                        "message": "fix bug",
                        "author": {"raw": "Bob <bob@example.com>"},
                        "date": "2026-08-28T10:15:00+00:00"
                    },
                    {"hash": "deadbeef0000", "date": "2026-08-28T11:00:00+00:00"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(page.values.len(), 2);
        assert_eq!(
            page.values[0].author.as_ref().unwrap().raw.as_deref(),
            Some("Bob <bob@example.com>")
        );
        assert!(page.values[1].author.is_none());
        assert!(page.values[1].message.is_empty());

        let empty: PageResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.values.is_empty());
    }
}
