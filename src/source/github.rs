//! GitHub REST implementation of [`ChangeSource`]

use super::{ChangeRequest, ChangeSource, FetchError};
use crate::models::SourceConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{HeaderMap, ACCEPT, LINK, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct PullWire {
    number: u64,
    #[serde(default)]
    title: String,
    closed_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    head: HeadWire,
}

#[derive(Debug, Deserialize)]
struct HeadWire {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct FileWire {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct ContentWire {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl From<PullWire> for ChangeRequest {
    fn from(pull: PullWire) -> Self {
        ChangeRequest {
            id: pull.number,
            title: pull.title,
            closed_at: pull.closed_at,
            head_sha: pull.head.sha,
        }
    }
}

/// Pull requests of one GitHub repository
pub struct GithubSource {
    client: Client,
    repo_url: String,
    token: Option<String>,
    per_page: u32,
    max_rate_limit_wait: Duration,
}

impl GithubSource {
    /// Build a client for the configured repository.
    ///
    /// `token` is optional: without it requests are sent unauthenticated
    /// and run under the lower anonymous rate limit.
    pub fn new(config: &SourceConfig, token: Option<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("equivreg/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::from_reqwest(&config.api_url, e))?;

        Ok(Self {
            client,
            repo_url: format!(
                "{}/repos/{}/{}",
                config.api_url.trim_end_matches('/'),
                config.owner,
                config.repo
            ),
            token,
            per_page: config.per_page.clamp(1, 100),
            max_rate_limit_wait: Duration::from_secs(config.max_rate_limit_wait_secs),
        })
    }

    async fn request(&self, url: &str) -> Result<Response, FetchError> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }

    /// GET with a single wait-and-reissue when the rate limit is exhausted
    async fn send(&self, url: &str) -> Result<Response, FetchError> {
        let response = self.request(url).await?;
        let wait = rate_limit_wait(response.status(), response.headers(), Utc::now().timestamp());

        let response = match wait {
            None => response,
            Some(wait) if wait > self.max_rate_limit_wait => {
                return Err(FetchError::RateLimited {
                    url: url.to_string(),
                });
            }
            Some(wait) => {
                tracing::warn!(url, wait_secs = wait.as_secs(), "rate limited, waiting for reset");
                tokio::time::sleep(wait).await;
                let retried = self.request(url).await?;
                if rate_limit_wait(retried.status(), retried.headers(), Utc::now().timestamp())
                    .is_some()
                {
                    return Err(FetchError::RateLimited {
                        url: url.to_string(),
                    });
                }
                retried
            }
        };

        check_status(url, response)
    }

    async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Result<(T, Option<String>), FetchError> {
        let response = self.send(url).await?;
        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_link);
        let body = response
            .json::<T>()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok((body, next))
    }
}

#[async_trait]
impl ChangeSource for GithubSource {
    async fn closed_changes(&self, since: DateTime<Utc>) -> Result<Vec<ChangeRequest>, FetchError> {
        let mut url = Some(format!(
            "{}/pulls?state=closed&sort=updated&direction=desc&per_page={}",
            self.repo_url, self.per_page
        ));
        let mut changes = Vec::new();

        while let Some(current) = url {
            let (page, next) = self.get_page::<Vec<PullWire>>(&current).await?;
            tracing::debug!(url = %current, count = page.len(), "fetched pull request page");

            let exhausted = page_exhausted(&page, since);
            changes.extend(page.into_iter().map(ChangeRequest::from));
            url = if exhausted { None } else { next };
        }

        Ok(changes)
    }

    async fn changed_files(&self, change_id: u64) -> Result<Vec<String>, FetchError> {
        let mut url = Some(format!(
            "{}/pulls/{}/files?per_page={}",
            self.repo_url, change_id, self.per_page
        ));
        let mut files = Vec::new();

        while let Some(current) = url {
            let (page, next) = self.get_page::<Vec<FileWire>>(&current).await?;
            files.extend(page.into_iter().map(|f| f.filename));
            url = next;
        }

        Ok(files)
    }

    async fn file_content(&self, path: &str, revision: &str) -> Result<Vec<u8>, FetchError> {
        let url = content_url(&self.repo_url, path, revision)?;
        let (body, _) = self.get_page::<ContentWire>(&url).await?;
        decode_content(&url, body)
    }
}

/// True once a page of the updated-desc listing ends before `since`.
///
/// A pull request closed inside the window was updated at or after its
/// close, so later pages cannot hold one.
fn page_exhausted(page: &[PullWire], since: DateTime<Utc>) -> bool {
    page.last()
        .and_then(|p| p.updated_at)
        .map_or(false, |updated| updated < since)
}

fn check_status(url: &str, response: Response) -> Result<Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == StatusCode::NOT_FOUND {
        Err(FetchError::NotFound(url.to_string()))
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// `contents/{path}?ref={revision}` with every path segment percent-encoded
fn content_url(repo_url: &str, path: &str, revision: &str) -> Result<String, FetchError> {
    let invalid = || FetchError::Decode {
        url: repo_url.to_string(),
        reason: "repository URL cannot carry a path".to_string(),
    };

    let mut url = Url::parse(repo_url).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .push("contents")
        .extend(path.split('/').filter(|s| !s.is_empty()));
    url.query_pairs_mut().append_pair("ref", revision);
    Ok(url.to_string())
}

fn decode_content(url: &str, body: ContentWire) -> Result<Vec<u8>, FetchError> {
    let decode_error = |reason: String| FetchError::Decode {
        url: url.to_string(),
        reason,
    };

    match body.encoding.as_deref() {
        Some("base64") => {}
        other => {
            return Err(decode_error(format!(
                "unsupported content encoding: {}",
                other.unwrap_or("none")
            )))
        }
    }

    let content = body
        .content
        .ok_or_else(|| decode_error("missing content".to_string()))?;
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| decode_error(e.to_string()))
}

/// Extract the `rel="next"` target from a `Link` header
fn next_link(header: &str) -> Option<String> {
    let re = Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).ok()?;
    re.captures(header).map(|c| c[1].to_string())
}

/// How long to wait before reissuing a rate-limited request.
///
/// `None` means the response is not a rate-limit rejection (a plain 403 is
/// an ordinary error).
fn rate_limit_wait(status: StatusCode, headers: &HeaderMap, now_epoch: i64) -> Option<Duration> {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return None;
    }

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header(RETRY_AFTER.as_str()).and_then(|v| v.trim().parse::<u64>().ok()) {
        return Some(Duration::from_secs(secs));
    }

    if header("x-ratelimit-remaining").map(str::trim) == Some("0") {
        let wait = header("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|reset| (reset - now_epoch).max(0) as u64 + 1)
            .unwrap_or(60);
        return Some(Duration::from_secs(wait));
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(Duration::from_secs(60));
    }

    None
}
