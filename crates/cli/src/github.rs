// GitHub REST client: one fetch per category, converted to `RemoteItem`s.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

use ghtasks_common::types::{Category, RemoteItem, TaskKind, TaskStatus};

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: &str = "100";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can list the items belonging to a category.
pub trait IssueSource {
    fn fetch(&self, category: Category) -> impl Future<Output = Result<Vec<RemoteItem>, GitHubError>>;
}

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub rejected the token (HTTP {status}); run `ghtasks auth login`")]
    Unauthorized { status: u16 },

    #[error("GitHub returned HTTP {status} for {endpoint}: {message}")]
    Status { status: u16, endpoint: String, message: String },

    #[error("request to {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid API URL `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),
}

impl GitHubError {
    /// Connect failures, timeouts and 5xx responses.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Transport { source, .. } => !source.is_decode(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    token: String,
    login: OnceCell<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self, GitHubError> {
        let mut base = Url::parse(api_url)
            .map_err(|source| GitHubError::InvalidUrl { url: api_url.to_string(), source })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(concat!("ghtasks/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(GitHubError::Client)?;

        Ok(Self { http, base, token: token.into(), login: OnceCell::new() })
    }

    /// Login of the token's owner, fetched once.
    pub async fn login(&self) -> Result<&str, GitHubError> {
        let login = self
            .login
            .get_or_try_init(|| async {
                let user: ApiUser = self.get_json(self.endpoint("user", &[])?).await?;
                Ok::<_, GitHubError>(user.login)
            })
            .await?;
        Ok(login.as_str())
    }

    async fn assigned_issues(&self) -> Result<Vec<RemoteItem>, GitHubError> {
        let url = self.endpoint(
            "issues",
            &[("filter", "assigned"), ("state", "all"), ("per_page", PER_PAGE)],
        )?;
        let raw: Vec<serde_json::Value> = self.get_json(url).await?;
        Ok(convert_items(raw).into_iter().filter(|item| item.kind == TaskKind::Issue).collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<RemoteItem>, GitHubError> {
        let url = self.endpoint(
            "search/issues",
            &[("q", query), ("per_page", PER_PAGE), ("advanced_search", "true")],
        )?;
        let page: SearchPage = self.get_json(url).await?;
        Ok(convert_items(page.items))
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, GitHubError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|source| GitHubError::InvalidUrl { url: path.to_string(), source })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GitHubError> {
        let endpoint = url.path().to_string();
        debug!(%endpoint, "GET");

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| GitHubError::Transport { endpoint: endpoint.clone(), source })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GitHubError::Unauthorized { status: status.as_u16() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GitHubError::Status {
                status: status.as_u16(),
                endpoint,
                message: error_message(&body),
            });
        }

        response.json::<T>().await.map_err(|source| GitHubError::Transport { endpoint, source })
    }
}

impl IssueSource for GitHubClient {
    async fn fetch(&self, category: Category) -> Result<Vec<RemoteItem>, GitHubError> {
        let items = match category {
            Category::AssignedIssues => self.assigned_issues().await?,
            Category::AssignedPullRequests => {
                let login = self.login().await?;
                self.search(&format!("is:pr assignee:{login}")).await?
            }
            Category::ReviewRequestedPullRequests => {
                let login = self.login().await?;
                self.search(&format!("is:pr review-requested:{login}")).await?
            }
            Category::OpenedPullRequests => self.search("is:pr author:@me").await?,
            Category::AuthoredIssues => self.search("is:issue author:@me").await?,
        };
        debug!(%category, count = items.len(), "fetched items");
        Ok(items)
    }
}

// ── API payloads ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    id: u64,
    number: u64,
    title: String,
    html_url: String,
    state: String,
    #[serde(default)]
    repository_url: Option<String>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiLabel {
    Named { name: String },
    Bare(String),
}

impl ApiLabel {
    fn into_name(self) -> String {
        match self {
            Self::Named { name } | Self::Bare(name) => name,
        }
    }
}

impl ApiIssue {
    fn into_remote(self) -> Result<RemoteItem, String> {
        let repository_ref = self
            .repository_url
            .as_deref()
            .and_then(repository_from_api_url)
            .or_else(|| repository_from_html_url(&self.html_url))
            .ok_or_else(|| format!("cannot tell the repository of {}", self.html_url))?;

        Ok(RemoteItem {
            identity: self.id,
            kind: if self.pull_request.is_some() { TaskKind::PullRequest } else { TaskKind::Issue },
            title: self.title,
            url: self.html_url,
            repository_ref,
            sequence_number: self.number,
            status: if self.state == "closed" { TaskStatus::Closed } else { TaskStatus::Open },
            labels: self.labels.into_iter().map(ApiLabel::into_name).collect(),
            created_at: self.created_at,
            closed_at: self.closed_at,
        })
    }
}

/// Decode each raw item, skipping (with a warning) the ones that do not fit.
fn convert_items(raw: Vec<serde_json::Value>) -> Vec<RemoteItem> {
    raw.into_iter()
        .filter_map(|value| {
            let parsed = serde_json::from_value::<ApiIssue>(value)
                .map_err(|error| error.to_string())
                .and_then(ApiIssue::into_remote);
            match parsed {
                Ok(item) => Some(item),
                Err(reason) => {
                    warn!(%reason, "skipping malformed item");
                    None
                }
            }
        })
        .collect()
}

/// `https://api.github.com/repos/{owner}/{name}` -> `owner/name`.
fn repository_from_api_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let segments: Vec<&str> = url.path_segments()?.collect();
    let at = segments.iter().rposition(|s| *s == "repos")?;
    match segments.get(at + 1..at + 3)? {
        [owner, name] if !owner.is_empty() && !name.is_empty() => Some(format!("{owner}/{name}")),
        _ => None,
    }
}

/// `https://github.com/{owner}/{name}/issues/5` -> `owner/name`.
fn repository_from_html_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let mut segments = url.path_segments()?;
    let owner = segments.next().filter(|s| !s.is_empty())?;
    let name = segments.next().filter(|s| !s.is_empty())?;
    Some(format!("{owner}/{name}"))
}

fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: String,
    }

    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => body.chars().take(200).collect(),
    }
}
