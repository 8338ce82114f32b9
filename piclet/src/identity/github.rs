//! GitHub REST lookups.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GithubConfig;
use crate::log::{debug, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited by {url}")]
    RateLimited { url: String },

    #[error("request to {url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Bounded sleep-and-retry on rate-limit responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, wait: Duration) -> Self {
        Self { max_retries, wait }
    }

    /// Runs `f`, retrying while it is rate limited and retries remain.
    ///
    /// Any other error is returned immediately.
    pub fn run<T>(&self, mut f: impl FnMut() -> Result<T, ApiError>) -> Result<T, ApiError> {
        let mut retries = 0;
        loop {
            match f() {
                Err(ApiError::RateLimited { url }) if retries < self.max_retries => {
                    retries += 1;
                    warn!(
                        "GitHub API rate limited at {url}; waiting {}s (retry {retries}/{})",
                        self.wait.as_secs(),
                        self.max_retries
                    );
                    std::thread::sleep(self.wait);
                }
                other => return other,
            }
        }
    }
}

/// The GitHub queries used to turn commit metadata into user logins.
pub trait GitHubApi {
    /// The login of the first user matching `email`.
    fn search_user(&self, email: &str) -> Result<Option<String>, ApiError>;
    /// Logins of the owners of every fork of `owner/repo`.
    fn list_forks(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError>;
}

#[derive(Deserialize)]
struct Account {
    login: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Account>,
}

#[derive(Deserialize)]
struct Fork {
    owner: Account,
}

/// Blocking REST client. Sends `GITHUB_TOKEN` as a bearer token when set.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: String,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(config: &GithubConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("ignoring malformed GITHUB_TOKEN"),
            }
        }
        let client = Client::builder()
            .user_agent(concat!("piclet/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_secs(config.retry_wait_secs),
            ),
        })
    }

    fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.api_url, endpoint);
        self.retry.run(|| {
            debug!("GET {url}");
            let response = self.client.get(&url).query(query).send()?;
            let status = response.status();
            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ApiError::RateLimited { url: url.clone() });
            }
            if !status.is_success() {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    url: url.clone(),
                });
            }
            Ok(response.json()?)
        })
    }
}

impl GitHubApi for GitHubClient {
    fn search_user(&self, email: &str) -> Result<Option<String>, ApiError> {
        let response: SearchResponse = self.get("/search/users", &[("q", email)])?;
        Ok(response.items.into_iter().next().map(|user| user.login))
    }

    fn list_forks(&self, owner: &str, repo: &str) -> Result<Vec<String>, ApiError> {
        let forks: Vec<Fork> =
            self.get(&format!("/repos/{owner}/{repo}/forks"), &[("per_page", "100")])?;
        Ok(forks.into_iter().map(|fork| fork.owner.login).collect())
    }
}
