mod requests;

use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use super::{
    Issue, IssuePatch, IssueQuery, Label, Milestone, NewIssue, NewMilestone, NewRepository, Page,
    Repository, Transport, TransportError,
};
use requests::{
    CreateIssue, CreateMilestone, CreateRepository, GetRepository, ListIssues, ListLabels,
    ListMilestones, UpdateIssue,
};

pub const DEFAULT_API_URL: &str = "https://api.github.com/";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const CLIENT_USER_AGENT: &str = concat!("ges-store/", env!("CARGO_PKG_VERSION"));

/// A typed call against the REST API
pub trait ApiRequest {
    type Response: DeserializeOwned;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError>;
}

/// Account name plus password or token, sent as basic auth on every call
#[derive(Clone)]
pub struct Credentials {
    identity: String,
    secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    fn authorization(&self) -> String {
        let pair = format!("{}:{}", self.identity, self.secret);
        format!("Basic {}", STANDARD.encode(pair))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// [`Transport`] over the GitHub REST API (or a compatible server)
#[derive(Debug, Clone)]
pub struct GithubClient {
    pub remote: Url,
    owner: String,
    client: Client,
}

impl GithubClient {
    pub fn new(credentials: &Credentials, remote: &Url) -> Result<Self, TransportError> {
        let mut authorization = HeaderValue::from_str(&credentials.authorization())
            .map_err(|e| TransportError::Request(format!("invalid credentials: {}", e)))?;
        authorization.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(AUTHORIZATION, authorization);
        default_headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        default_headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        let client = Client::builder().default_headers(default_headers).build()?;

        // keep the last path segment when joining, e.g. `/api/v3`
        let mut remote = remote.clone();
        if !remote.path().ends_with('/') {
            let path = format!("{}/", remote.path());
            remote.set_path(&path);
        }

        Ok(Self {
            remote,
            owner: credentials.identity().to_string(),
            client,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Send a request, returning the decoded body and the `Link` header
    pub async fn call<T: ApiRequest>(
        &self,
        request: T,
    ) -> Result<(T::Response, Option<String>), TransportError> {
        let request_builder = request.build_request(&self.remote, &self.owner, &self.client)?;
        let response = request_builder.send().await?;

        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let status = response.status();
        if status.is_success() {
            Ok((response.json::<T::Response>().await?, link))
        } else {
            tracing::debug!("{} answered {}", response.url(), status);
            Err(TransportError::from_status(status, response.text().await?))
        }
    }
}

#[async_trait]
impl Transport for GithubClient {
    async fn get_repository(&self, repo: &str) -> Result<Repository, TransportError> {
        let (repository, _) = self.call(GetRepository::new(repo)).await?;
        Ok(repository)
    }

    async fn create_repository(
        &self,
        repository: &NewRepository,
    ) -> Result<Repository, TransportError> {
        let (repository, _) = self.call(CreateRepository(repository.clone())).await?;
        Ok(repository)
    }

    async fn list_milestones(
        &self,
        repo: &str,
        page: u32,
    ) -> Result<Page<Milestone>, TransportError> {
        let (items, link) = self.call(ListMilestones::new(repo, page)).await?;
        Ok(Page::new(items, link))
    }

    async fn create_milestone(
        &self,
        repo: &str,
        milestone: &NewMilestone,
    ) -> Result<Milestone, TransportError> {
        let (milestone, _) = self
            .call(CreateMilestone::new(repo, milestone.clone()))
            .await?;
        Ok(milestone)
    }

    async fn list_issues(
        &self,
        repo: &str,
        query: &IssueQuery,
    ) -> Result<Page<Issue>, TransportError> {
        let (items, link) = self.call(ListIssues::new(repo, query.clone())).await?;
        Ok(Page::new(items, link))
    }

    async fn create_issue(&self, repo: &str, issue: &NewIssue) -> Result<Issue, TransportError> {
        let (issue, _) = self.call(CreateIssue::new(repo, issue.clone())).await?;
        Ok(issue)
    }

    async fn update_issue(
        &self,
        repo: &str,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<Issue, TransportError> {
        let (issue, _) = self
            .call(UpdateIssue::new(repo, number, patch.clone()))
            .await?;
        Ok(issue)
    }

    async fn list_labels(&self, repo: &str, page: u32) -> Result<Page<Label>, TransportError> {
        let (items, link) = self.call(ListLabels::new(repo, page)).await?;
        Ok(Page::new(items, link))
    }
}
