//! The issue tracker the store is layered on
//!
//! [`Transport`] is the seam between the mapping protocol and HTTP. It names
//! exactly the endpoints the store needs; [`GithubClient`] speaks them to the
//! GitHub REST API and [`MemoryTransport`] keeps them in process for tests.

mod error;
pub mod github;
pub mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};

pub use error::TransportError;
pub use github::{Credentials, GithubClient};
pub use memory::{Call, MemoryTransport, Operation};

/// Page size for every listing
pub const PER_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub has_issues: bool,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRepository {
    pub name: String,
    pub has_issues: bool,
    pub has_wiki: bool,
    pub private: bool,
}

/// A namespace marker: one milestone per database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMilestone {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

/// State filter for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    pub fn matches(&self, state: IssueState) -> bool {
        matches!(
            (self, state),
            (StateFilter::All, _)
                | (StateFilter::Open, IssueState::Open)
                | (StateFilter::Closed, IssueState::Closed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub milestone: Option<Milestone>,
    #[serde(default)]
    pub state: IssueState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub milestone: u64,
}

/// Replaces the body and sets the state; everything else is left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePatch {
    pub body: String,
    pub state: IssueState,
}

/// Query string of an issue listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueQuery {
    pub milestone: u64,
    /// Issues must carry every label. Sent comma separated.
    #[serde(serialize_with = "comma_separated")]
    pub labels: Vec<String>,
    pub state: StateFilter,
    pub per_page: u32,
    pub page: u32,
}

impl IssueQuery {
    /// Open issues in `milestone` carrying `label`, one full page at `page`
    pub fn new(milestone: u64, label: impl Into<String>, page: u32) -> Self {
        Self {
            milestone,
            labels: vec![label.into()],
            state: StateFilter::Open,
            per_page: PER_PAGE,
            page,
        }
    }
}

fn comma_separated<S: Serializer>(labels: &[String], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&labels.join(","))
}

/// One page of a listing plus the raw `Link` header that came with it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub link: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, link: Option<String>) -> Self {
        Self { items, link }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + Debug + 'static {
    /// `GET /repos/{owner}/{repo}`
    async fn get_repository(&self, repo: &str) -> Result<Repository, TransportError>;

    /// `POST /user/repos`
    async fn create_repository(
        &self,
        repository: &NewRepository,
    ) -> Result<Repository, TransportError>;

    /// `GET /repos/{owner}/{repo}/milestones`, all states
    async fn list_milestones(
        &self,
        repo: &str,
        page: u32,
    ) -> Result<Page<Milestone>, TransportError>;

    /// `POST /repos/{owner}/{repo}/milestones`
    async fn create_milestone(
        &self,
        repo: &str,
        milestone: &NewMilestone,
    ) -> Result<Milestone, TransportError>;

    /// `GET /repos/{owner}/{repo}/issues`
    async fn list_issues(&self, repo: &str, query: &IssueQuery)
        -> Result<Page<Issue>, TransportError>;

    /// `POST /repos/{owner}/{repo}/issues`
    async fn create_issue(&self, repo: &str, issue: &NewIssue) -> Result<Issue, TransportError>;

    /// `PATCH /repos/{owner}/{repo}/issues/{number}`
    async fn update_issue(
        &self,
        repo: &str,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<Issue, TransportError>;

    /// `GET /repos/{owner}/{repo}/labels`
    async fn list_labels(&self, repo: &str, page: u32) -> Result<Page<Label>, TransportError>;
}
