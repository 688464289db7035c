use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use url::Url;

use super::ApiRequest;
use crate::transport::{
    Issue, IssuePatch, IssueQuery, Label, Milestone, NewIssue, NewMilestone, NewRepository,
    Repository, StateFilter, TransportError, PER_PAGE,
};

fn repo_url(base_url: &Url, owner: &str, repo: &str, rest: &str) -> Result<Url, TransportError> {
    Ok(base_url.join(&format!("repos/{}/{}{}", owner, repo, rest))?)
}

#[derive(Debug, Clone, Serialize)]
struct PageQuery {
    state: StateFilter,
    per_page: u32,
    page: u32,
}

pub struct GetRepository {
    repo: String,
}

impl GetRepository {
    pub fn new(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
        }
    }
}

impl ApiRequest for GetRepository {
    type Response = Repository;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        Ok(client.get(repo_url(base_url, owner, &self.repo, "")?))
    }
}

pub struct CreateRepository(pub NewRepository);

impl ApiRequest for CreateRepository {
    type Response = Repository;

    fn build_request(
        self,
        base_url: &Url,
        _owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        Ok(client.post(base_url.join("user/repos")?).json(&self.0))
    }
}

pub struct ListMilestones {
    repo: String,
    page: u32,
}

impl ListMilestones {
    pub fn new(repo: &str, page: u32) -> Self {
        Self {
            repo: repo.to_string(),
            page,
        }
    }
}

impl ApiRequest for ListMilestones {
    type Response = Vec<Milestone>;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        // closed markers still name a database
        let query = PageQuery {
            state: StateFilter::All,
            per_page: PER_PAGE,
            page: self.page,
        };
        Ok(client
            .get(repo_url(base_url, owner, &self.repo, "/milestones")?)
            .query(&query))
    }
}

pub struct CreateMilestone {
    repo: String,
    milestone: NewMilestone,
}

impl CreateMilestone {
    pub fn new(repo: &str, milestone: NewMilestone) -> Self {
        Self {
            repo: repo.to_string(),
            milestone,
        }
    }
}

impl ApiRequest for CreateMilestone {
    type Response = Milestone;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        Ok(client
            .post(repo_url(base_url, owner, &self.repo, "/milestones")?)
            .json(&self.milestone))
    }
}

pub struct ListIssues {
    repo: String,
    query: IssueQuery,
}

impl ListIssues {
    pub fn new(repo: &str, query: IssueQuery) -> Self {
        Self {
            repo: repo.to_string(),
            query,
        }
    }
}

impl ApiRequest for ListIssues {
    type Response = Vec<Issue>;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        Ok(client
            .get(repo_url(base_url, owner, &self.repo, "/issues")?)
            .query(&self.query))
    }
}

pub struct CreateIssue {
    repo: String,
    issue: NewIssue,
}

impl CreateIssue {
    pub fn new(repo: &str, issue: NewIssue) -> Self {
        Self {
            repo: repo.to_string(),
            issue,
        }
    }
}

impl ApiRequest for CreateIssue {
    type Response = Issue;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        Ok(client
            .post(repo_url(base_url, owner, &self.repo, "/issues")?)
            .json(&self.issue))
    }
}

pub struct UpdateIssue {
    repo: String,
    number: u64,
    patch: IssuePatch,
}

impl UpdateIssue {
    pub fn new(repo: &str, number: u64, patch: IssuePatch) -> Self {
        Self {
            repo: repo.to_string(),
            number,
            patch,
        }
    }
}

impl ApiRequest for UpdateIssue {
    type Response = Issue;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        let path = format!("/issues/{}", self.number);
        Ok(client
            .patch(repo_url(base_url, owner, &self.repo, &path)?)
            .json(&self.patch))
    }
}

pub struct ListLabels {
    repo: String,
    page: u32,
}

impl ListLabels {
    pub fn new(repo: &str, page: u32) -> Self {
        Self {
            repo: repo.to_string(),
            page,
        }
    }
}

impl ApiRequest for ListLabels {
    type Response = Vec<Label>;

    fn build_request(
        self,
        base_url: &Url,
        owner: &str,
        client: &Client,
    ) -> Result<RequestBuilder, TransportError> {
        Ok(client
            .get(repo_url(base_url, owner, &self.repo, "/labels")?)
            .query(&[("per_page", PER_PAGE), ("page", self.page)]))
    }
}
