use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use common::tag::MAX_LABEL_LEN;
use http::StatusCode;

use super::{
    Issue, IssuePatch, IssueQuery, IssueState, Label, Milestone, NewIssue, NewMilestone,
    NewRepository, Page, Repository, Transport, TransportError, PER_PAGE,
};

/// The kinds of call a transport serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetRepository,
    CreateRepository,
    ListMilestones,
    CreateMilestone,
    ListIssues,
    CreateIssue,
    UpdateIssue,
    ListLabels,
}

/// A recorded call, with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetRepository(String),
    CreateRepository(NewRepository),
    ListMilestones { repo: String, page: u32 },
    CreateMilestone { repo: String, milestone: NewMilestone },
    ListIssues { repo: String, query: IssueQuery },
    CreateIssue { repo: String, issue: NewIssue },
    UpdateIssue { repo: String, number: u64, patch: IssuePatch },
    ListLabels { repo: String, page: u32 },
}

impl Call {
    pub fn operation(&self) -> Operation {
        match self {
            Call::GetRepository(_) => Operation::GetRepository,
            Call::CreateRepository(_) => Operation::CreateRepository,
            Call::ListMilestones { .. } => Operation::ListMilestones,
            Call::CreateMilestone { .. } => Operation::CreateMilestone,
            Call::ListIssues { .. } => Operation::ListIssues,
            Call::CreateIssue { .. } => Operation::CreateIssue,
            Call::UpdateIssue { .. } => Operation::UpdateIssue,
            Call::ListLabels { .. } => Operation::ListLabels,
        }
    }
}

/// In-process issue tracker
///
/// Behaves like the GitHub API where the store can tell the difference:
/// pages 0 and 1 are both the first page, a `Link` header with `rel="next"`
/// is sent while more items remain, issues list newest first, labels are
/// created on first use and label names over 50 characters are refused.
/// Every call is recorded, and calls can be made to fail for testing error
/// paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<RwLock<MemoryTransportInner>>,
}

#[derive(Debug, Default)]
struct MemoryTransportInner {
    repositories: HashMap<String, MemoryRepository>,
    next_repository_id: u64,
    calls: Vec<Call>,
    failures: Vec<FailureRule>,
}

#[derive(Debug)]
struct MemoryRepository {
    repository: Repository,
    milestones: Vec<Milestone>,
    issues: Vec<Issue>,
    labels: Vec<Label>,
}

impl MemoryRepository {
    fn new(repository: Repository) -> Self {
        Self {
            repository,
            milestones: Vec::new(),
            issues: Vec::new(),
            labels: Vec::new(),
        }
    }

    fn add_milestone(&mut self, title: String) -> Milestone {
        let milestone = Milestone {
            number: self.milestones.len() as u64 + 1,
            title,
        };
        self.milestones.push(milestone.clone());
        milestone
    }

    fn add_issue(&mut self, issue: NewIssue) -> Result<Issue, TransportError> {
        let milestone = self
            .milestones
            .iter()
            .find(|m| m.number == issue.milestone)
            .cloned()
            .ok_or_else(|| {
                TransportError::Status(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("milestone {} does not exist", issue.milestone),
                )
            })?;

        let too_long = |name: &&String| name.chars().count() > MAX_LABEL_LEN;
        if let Some(name) = issue.labels.iter().find(too_long) {
            return Err(TransportError::Status(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("label name is too long (maximum is {}): {}", MAX_LABEL_LEN, name),
            ));
        }

        for name in &issue.labels {
            if !self.labels.iter().any(|l| &l.name == name) {
                self.labels.push(Label { name: name.clone() });
            }
        }

        let created = Issue {
            number: self.issues.len() as u64 + 1,
            title: issue.title,
            body: Some(issue.body),
            labels: issue.labels.into_iter().map(|name| Label { name }).collect(),
            milestone: Some(milestone),
            state: IssueState::Open,
        };
        self.issues.push(created.clone());
        Ok(created)
    }
}

#[derive(Debug)]
struct FailureRule {
    operation: Operation,
    /// calls let through before failing
    after: usize,
    seen: usize,
    error: TransportError,
}

/// GitHub-style paging over an already filtered and ordered listing
fn paginate<T: Clone>(items: &[T], path: &str, per_page: u32, page: u32) -> Page<T> {
    let per_page = per_page.max(1) as usize;
    let page = page.max(1) as usize;
    let start = (page - 1).saturating_mul(per_page).min(items.len());
    let end = (start + per_page).min(items.len());
    let last = items.len().div_ceil(per_page).max(1);

    let url = |n: usize| format!("<memory://{}?per_page={}&page={}>", path, per_page, n);
    let mut relations = Vec::new();
    if page < last {
        relations.push(format!("{}; rel=\"next\"", url(page + 1)));
        relations.push(format!("{}; rel=\"last\"", url(last)));
    }
    if page > 1 {
        relations.push(format!("{}; rel=\"first\"", url(1)));
        relations.push(format!("{}; rel=\"prev\"", url(page - 1)));
    }

    let link = (!relations.is_empty()).then(|| relations.join(", "));
    Page::new(items[start..end].to_vec(), link)
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RwLockWriteGuard<'_, MemoryTransportInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a repository without recording a call
    pub fn with_repository(self, name: &str) -> Self {
        self.lock().insert_repository(name, false);
        self
    }

    /// Seed a milestone without recording a call
    pub fn add_milestone(&self, repo: &str, title: &str) -> Option<Milestone> {
        let mut inner = self.lock();
        let repository = inner.repositories.get_mut(repo)?;
        Some(repository.add_milestone(title.to_string()))
    }

    /// Seed an issue without recording a call
    pub fn add_issue(&self, repo: &str, issue: NewIssue) -> Result<Issue, TransportError> {
        let mut inner = self.lock();
        let repository = inner
            .repositories
            .get_mut(repo)
            .ok_or_else(|| TransportError::NotFound(repo.to_string()))?;
        repository.add_issue(issue)
    }

    /// Seed a label without recording a call
    pub fn add_label(&self, repo: &str, name: &str) {
        if let Some(repository) = self.lock().repositories.get_mut(repo) {
            repository.labels.push(Label {
                name: name.to_string(),
            });
        }
    }

    pub fn issue(&self, repo: &str, number: u64) -> Option<Issue> {
        self.lock()
            .repositories
            .get(repo)?
            .issues
            .iter()
            .find(|i| i.number == number)
            .cloned()
    }

    pub fn issues(&self, repo: &str) -> Vec<Issue> {
        self.lock()
            .repositories
            .get(repo)
            .map(|r| r.issues.clone())
            .unwrap_or_default()
    }

    pub fn milestones(&self, repo: &str) -> Vec<Milestone> {
        self.lock()
            .repositories
            .get(repo)
            .map(|r| r.milestones.clone())
            .unwrap_or_default()
    }

    /// Fail every call of `operation` with `error`
    pub fn fail(&self, operation: Operation, error: TransportError) {
        self.fail_after(operation, 0, error);
    }

    /// Let `after` calls of `operation` through, then fail the rest
    pub fn fail_after(&self, operation: Operation, after: usize, error: TransportError) {
        self.lock().failures.push(FailureRule {
            operation,
            after,
            seen: 0,
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }
}

impl MemoryTransportInner {
    fn insert_repository(&mut self, name: &str, private: bool) -> Repository {
        self.next_repository_id += 1;
        let repository = Repository {
            id: self.next_repository_id,
            name: name.to_string(),
            has_issues: true,
            private,
        };
        self.repositories
            .insert(name.to_string(), MemoryRepository::new(repository.clone()));
        repository
    }

    /// Record the call, then apply any matching failure rule
    fn record(&mut self, call: Call) -> Result<(), TransportError> {
        let operation = call.operation();
        self.calls.push(call);
        for rule in self.failures.iter_mut().filter(|r| r.operation == operation) {
            rule.seen += 1;
            if rule.seen > rule.after {
                return Err(rule.error.clone());
            }
        }
        Ok(())
    }

    fn repository(&mut self, repo: &str) -> Result<&mut MemoryRepository, TransportError> {
        self.repositories
            .get_mut(repo)
            .ok_or_else(|| TransportError::NotFound(format!("repository {} not found", repo)))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get_repository(&self, repo: &str) -> Result<Repository, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::GetRepository(repo.to_string()))?;
        Ok(inner.repository(repo)?.repository.clone())
    }

    async fn create_repository(
        &self,
        repository: &NewRepository,
    ) -> Result<Repository, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::CreateRepository(repository.clone()))?;
        if inner.repositories.contains_key(&repository.name) {
            return Err(TransportError::Status(
                StatusCode::UNPROCESSABLE_ENTITY,
                "name already exists on this account".to_string(),
            ));
        }
        Ok(inner.insert_repository(&repository.name, repository.private))
    }

    async fn list_milestones(
        &self,
        repo: &str,
        page: u32,
    ) -> Result<Page<Milestone>, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::ListMilestones {
            repo: repo.to_string(),
            page,
        })?;
        let milestones = &inner.repository(repo)?.milestones;
        Ok(paginate(milestones, "milestones", PER_PAGE, page))
    }

    async fn create_milestone(
        &self,
        repo: &str,
        milestone: &NewMilestone,
    ) -> Result<Milestone, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::CreateMilestone {
            repo: repo.to_string(),
            milestone: milestone.clone(),
        })?;
        Ok(inner.repository(repo)?.add_milestone(milestone.title.clone()))
    }

    async fn list_issues(
        &self,
        repo: &str,
        query: &IssueQuery,
    ) -> Result<Page<Issue>, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::ListIssues {
            repo: repo.to_string(),
            query: query.clone(),
        })?;

        let matching: Vec<Issue> = inner
            .repository(repo)?
            .issues
            .iter()
            .rev()
            .filter(|issue| {
                issue.milestone.as_ref().map(|m| m.number) == Some(query.milestone)
                    && query.state.matches(issue.state)
                    && query
                        .labels
                        .iter()
                        .all(|w| issue.labels.iter().any(|l| &l.name == w))
            })
            .cloned()
            .collect();

        Ok(paginate(&matching, "issues", query.per_page, query.page))
    }

    async fn create_issue(&self, repo: &str, issue: &NewIssue) -> Result<Issue, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::CreateIssue {
            repo: repo.to_string(),
            issue: issue.clone(),
        })?;
        inner.repository(repo)?.add_issue(issue.clone())
    }

    async fn update_issue(
        &self,
        repo: &str,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<Issue, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::UpdateIssue {
            repo: repo.to_string(),
            number,
            patch: patch.clone(),
        })?;
        let issue = inner
            .repository(repo)?
            .issues
            .iter_mut()
            .find(|i| i.number == number)
            .ok_or_else(|| TransportError::NotFound(format!("issue #{} not found", number)))?;
        issue.body = Some(patch.body.clone());
        issue.state = patch.state;
        Ok(issue.clone())
    }

    async fn list_labels(&self, repo: &str, page: u32) -> Result<Page<Label>, TransportError> {
        let mut inner = self.lock();
        inner.record(Call::ListLabels {
            repo: repo.to_string(),
            page,
        })?;
        let labels = &inner.repository(repo)?.labels;
        Ok(paginate(labels, "labels", PER_PAGE, page))
    }
}
