use std::collections::HashSet;

use common::prelude::{DecodePolicy, Document, DocumentCodec, PartitionTag, TagFilter};

use crate::batch::{self, Batch, BatchOutcome};
use crate::error::StoreError;
use crate::pagination;
use crate::store::Store;
use crate::transport::{Issue, IssuePatch, IssueQuery, IssueState, NewIssue, Transport};

/// The documents of one collection in a store's database
///
/// Every operation waits for the store's namespace first. If that failed, the
/// operation fails with the same error before touching any issue.
#[derive(Debug)]
pub struct Collection<T: Transport> {
    store: Store<T>,
    codec: DocumentCodec,
}

impl<T: Transport> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<T: Transport> Collection<T> {
    pub(crate) fn new(store: Store<T>, name: &str) -> Self {
        let tag = PartitionTag::new(store.db_name(), name);
        let codec = DocumentCodec::new(store.cipher(), tag);
        Self { store, codec }
    }

    pub fn name(&self) -> &str {
        &self.codec.tag().label
    }

    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    /// Every open document of this collection
    pub async fn find(&self) -> Result<Vec<Document>, StoreError> {
        self.find_with(TagFilter::Current).await
    }

    /// Every open document matching `filter`
    ///
    /// With [`TagFilter::WithLegacy`] the documents tagged in the older
    /// encoding are listed too, after the current ones; a document carrying
    /// both tags is returned once.
    #[tracing::instrument(skip(self), fields(collection = %self.name()))]
    pub async fn find_with(&self, filter: TagFilter) -> Result<Vec<Document>, StoreError> {
        let milestone = self.store.namespace().await?;
        let labels = filter.labels(self.codec.tag(), self.codec.cipher())?;

        let mut seen = HashSet::new();
        let mut docs = Vec::new();
        for label in labels {
            for doc in self.list(milestone.number, &label).await? {
                if doc.id().map_or(true, |id| seen.insert(id)) {
                    docs.push(doc);
                }
            }
        }

        tracing::debug!("found {} documents", docs.len());
        Ok(docs)
    }

    async fn list(&self, milestone: u64, label: &str) -> Result<Vec<Document>, StoreError> {
        let transport = self.store.transport();
        let repo = self.store.repository_name();
        let policy = self.store.options().decode_policy;

        pagination::walk(
            |page| {
                let query = IssueQuery::new(milestone, label, page);
                async move { transport.list_issues(repo, &query).await }
            },
            |issue| self.decode_listed(issue, policy),
        )
        .await
    }

    fn decode_listed(
        &self,
        issue: Issue,
        policy: DecodePolicy,
    ) -> Result<Option<Document>, StoreError> {
        match self.codec.decode(issue.number, issue.body.as_deref()) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) if policy == DecodePolicy::Skip => {
                tracing::warn!("skipping issue #{} that does not decode: {}", issue.number, e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store new documents, returning them with their `$id`, in input order
    pub async fn insert(&self, docs: impl Into<Batch>) -> Result<Vec<Document>, StoreError> {
        self.insert_each(docs).await?.into_result()
    }

    /// Like [`Collection::insert`], reporting each document's result
    #[tracing::instrument(skip(self, docs), fields(collection = %self.name()))]
    pub async fn insert_each(
        &self,
        docs: impl Into<Batch>,
    ) -> Result<BatchOutcome<Document>, StoreError> {
        let milestone = self.store.namespace().await?;
        Ok(batch::execute(docs.into(), |doc| self.create(milestone.number, doc)).await)
    }

    async fn create(&self, milestone: u64, doc: Document) -> Result<Document, StoreError> {
        let encoded = self.codec.encode(&doc)?;
        let issue = self
            .store
            .transport()
            .create_issue(
                self.store.repository_name(),
                &NewIssue {
                    title: encoded.title,
                    body: encoded.body,
                    labels: encoded.labels,
                    milestone,
                },
            )
            .await?;
        Ok(self.codec.decode(issue.number, issue.body.as_deref())?)
    }

    /// Overwrite documents in place; each must carry `$id`
    pub async fn update(&self, docs: impl Into<Batch>) -> Result<Vec<Document>, StoreError> {
        self.update_each(docs).await?.into_result()
    }

    /// Like [`Collection::update`], reporting each document's result
    #[tracing::instrument(skip(self, docs), fields(collection = %self.name()))]
    pub async fn update_each(
        &self,
        docs: impl Into<Batch>,
    ) -> Result<BatchOutcome<Document>, StoreError> {
        self.store.namespace().await?;
        Ok(batch::execute(docs.into(), |doc| async move {
            let issue = self.patch(&doc, IssueState::Open).await?;
            Ok::<_, StoreError>(self.codec.decode(issue.number, issue.body.as_deref())?)
        })
        .await)
    }

    /// Close the issues behind documents; each must carry `$id`
    pub async fn remove(&self, docs: impl Into<Batch>) -> Result<(), StoreError> {
        self.remove_each(docs).await?.into_result()?;
        Ok(())
    }

    /// Like [`Collection::remove`], reporting each removed `$id`
    #[tracing::instrument(skip(self, docs), fields(collection = %self.name()))]
    pub async fn remove_each(
        &self,
        docs: impl Into<Batch>,
    ) -> Result<BatchOutcome<u64>, StoreError> {
        self.store.namespace().await?;
        Ok(batch::execute(docs.into(), |doc| async move {
            let issue = self.patch(&doc, IssueState::Closed).await?;
            Ok::<_, StoreError>(issue.number)
        })
        .await)
    }

    async fn patch(&self, doc: &Document, state: IssueState) -> Result<Issue, StoreError> {
        let number = self.codec.address(doc)?;
        let body = self.codec.encode_body(doc)?;
        let issue = self
            .store
            .transport()
            .update_issue(
                self.store.repository_name(),
                number,
                &IssuePatch { body, state },
            )
            .await?;
        Ok(issue)
    }
}
