//! Batch executor
//!
//! Multi-document writes issue one request per document, all at once, and
//! wait for every one of them. Nothing is rolled back: when a member fails,
//! the members that succeeded stay applied on the tracker. [`BatchOutcome`]
//! keeps the per-document results so callers can tell which ones landed.

use std::future::Future;

use common::prelude::Document;
use futures::future::join_all;

use crate::error::StoreError;

/// Documents handed to a write: one or many
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch(Vec<Document>);

impl Batch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.0
    }
}

impl From<Document> for Batch {
    fn from(doc: Document) -> Self {
        Self(vec![doc])
    }
}

impl From<Vec<Document>> for Batch {
    fn from(docs: Vec<Document>) -> Self {
        Self(docs)
    }
}

impl<const N: usize> From<[Document; N]> for Batch {
    fn from(docs: [Document; N]) -> Self {
        Self(docs.into())
    }
}

impl From<&[Document]> for Batch {
    fn from(docs: &[Document]) -> Self {
        Self(docs.to_vec())
    }
}

impl FromIterator<Document> for Batch {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Batch {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Per-document results of a batch, in input order
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    results: Vec<Result<T, StoreError>>,
}

impl<T> BatchOutcome<T> {
    pub fn results(&self) -> &[Result<T, StoreError>] {
        &self.results
    }

    pub fn into_results(self) -> Vec<Result<T, StoreError>> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &T> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Failed members with their input position
    pub fn failures(&self) -> impl Iterator<Item = (usize, &StoreError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }

    /// All values, or the first failure in input order
    pub fn into_result(self) -> Result<Vec<T>, StoreError> {
        self.results.into_iter().collect()
    }
}

/// Run `op` over every item concurrently and wait for all of them
pub async fn execute<I, T, F, Fut>(items: impl IntoIterator<Item = I>, op: F) -> BatchOutcome<T>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let results = join_all(items.into_iter().map(op)).await;

    let outcome = BatchOutcome { results };
    let failed = outcome.failures().count();
    if failed > 0 {
        tracing::warn!(
            "{} of {} batch members failed, the rest were applied",
            failed,
            outcome.len()
        );
    }
    outcome
}
