//! Repository and namespace resolution
//!
//! Both values are resolved once per store handle. [`SingleFlight`] holds the
//! in-flight or finished resolution; every awaiter gets a clone of the same
//! outcome, failures included. Two handles never share one, so two processes
//! (or two handles) opening a database that has no milestone yet may both
//! create one. The first milestone in listing order wins on later lookups.

use std::future::Future;

use common::prelude::Cipher;
use futures::future::{BoxFuture, FutureExt, Shared};

use crate::config::StoreOptions;
use crate::error::StoreError;
use crate::pagination;
use crate::transport::{
    Milestone, NewMilestone, NewRepository, Repository, Transport, TransportError,
};

/// A memoized asynchronous value
pub(crate) struct SingleFlight<T: Clone>(Shared<BoxFuture<'static, Result<T, StoreError>>>);

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(resolve: F) -> Self
    where
        F: Future<Output = Result<T, StoreError>> + Send + 'static,
    {
        Self(resolve.boxed().shared())
    }

    pub async fn get(&self) -> Result<T, StoreError> {
        self.0.clone().await
    }

    #[cfg(test)]
    pub fn peek(&self) -> Option<Result<T, StoreError>> {
        self.0.peek().cloned()
    }
}

impl<T: Clone> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Make sure the configured repository exists, creating it once if missing
pub(crate) async fn connect<T: Transport>(
    transport: &T,
    options: &StoreOptions,
) -> Result<Repository, StoreError> {
    match transport.get_repository(&options.repository_name).await {
        Ok(repository) => {
            tracing::debug!("connected to repository {}", repository.name);
            Ok(repository)
        }
        Err(TransportError::NotFound(_)) => {
            tracing::info!(
                "repository {} not found, creating it",
                options.repository_name
            );
            let repository = transport
                .create_repository(&NewRepository {
                    name: options.repository_name.clone(),
                    has_issues: true,
                    has_wiki: false,
                    private: options.private_repository,
                })
                .await?;
            Ok(repository)
        }
        Err(e) => {
            tracing::warn!("failed to look up repository {}: {}", options.repository_name, e);
            Err(e.into())
        }
    }
}

/// Find the milestone whose decrypted title is `db_name`, or create it
pub(crate) async fn resolve<T: Transport>(
    transport: &T,
    repo: &str,
    db_name: &str,
    cipher: &dyn Cipher,
) -> Result<Milestone, StoreError> {
    let milestones =
        pagination::walk_all(|page| transport.list_milestones(repo, page)).await?;

    if let Some(milestone) = milestones
        .into_iter()
        .find(|m| names_database(cipher, &m.title, db_name))
    {
        tracing::debug!("database resolved to milestone {}", milestone.number);
        return Ok(milestone);
    }

    tracing::info!("no milestone for this database yet, creating one");
    let title = cipher.encrypt(db_name)?;
    let milestone = transport
        .create_milestone(repo, &NewMilestone { title })
        .await?;
    Ok(milestone)
}

// milestones that don't decrypt belong to someone else
fn names_database(cipher: &dyn Cipher, title: &str, db_name: &str) -> bool {
    match cipher.decrypt(title) {
        Ok(plaintext) => plaintext == db_name,
        Err(e) => {
            tracing::trace!("skipping milestone title: {}", e);
            false
        }
    }
}
