use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

use common::prelude::{Cipher, PartitionTag};
use regex::Regex;

use crate::collection::Collection;
use crate::config::StoreOptions;
use crate::error::StoreError;
use crate::namespace::{self, SingleFlight};
use crate::pagination;
use crate::transport::{Credentials, GithubClient, Label, Milestone, Repository, Transport};

static COLLECTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Za-z_]+$").expect("valid collection name regex"));

/// Handle on one database in one repository
///
/// Cloning is cheap and clones share the memoized connection and namespace.
pub struct Store<T: Transport> {
    inner: Arc<StoreInner<T>>,
}

struct StoreInner<T: Transport> {
    transport: Arc<T>,
    options: StoreOptions,
    connection: SingleFlight<Repository>,
    namespace: SingleFlight<Milestone>,
}

impl Store<GithubClient> {
    /// Open a database on GitHub as `identity`, authenticating with `secret`
    ///
    /// No request is made until the first operation awaits the connection.
    pub fn open(identity: &str, secret: &str, options: StoreOptions) -> Result<Self, StoreError> {
        if identity.is_empty() {
            return Err(StoreError::EmptyIdentity);
        }
        if secret.is_empty() {
            return Err(StoreError::EmptySecret);
        }

        let credentials = Credentials::new(identity, secret);
        let client = GithubClient::new(&credentials, &options.api_url)?;
        Ok(Self::with_transport(client, options))
    }
}

impl<T: Transport> Store<T> {
    pub fn with_transport(transport: T, options: StoreOptions) -> Self {
        let transport = Arc::new(transport);

        let connection = {
            let transport = transport.clone();
            let options = options.clone();
            SingleFlight::new(async move { namespace::connect(transport.as_ref(), &options).await })
        };

        let namespace = {
            let transport = transport.clone();
            let options = options.clone();
            let connection = connection.clone();
            SingleFlight::new(async move {
                connection.get().await?;
                namespace::resolve(
                    transport.as_ref(),
                    &options.repository_name,
                    &options.db_name,
                    options.cipher.as_ref(),
                )
                .await
            })
        };

        Self {
            inner: Arc::new(StoreInner {
                transport,
                options,
                connection,
                namespace,
            }),
        }
    }

    pub fn transport(&self) -> &T {
        self.inner.transport.as_ref()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    pub fn repository_name(&self) -> &str {
        &self.inner.options.repository_name
    }

    pub fn db_name(&self) -> &str {
        &self.inner.options.db_name
    }

    pub(crate) fn cipher(&self) -> Arc<dyn Cipher> {
        self.inner.options.cipher.clone()
    }

    /// The backing repository, created on first use if missing
    pub async fn connection(&self) -> Result<Repository, StoreError> {
        self.inner.connection.get().await
    }

    /// The milestone marking this database, created on first use if missing
    pub async fn namespace(&self) -> Result<Milestone, StoreError> {
        self.inner.namespace.get().await
    }

    /// A collection of this database. Names are limited to `[0-9A-Za-z_]+`.
    pub fn collection(&self, name: &str) -> Result<Collection<T>, StoreError> {
        if !COLLECTION_NAME.is_match(name) {
            return Err(StoreError::InvalidCollectionName(name.to_string()));
        }
        Ok(Collection::new(self.clone(), name))
    }

    /// Names of the collections this database has written to
    ///
    /// Read from the repository's labels. Labels that aren't partition tags
    /// of this database, in either encoding, are ignored. Fails with
    /// [`StoreError::IrreversibleLabels`] for ciphers whose labels are
    /// digests, such as the built-in secret cipher.
    #[tracing::instrument(skip(self), fields(db = %self.db_name()))]
    pub async fn collections(&self) -> Result<Vec<String>, StoreError> {
        let cipher = self.cipher();
        if !cipher.reversible_labels() {
            return Err(StoreError::IrreversibleLabels);
        }
        self.connection().await?;

        let transport = self.transport();
        let repo = self.repository_name();
        let labels = pagination::walk(
            |page| transport.list_labels(repo, page),
            |label: Label| Ok(self.collection_of(cipher.as_ref(), &label)),
        )
        .await?;

        let mut seen = HashSet::new();
        Ok(labels
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect())
    }

    fn collection_of(&self, cipher: &dyn Cipher, label: &Label) -> Option<String> {
        match PartitionTag::decrypt(cipher, &label.name) {
            Ok(tag) if tag.db_name == self.db_name() => Some(tag.label),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("ignoring label that is not a partition tag: {}", e);
                None
            }
        }
    }
}

impl<T: Transport> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("transport", &self.inner.transport)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}
