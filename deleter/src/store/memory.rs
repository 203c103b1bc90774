use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::DeleterResult;
use crate::store::DeletionStore;
use crate::types::{DeletionRequest, ShortCode, UserId};

#[derive(Debug, Default)]
struct Inner {
    links: HashSet<(UserId, ShortCode)>,
}

/// In-memory deletion store for testing and development purposes.
///
/// [`MemoryDeletionStore`] keeps ownership links in memory, making it ideal
/// for exercising the pipeline without a database. All data is lost when the
/// process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeletionStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDeletionStore {
    /// Creates a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an ownership link, as the shorten endpoint would.
    pub async fn insert_ownership(&self, user_id: UserId, short_code: impl Into<ShortCode>) {
        let mut inner = self.inner.lock().await;
        inner.links.insert((user_id, short_code.into()));
    }

    /// Returns whether the given ownership link is present.
    pub async fn contains(&self, user_id: UserId, short_code: &ShortCode) -> bool {
        let inner = self.inner.lock().await;
        inner.links.contains(&(user_id, short_code.clone()))
    }

    /// Number of ownership links currently stored.
    pub async fn len(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.links.len()
    }

    /// Returns whether the store holds no ownership links.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl DeletionStore for MemoryDeletionStore {
    fn name() -> &'static str {
        "memory"
    }

    async fn delete_ownership(&self, batch: &[DeletionRequest]) -> DeleterResult<u64> {
        let mut inner = self.inner.lock().await;

        let mut affected = 0;
        for request in batch {
            if inner
                .links
                .remove(&(request.user_id, request.short_code.clone()))
            {
                affected += 1;
            }
        }

        info!(
            batch_len = batch.len(),
            affected, "deleted a batch of ownership links"
        );

        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_only_links_actually_removed() {
        let store = MemoryDeletionStore::new();
        let user = UserId(1);

        store.insert_ownership(user, "a").await;
        store.insert_ownership(user, "b").await;

        let batch = vec![
            DeletionRequest::new(user, "a"),
            DeletionRequest::new(user, "b"),
            DeletionRequest::new(user, "missing"),
        ];
        let affected = store.delete_ownership(&batch).await.unwrap();

        assert_eq!(affected, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn links_are_scoped_per_user() {
        let store = MemoryDeletionStore::new();

        store.insert_ownership(UserId(1), "a").await;
        store.insert_ownership(UserId(2), "a").await;

        let batch = vec![DeletionRequest::new(UserId(1), "a")];
        let affected = store.delete_ownership(&batch).await.unwrap();

        assert_eq!(affected, 1);
        assert!(store.contains(UserId(2), &ShortCode::from("a")).await);
    }
}
