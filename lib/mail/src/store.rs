//! Suppression record storage.

use crate::error::MailError;
use crate::record::{BounceRecord, ComplaintRecord, normalize_address};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Lookups and inserts for bounce and complaint records.
///
/// Lookups match addresses after [`normalize_address`]. Inserting a record
/// for an address that already has one leaves the existing record untouched.
#[async_trait]
pub trait SuppressionStore: Send + Sync {
    async fn find_bounce(&self, email: &str) -> Result<Option<BounceRecord>, MailError>;

    async fn find_complaint(&self, email: &str) -> Result<Option<ComplaintRecord>, MailError>;

    async fn insert_bounce(&self, record: &BounceRecord) -> Result<(), MailError>;

    async fn insert_complaint(&self, record: &ComplaintRecord) -> Result<(), MailError>;
}

/// In-memory [`SuppressionStore`] keyed by normalized address.
#[derive(Clone, Default)]
pub struct InMemorySuppressionStore {
    bounces: Arc<RwLock<HashMap<String, BounceRecord>>>,
    complaints: Arc<RwLock<HashMap<String, ComplaintRecord>>>,
}

impl InMemorySuppressionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bounce_count(&self) -> usize {
        self.bounces.read().await.len()
    }

    pub async fn complaint_count(&self) -> usize {
        self.complaints.read().await.len()
    }
}

#[async_trait]
impl SuppressionStore for InMemorySuppressionStore {
    async fn find_bounce(&self, email: &str) -> Result<Option<BounceRecord>, MailError> {
        Ok(self
            .bounces
            .read()
            .await
            .get(&normalize_address(email))
            .cloned())
    }

    async fn find_complaint(&self, email: &str) -> Result<Option<ComplaintRecord>, MailError> {
        Ok(self
            .complaints
            .read()
            .await
            .get(&normalize_address(email))
            .cloned())
    }

    async fn insert_bounce(&self, record: &BounceRecord) -> Result<(), MailError> {
        self.bounces
            .write()
            .await
            .entry(record.email().to_string())
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn insert_complaint(&self, record: &ComplaintRecord) -> Result<(), MailError> {
        self.complaints
            .write()
            .await
            .entry(record.email().to_string())
            .or_insert_with(|| record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_ignores_case() {
        let store = InMemorySuppressionStore::new();
        store
            .insert_bounce(&BounceRecord::new("rider@caby.ch", "Permanent", "General"))
            .await
            .expect("insert");

        let found = store.find_bounce("Rider@Caby.ch").await.expect("find");
        assert!(found.is_some());
        assert!(
            store
                .find_complaint("rider@caby.ch")
                .await
                .expect("find")
                .is_none()
        );
    }

    #[tokio::test]
    async fn insert_keeps_first_record() {
        let store = InMemorySuppressionStore::new();
        let first = BounceRecord::new("x@caby.ch", "Permanent", "General");
        let second = BounceRecord::new("x@caby.ch", "Transient", "MailboxFull");
        store.insert_bounce(&first).await.expect("insert");
        store.insert_bounce(&second).await.expect("insert");

        let found = store.find_bounce("x@caby.ch").await.expect("find");
        assert_eq!(found, Some(first));
        assert_eq!(store.bounce_count().await, 1);
    }
}
