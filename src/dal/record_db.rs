use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::website_key;

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: Uuid,
    pub website: String,
    pub email: Option<String>,
    pub email_source: Option<String>,
    pub email_verified: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContactRecord {
    pub fn new(website: &str) -> Self {
        ContactRecord {
            id: Uuid::new_v4(),
            website: website.to_string(),
            email: None,
            email_source: None,
            email_verified: false,
            updated_at: None,
        }
    }
}

/// Lead/contact records owned by the surrounding application.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn update_email(
        &self,
        record_id: Uuid,
        email: &str,
        source: &str,
        verified: bool,
    ) -> Result<(), StoreError>;

    /// Ids of records whose website has the given [`website_key`].
    async fn records_for_website(&self, key: &str) -> Result<Vec<Uuid>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<Uuid, ContactRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: ContactRecord) -> Uuid {
        let id = record.id;
        self.records.write().await.insert(id, record);
        id
    }

    pub async fn get(&self, record_id: Uuid) -> Option<ContactRecord> {
        self.records.read().await.get(&record_id).cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn update_email(
        &self,
        record_id: Uuid,
        email: &str,
        source: &str,
        verified: bool,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&record_id)
            .ok_or(StoreError::RecordNotFound(record_id))?;

        record.email = Some(email.to_string());
        record.email_source = Some(source.to_string());
        record.email_verified = verified;
        record.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn records_for_website(&self, key: &str) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| website_key(&record.website) == key)
            .map(|record| record.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn update_sets_email_fields() {
        let store = InMemoryRecordStore::new();
        let id = store.insert(ContactRecord::new("https://firm.de")).await;

        store
            .update_email(id, "info@firm.de", "impressum_crawler", true)
            .await
            .unwrap();

        let record = store.get(id).await.unwrap();
        assert_eq!(record.email.as_deref(), Some("info@firm.de"));
        assert_eq!(record.email_source.as_deref(), Some("impressum_crawler"));
        assert!(record.email_verified);
        assert!(record.updated_at.is_some());
    }

    #[tokio::test]
    async fn update_of_unknown_record_fails() {
        let store = InMemoryRecordStore::new();
        let result = store
            .update_email(Uuid::new_v4(), "info@firm.de", "impressum_crawler", false)
            .await;
        assert!(matches!(result, Err(StoreError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn website_lookup_ignores_scheme_www_and_slash() {
        let store = InMemoryRecordStore::new();
        let a = store.insert(ContactRecord::new("http://www.Firm.de/")).await;
        let b = store.insert(ContactRecord::new("firm.de")).await;
        store.insert(ContactRecord::new("https://other.de")).await;

        let mut found = store
            .records_for_website(&website_key("https://firm.de"))
            .await
            .unwrap();
        found.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(found, expected);
    }
}
