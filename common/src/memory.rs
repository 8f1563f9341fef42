use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::{apply_set, new_id, with_id, Document, DocumentStore, Filter, StoreError, UpdateResult, ID_FIELD};
use crate::utils::Collection;

/// Process-local document store. Documents are kept per collection in
/// insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<(String, Document)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<String, StoreError> {
        document.remove(ID_FIELD);
        let id = new_id();
        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push((id.clone(), document));
        Ok(id)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|(id, body)| filter.matches(id, body))
            .map(|(id, body)| with_id(id, body.clone()))
            .collect())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .into_iter()
            .flatten()
            .find(|(id, body)| filter.matches(id, body))
            .map(|(id, body)| with_id(id, body.clone())))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateResult, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(UpdateResult::default());
        };

        match documents
            .iter_mut()
            .find(|(id, body)| filter.matches(id, body))
        {
            Some((_, body)) => Ok(UpdateResult {
                matched: 1,
                modified: u64::from(apply_set(body, set)),
            }),
            None => Ok(UpdateResult::default()),
        }
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(0);
        };

        match documents
            .iter()
            .position(|(id, body)| filter.matches(id, body))
        {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::to_document;

    fn doc(value: serde_json::Value) -> Document {
        to_document(&value).unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_fresh_ids() {
        let store = MemoryStore::new();
        let first = store
            .insert_one(Collection::Users, doc(json!({ "_id": "forged", "email": "a@x.com" })))
            .await
            .unwrap();
        let second = store
            .insert_one(Collection::Users, doc(json!({ "email": "b@x.com" })))
            .await
            .unwrap();

        assert_ne!(first, "forged");
        assert_ne!(first, second);

        let found = store
            .find_one(Collection::Users, &Filter::by_id(first.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found[ID_FIELD], json!(first));
        assert_eq!(found["email"], json!("a@x.com"));
    }

    #[tokio::test]
    async fn find_keeps_insertion_order_and_collections_apart() {
        let store = MemoryStore::new();
        for title in ["Bread", "Soup", "Rice"] {
            store
                .insert_one(Collection::Donations, doc(json!({ "title": title, "email": "a@x.com" })))
                .await
                .unwrap();
        }
        store
            .insert_one(Collection::Users, doc(json!({ "email": "a@x.com" })))
            .await
            .unwrap();

        let donations = store
            .find(Collection::Donations, &Filter::all().eq("email", "a@x.com"))
            .await
            .unwrap();
        let titles: Vec<_> = donations.iter().map(|d| d["title"].clone()).collect();
        assert_eq!(titles, vec![json!("Bread"), json!("Soup"), json!("Rice")]);
        assert_eq!(store.len(Collection::Users).await, 1);
        assert!(store
            .find(Collection::CharityRequests, &Filter::all())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_counts_matched_and_modified() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Users, doc(json!({ "email": "a@x.com", "role": "user" })))
            .await
            .unwrap();

        let same = store
            .update_one(Collection::Users, &Filter::by_id(id.clone()), doc(json!({ "role": "user" })))
            .await
            .unwrap();
        assert_eq!(same, UpdateResult { matched: 1, modified: 0 });

        let changed = store
            .update_one(Collection::Users, &Filter::by_id(id.clone()), doc(json!({ "role": "admin" })))
            .await
            .unwrap();
        assert_eq!(changed, UpdateResult { matched: 1, modified: 1 });

        let missing = store
            .update_one(Collection::Users, &Filter::by_id("nope"), doc(json!({ "role": "admin" })))
            .await
            .unwrap();
        assert_eq!(missing, UpdateResult::default());
    }

    #[tokio::test]
    async fn delete_removes_one_match() {
        let store = MemoryStore::new();
        for _ in 0..2 {
            store
                .insert_one(Collection::CharityRequests, doc(json!({ "donationId": "d1" })))
                .await
                .unwrap();
        }

        let filter = Filter::all().eq("donationId", "d1");
        assert_eq!(store.delete_one(Collection::CharityRequests, &filter).await.unwrap(), 1);
        assert_eq!(store.len(Collection::CharityRequests).await, 1);
        assert_eq!(store.delete_one(Collection::CharityRequests, &filter).await.unwrap(), 1);
        assert_eq!(store.delete_one(Collection::CharityRequests, &filter).await.unwrap(), 0);
        assert_eq!(store.delete_one(Collection::Users, &Filter::by_id("x")).await.unwrap(), 0);
    }
}
