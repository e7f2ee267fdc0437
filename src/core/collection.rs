use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::store::{JsonStore, KvStore};
use crate::models::models::Record;

/// A typed set of records: each record lives under `<prefix>:<id>` and its id is
/// kept in a JSON list under `index_key`.
pub struct Collection<T> {
    prefix: &'static str,
    index_key: &'static str,
    newest_first: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    /// Index keeps insertion order.
    pub const fn new(prefix: &'static str, index_key: &'static str) -> Self {
        Self {
            prefix,
            index_key,
            newest_first: false,
            _marker: PhantomData,
        }
    }

    /// Index keeps the most recently inserted id first.
    pub const fn newest_first(prefix: &'static str, index_key: &'static str) -> Self {
        Self {
            prefix,
            index_key,
            newest_first: true,
            _marker: PhantomData,
        }
    }

    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    pub fn ids(&self, store: &dyn KvStore) -> anyhow::Result<Vec<String>> {
        Ok(store.get_json(self.index_key)?.unwrap_or_default())
    }

    pub fn get(&self, store: &dyn KvStore, id: &str) -> anyhow::Result<Option<T>> {
        store.get_json(&self.key(id))
    }

    pub fn all(&self, store: &dyn KvStore) -> anyhow::Result<Vec<T>> {
        self.filter(store, |_| true)
    }

    pub fn filter<F>(&self, store: &dyn KvStore, mut keep: F) -> anyhow::Result<Vec<T>>
    where
        F: FnMut(&T) -> bool,
    {
        let mut records = Vec::new();
        for id in self.ids(store)? {
            if let Some(record) = self.get(store, &id)? {
                if keep(&record) {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    pub fn find<F>(&self, store: &dyn KvStore, mut matches: F) -> anyhow::Result<Option<T>>
    where
        F: FnMut(&T) -> bool,
    {
        for id in self.ids(store)? {
            if let Some(record) = self.get(store, &id)? {
                if matches(&record) {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    pub fn insert(&self, store: &dyn KvStore, record: &T) -> anyhow::Result<()> {
        store.set_json(&self.key(record.id()), record)?;

        let mut ids = self.ids(store)?;
        if self.newest_first {
            ids.insert(0, record.id().to_string());
        } else {
            ids.push(record.id().to_string());
        }
        store.set_json(self.index_key, &ids)
    }

    /// Overwrites an existing record; the index is left untouched.
    pub fn save(&self, store: &dyn KvStore, record: &T) -> anyhow::Result<()> {
        store.set_json(&self.key(record.id()), record)
    }

    pub fn remove(&self, store: &dyn KvStore, id: &str) -> anyhow::Result<()> {
        store.delete(&self.key(id))?;

        let mut ids = self.ids(store)?;
        ids.retain(|existing| existing != id);
        store.set_json(self.index_key, &ids)
    }

    /// Deletes every record and the index itself.
    pub fn clear(&self, store: &dyn KvStore) -> anyhow::Result<()> {
        for id in self.ids(store)? {
            store.delete(&self.key(&id))?;
        }
        store.delete(self.index_key)
    }
}

/// Claims `key` for `owner`. Returns false when another owner already holds it.
///
/// Check-then-write: two concurrent claims for the same key can both succeed.
pub fn claim_unique(store: &dyn KvStore, key: &str, owner: &str) -> anyhow::Result<bool> {
    match store.get_json::<String>(key)? {
        Some(existing) => Ok(existing == owner),
        None => {
            store.set_json(key, &owner.to_string())?;
            Ok(true)
        }
    }
}

pub fn unique_owner(store: &dyn KvStore, key: &str) -> anyhow::Result<Option<String>> {
    store.get_json(key)
}

pub fn release_unique(store: &dyn KvStore, key: &str) -> anyhow::Result<()> {
    store.delete(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::models::models::Hashtag;

    static TAGS: Collection<Hashtag> = Collection::new("tag", "tags");
    static RECENT: Collection<Hashtag> = Collection::newest_first("recent", "recent_list");

    fn tag(id: &str) -> Hashtag {
        Hashtag {
            id: id.to_string(),
            name: format!("name-{}", id),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn insert_order_follows_collection_kind() {
        let store = MemoryStore::new();
        for id in ["a", "b", "c"] {
            TAGS.insert(&store, &tag(id)).unwrap();
            RECENT.insert(&store, &tag(id)).unwrap();
        }
        assert_eq!(TAGS.ids(&store).unwrap(), vec!["a", "b", "c"]);
        assert_eq!(RECENT.ids(&store).unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn remove_drops_record_and_index_entry() {
        let store = MemoryStore::new();
        TAGS.insert(&store, &tag("a")).unwrap();
        TAGS.insert(&store, &tag("b")).unwrap();
        TAGS.remove(&store, "a").unwrap();

        assert!(TAGS.get(&store, "a").unwrap().is_none());
        assert_eq!(TAGS.ids(&store).unwrap(), vec!["b"]);
    }

    #[test]
    fn unique_claims_are_exclusive() {
        let store = MemoryStore::new();
        assert!(claim_unique(&store, "k", "one").unwrap());
        assert!(claim_unique(&store, "k", "one").unwrap());
        assert!(!claim_unique(&store, "k", "two").unwrap());

        release_unique(&store, "k").unwrap();
        assert!(claim_unique(&store, "k", "two").unwrap());
        assert_eq!(unique_owner(&store, "k").unwrap().as_deref(), Some("two"));
    }
}
