//! Repository for the cross-group blacklist.

use super::{keys, ttl};
use crate::cache::TtlCache;
use crate::db::{DocumentStore, StoreError, StoreResult};
use crate::model::BlacklistEntry;

#[derive(Clone)]
pub struct BlacklistRepository {
    store: DocumentStore,
    cache: TtlCache<BlacklistEntry>,
}

impl BlacklistRepository {
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            cache: TtlCache::new(),
        }
    }

    pub async fn get(&self, member_id: &str) -> StoreResult<Option<BlacklistEntry>> {
        let key = keys::blacklist(member_id);
        if let Some(entry) = self.cache.get(&key) {
            return Ok(Some(entry));
        }

        let member = member_id.to_string();
        let entry = self
            .store
            .read(move |db| db.blacklist.get(&member).cloned())
            .await?;
        if let Some(ref entry) = entry {
            self.cache.set(key, entry.clone(), ttl::BLACKLIST);
        }
        Ok(entry)
    }

    pub async fn is_blacklisted(&self, member_id: &str) -> StoreResult<bool> {
        Ok(self.get(member_id).await?.is_some())
    }

    /// Record a member on the blacklist. At most one entry exists per member.
    pub async fn add(&self, entry: BlacklistEntry) -> StoreResult<BlacklistEntry> {
        let entry = self
            .store
            .mutate(move |db| {
                if db.blacklist.contains_key(&entry.member_id) {
                    return Err(StoreError::conflict("blacklist", entry.member_id.clone()));
                }
                db.blacklist.insert(entry.member_id.clone(), entry.clone());
                Ok(entry)
            })
            .await?;

        self.cache
            .set(keys::blacklist(&entry.member_id), entry.clone(), ttl::BLACKLIST);
        Ok(entry)
    }

    /// Remove a member from the blacklist. Returns whether an entry existed.
    pub async fn remove(&self, member_id: &str) -> StoreResult<bool> {
        let member = member_id.to_string();
        let removed = self
            .store
            .mutate(move |db| Ok(db.blacklist.remove(&member).is_some()))
            .await?;
        self.cache.delete(&keys::blacklist(member_id));
        Ok(removed)
    }
}
