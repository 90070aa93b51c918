//! Repository for moderated groups.

use chrono::Utc;

use super::{keys, ttl};
use crate::cache::TtlCache;
use crate::db::{DocumentStore, StoreError, StoreResult};
use crate::model::Group;

#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub external_group_id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct GroupRepository {
    store: DocumentStore,
    cache: TtlCache<Group>,
}

impl GroupRepository {
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            cache: TtlCache::new(),
        }
    }

    pub async fn get_by_external_id(
        &self,
        external_group_id: &str,
    ) -> StoreResult<Option<Group>> {
        let key = keys::group(external_group_id);
        if let Some(group) = self.cache.get(&key) {
            return Ok(Some(group));
        }

        let external = external_group_id.to_string();
        let group = self
            .store
            .read(move |db| db.group_by_external_id(&external).cloned())
            .await?;
        if let Some(ref group) = group {
            self.cache.set(key, group.clone(), ttl::GROUP);
        }
        Ok(group)
    }

    /// Create a group. The external id is unique and immutable after
    /// creation.
    pub async fn create(&self, params: CreateGroup) -> StoreResult<Group> {
        if params.external_group_id.trim().is_empty() {
            return Err(StoreError::Validation(
                "external group id must not be empty".to_string(),
            ));
        }
        if params.name.trim().is_empty() {
            return Err(StoreError::Validation(
                "group name must not be empty".to_string(),
            ));
        }

        let group = Group::new(
            params.external_group_id.trim(),
            params.name.trim(),
            params.description.trim(),
        );
        let group = self
            .store
            .mutate(move |db| {
                if db.group_by_external_id(&group.external_group_id).is_some() {
                    return Err(StoreError::conflict("group", group.external_group_id.clone()));
                }
                db.groups.insert(group.id.clone(), group.clone());
                Ok(group)
            })
            .await?;

        self.cache
            .set(keys::group(&group.external_group_id), group.clone(), ttl::GROUP);
        Ok(group)
    }

    pub async fn update(&self, id: &str, changes: UpdateGroup) -> StoreResult<Group> {
        let id_owned = id.to_string();
        let updated = self
            .store
            .mutate(move |db| {
                let group = db
                    .groups
                    .get_mut(&id_owned)
                    .ok_or_else(|| StoreError::not_found("group", id_owned.clone()))?;
                if let Some(name) = changes.name {
                    group.name = name;
                }
                if let Some(description) = changes.description {
                    group.description = description;
                }
                group.updated_at = Utc::now();
                Ok(group.clone())
            })
            .await?;

        self.cache.set(
            keys::group(&updated.external_group_id),
            updated.clone(),
            ttl::GROUP,
        );
        Ok(updated)
    }

    /// Administrative delete; never invoked by the engine on its own.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let id_owned = id.to_string();
        let removed = self
            .store
            .mutate(move |db| {
                db.groups
                    .remove(&id_owned)
                    .ok_or_else(|| StoreError::not_found("group", id_owned.clone()))
            })
            .await?;
        self.cache.delete(&keys::group(&removed.external_group_id));
        Ok(())
    }
}
