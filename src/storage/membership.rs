//! Repository for group memberships and their counters.

use chrono::Utc;

use super::{keys, ttl};
use crate::cache::TtlCache;
use crate::db::{DocumentStore, StoreError, StoreResult};
use crate::model::{GroupMembership, PunishmentKind};

#[derive(Clone)]
pub struct MembershipRepository {
    store: DocumentStore,
    cache: TtlCache<GroupMembership>,
}

impl MembershipRepository {
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            cache: TtlCache::new(),
        }
    }

    pub async fn get(
        &self,
        group_id: &str,
        member_id: &str,
    ) -> StoreResult<Option<GroupMembership>> {
        let key = keys::membership(group_id, member_id);
        if let Some(membership) = self.cache.get(&key) {
            return Ok(Some(membership));
        }

        let group = group_id.to_string();
        let member = member_id.to_string();
        let membership = self
            .store
            .read(move |db| db.membership_for(&group, &member).cloned())
            .await?;
        if let Some(ref membership) = membership {
            self.cache.set(key, membership.clone(), ttl::MEMBERSHIP);
        }
        Ok(membership)
    }

    /// Fetch the membership row for a (group, member) pair, creating it
    /// lazily on first interaction. Idempotent under concurrent calls.
    pub async fn get_or_create(
        &self,
        group_id: &str,
        member_id: &str,
        is_admin: bool,
    ) -> StoreResult<GroupMembership> {
        if let Some(membership) = self.get(group_id, member_id).await? {
            return Ok(membership);
        }

        let candidate = GroupMembership::new(group_id, member_id, is_admin);
        let membership = self
            .store
            .mutate(move |db| {
                if let Some(existing) =
                    db.membership_for(&candidate.group_id, &candidate.member_id)
                {
                    return Ok(existing.clone());
                }
                db.memberships.insert(candidate.id.clone(), candidate.clone());
                Ok(candidate)
            })
            .await?;

        self.cache.set(
            keys::membership(&membership.group_id, &membership.member_id),
            membership.clone(),
            ttl::MEMBERSHIP,
        );
        Ok(membership)
    }

    /// Bump the message counter by one.
    pub async fn increment_message_count(&self, id: &str) -> StoreResult<GroupMembership> {
        self.mutate_membership(id, |membership| {
            membership.message_count += 1;
        })
        .await
    }

    /// Bump the per-type punishment counter.
    pub async fn record_punishment(
        &self,
        id: &str,
        kind: PunishmentKind,
    ) -> StoreResult<GroupMembership> {
        self.mutate_membership(id, move |membership| {
            membership.record_punishment(kind);
        })
        .await
    }

    pub async fn set_admin(&self, id: &str, is_admin: bool) -> StoreResult<GroupMembership> {
        self.mutate_membership(id, move |membership| {
            membership.is_admin = is_admin;
        })
        .await
    }

    async fn mutate_membership<F>(&self, id: &str, apply: F) -> StoreResult<GroupMembership>
    where
        F: FnOnce(&mut GroupMembership) + Send + 'static,
    {
        let id_owned = id.to_string();
        let updated = self
            .store
            .mutate(move |db| {
                let membership = db
                    .memberships
                    .get_mut(&id_owned)
                    .ok_or_else(|| StoreError::not_found("membership", id_owned.clone()))?;
                apply(membership);
                membership.updated_at = Utc::now();
                Ok(membership.clone())
            })
            .await?;

        self.cache.set(
            keys::membership(&updated.group_id, &updated.member_id),
            updated.clone(),
            ttl::MEMBERSHIP,
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> (tempfile::TempDir, MembershipRepository) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path().join("db.json")).await.unwrap();
        (dir, MembershipRepository::new(store))
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_row() {
        let (_dir, memberships) = repo().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let memberships = memberships.clone();
            handles.push(tokio::spawn(async move {
                memberships.get_or_create("g-1", "m-1", false).await
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_message_counter_accumulates() {
        let (_dir, memberships) = repo().await;
        let membership = memberships.get_or_create("g-1", "m-1", false).await.unwrap();

        for _ in 0..3 {
            memberships
                .increment_message_count(&membership.id)
                .await
                .unwrap();
        }
        let found = memberships.get("g-1", "m-1").await.unwrap().unwrap();
        assert_eq!(found.message_count, 3);
    }

    #[tokio::test]
    async fn test_record_punishment_bumps_matching_counter() {
        let (_dir, memberships) = repo().await;
        let membership = memberships.get_or_create("g-1", "m-1", false).await.unwrap();

        memberships
            .record_punishment(&membership.id, PunishmentKind::Timeout)
            .await
            .unwrap();
        let updated = memberships
            .record_punishment(&membership.id, PunishmentKind::PermanentBan)
            .await
            .unwrap();
        assert_eq!(updated.timeout_count, 1);
        assert_eq!(updated.permanent_ban_count, 1);
        assert_eq!(updated.ban_count, 0);
    }

    #[tokio::test]
    async fn test_set_admin_persists_and_refreshes_cache() {
        let (_dir, memberships) = repo().await;
        let membership = memberships.get_or_create("g-1", "m-1", false).await.unwrap();
        assert!(!membership.is_admin);

        let updated = memberships.set_admin(&membership.id, true).await.unwrap();
        assert!(updated.is_admin);
        let found = memberships.get("g-1", "m-1").await.unwrap().unwrap();
        assert!(found.is_admin);
    }

    #[tokio::test]
    async fn test_counter_on_missing_row_is_not_found() {
        let (_dir, memberships) = repo().await;
        let err = memberships
            .increment_message_count("no-such-row")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
