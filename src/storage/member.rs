//! Repository for member identities.

use chrono::Utc;

use super::{keys, ttl};
use crate::cache::TtlCache;
use crate::db::{DocumentStore, StoreError, StoreResult};
use crate::model::Member;

#[derive(Clone)]
pub struct MemberRepository {
    store: DocumentStore,
    cache: TtlCache<Member>,
}

impl MemberRepository {
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            cache: TtlCache::new(),
        }
    }

    pub async fn get_by_external_id(
        &self,
        external_member_id: &str,
    ) -> StoreResult<Option<Member>> {
        let key = keys::member(external_member_id);
        if let Some(member) = self.cache.get(&key) {
            return Ok(Some(member));
        }

        let external = external_member_id.to_string();
        let member = self
            .store
            .read(move |db| db.member_by_external_id(&external).cloned())
            .await?;
        if let Some(ref member) = member {
            self.cache.set(key, member.clone(), ttl::MEMBER);
        }
        Ok(member)
    }

    /// Fetch the member with the given external id, creating it lazily with
    /// the observed display name (or the placeholder when none was seen).
    ///
    /// Idempotent under concurrent calls: the serialized mutation re-checks
    /// for an existing row, so a racing loser gets the winner's row back.
    pub async fn get_or_create(
        &self,
        external_member_id: &str,
        display_name: &str,
    ) -> StoreResult<Member> {
        if let Some(member) = self.get_by_external_id(external_member_id).await? {
            return Ok(member);
        }

        let candidate = Member::new(external_member_id, display_name);
        let member = self
            .store
            .mutate(move |db| {
                if let Some(existing) = db.member_by_external_id(&candidate.external_member_id) {
                    return Ok(existing.clone());
                }
                db.members.insert(candidate.id.clone(), candidate.clone());
                Ok(candidate)
            })
            .await?;

        self.cache.set(
            keys::member(&member.external_member_id),
            member.clone(),
            ttl::MEMBER,
        );
        Ok(member)
    }

    /// Replace the display name, used once to swap out the placeholder.
    pub async fn set_display_name(&self, id: &str, display_name: &str) -> StoreResult<Member> {
        let id_owned = id.to_string();
        let name = display_name.to_string();
        let updated = self
            .store
            .mutate(move |db| {
                let member = db
                    .members
                    .get_mut(&id_owned)
                    .ok_or_else(|| StoreError::not_found("member", id_owned.clone()))?;
                member.display_name = name;
                member.updated_at = Utc::now();
                Ok(member.clone())
            })
            .await?;

        self.cache.set(
            keys::member(&updated.external_member_id),
            updated.clone(),
            ttl::MEMBER,
        );
        Ok(updated)
    }

    /// Administrative delete; never invoked by the engine on its own.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let id_owned = id.to_string();
        let removed = self
            .store
            .mutate(move |db| {
                db.members
                    .remove(&id_owned)
                    .ok_or_else(|| StoreError::not_found("member", id_owned.clone()))
            })
            .await?;
        self.cache
            .delete(&keys::member(&removed.external_member_id));
        Ok(())
    }
}
