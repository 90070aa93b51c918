//! Repository for punishment rows and the single-active invariant.

use super::{keys, ttl};
use crate::cache::TtlCache;
use crate::db::{DocumentStore, StoreResult};
use crate::model::{Punishment, PunishmentKind};

#[derive(Debug, Clone)]
pub struct CreatePunishment {
    pub member_id: String,
    /// External id of the same member, used as the cache key so the hot
    /// message path can check without resolving the internal id first.
    pub external_member_id: String,
    pub membership_id: String,
    pub group_id: String,
    pub kind: PunishmentKind,
    /// 0 means permanent.
    pub duration_ms: u64,
    pub reason: String,
}

#[derive(Clone)]
pub struct PunishmentRepository {
    store: DocumentStore,
    cache: TtlCache<Punishment>,
}

impl PunishmentRepository {
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            cache: TtlCache::new(),
        }
    }

    /// The active punishment of a member, if any. Only active rows are
    /// cached; a miss always goes to the store since absence of a cache
    /// entry means "unknown", not "unpunished".
    pub async fn get_active(
        &self,
        external_member_id: &str,
    ) -> StoreResult<Option<Punishment>> {
        let key = keys::punishment(external_member_id);
        if let Some(punishment) = self.cache.get(&key) {
            return Ok(Some(punishment));
        }

        let external = external_member_id.to_string();
        let punishment = self
            .store
            .read(move |db| {
                db.member_by_external_id(&external)
                    .and_then(|member| db.active_punishment_for(&member.id))
                    .cloned()
            })
            .await?;
        if let Some(ref punishment) = punishment {
            self.cache.set(key, punishment.clone(), ttl::PUNISHMENT);
        }
        Ok(punishment)
    }

    /// Apply a punishment. Any previously active rows for the member are
    /// deactivated in the same atomic step, so at most one row is active per
    /// member at any time.
    pub async fn create(&self, params: CreatePunishment) -> StoreResult<Punishment> {
        let punishment = Punishment::new(
            params.member_id,
            params.membership_id,
            params.group_id,
            params.kind,
            params.duration_ms,
            params.reason,
        );
        let punishment = self
            .store
            .mutate(move |db| {
                db.deactivate_punishments_for(&punishment.member_id);
                db.punishments.insert(punishment.id.clone(), punishment.clone());
                Ok(punishment)
            })
            .await?;

        self.cache.set(
            keys::punishment(&params.external_member_id),
            punishment.clone(),
            ttl::PUNISHMENT,
        );
        Ok(punishment)
    }

    /// Deactivate every active punishment of a member. Succeeds whether or
    /// not anything was active; the outcome state is the same.
    pub async fn deactivate(&self, external_member_id: &str) -> StoreResult<usize> {
        let external = external_member_id.to_string();
        let deactivated = self
            .store
            .mutate(move |db| {
                let member_id = db
                    .member_by_external_id(&external)
                    .map(|member| member.id.clone());
                Ok(match member_id {
                    Some(member_id) => db.deactivate_punishments_for(&member_id),
                    None => 0,
                })
            })
            .await?;

        self.cache.delete(&keys::punishment(external_member_id));
        Ok(deactivated)
    }
}
