//! Entity repositories: read-through caches in front of the document store.
//!
//! Read path: deterministic namespaced cache key, fall back to the store on a
//! miss, repopulate with the entity's TTL. Write path: durable mutation
//! first, then cache set (creates/updates) or delete (deletes/deactivations).

pub mod blacklist;
pub mod group;
pub mod member;
pub mod membership;
pub mod punishment;

pub use blacklist::BlacklistRepository;
pub use group::{CreateGroup, GroupRepository, UpdateGroup};
pub use member::MemberRepository;
pub use membership::MembershipRepository;
pub use punishment::{CreatePunishment, PunishmentRepository};

/// Cache TTLs per entity, driven by how often each one mutates.
pub(crate) mod ttl {
    use tokio::time::Duration;

    /// Group metadata is near-static.
    pub const GROUP: Duration = Duration::from_secs(5 * 60);
    /// Member names change occasionally.
    pub const MEMBER: Duration = Duration::from_secs(2 * 60);
    /// Membership counters move with traffic.
    pub const MEMBERSHIP: Duration = Duration::from_secs(3 * 60);
    /// Punishment state changes frequently.
    pub const PUNISHMENT: Duration = Duration::from_secs(30);
    /// Blacklist entries rarely change.
    pub const BLACKLIST: Duration = Duration::from_secs(10 * 60);
}

/// Cache key namespaces, one per entity kind.
pub(crate) mod keys {
    pub fn group(external_group_id: &str) -> String {
        format!("group:{external_group_id}")
    }

    pub fn member(external_member_id: &str) -> String {
        format!("member:{external_member_id}")
    }

    pub fn membership(group_id: &str, member_id: &str) -> String {
        format!("membership:{group_id}:{member_id}")
    }

    pub fn punishment(external_member_id: &str) -> String {
        format!("punishment:{external_member_id}")
    }

    pub fn blacklist(member_id: &str) -> String {
        format!("blacklist:{member_id}")
    }
}
