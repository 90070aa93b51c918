//! Shared application state handed to every subscriber.

use std::ops::Deref;
use std::sync::Arc;

use crate::bus::EventBus;
use crate::db::DocumentStore;
use crate::storage::{
    BlacklistRepository, GroupRepository, MemberRepository, MembershipRepository,
    PunishmentRepository,
};

/// Cheap-to-clone handle over the bus, the store, and the repositories.
#[derive(Clone)]
pub struct AppContext(Arc<ContextInner>);

pub struct ContextInner {
    pub bus: EventBus,
    pub store: DocumentStore,
    pub groups: GroupRepository,
    pub members: MemberRepository,
    pub memberships: MembershipRepository,
    pub punishments: PunishmentRepository,
    pub blacklist: BlacklistRepository,
}

impl AppContext {
    #[must_use]
    pub fn new(store: DocumentStore) -> Self {
        Self(Arc::new(ContextInner {
            bus: EventBus::new(),
            groups: GroupRepository::new(store.clone()),
            members: MemberRepository::new(store.clone()),
            memberships: MembershipRepository::new(store.clone()),
            punishments: PunishmentRepository::new(store.clone()),
            blacklist: BlacklistRepository::new(store.clone()),
            store,
        }))
    }
}

impl Deref for AppContext {
    type Target = ContextInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
