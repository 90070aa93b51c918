//! The persisted document shape: a relational-style schema serialized as one
//! JSON document. The store owns all entities; repositories reach them only
//! through read/mutate closures over this type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{BlacklistEntry, Group, GroupMembership, Member, Punishment};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    /// Keyed by internal group id.
    pub groups: HashMap<String, Group>,
    /// Keyed by internal member id.
    pub members: HashMap<String, Member>,
    /// Keyed by membership id.
    pub memberships: HashMap<String, GroupMembership>,
    /// Keyed by punishment id.
    pub punishments: HashMap<String, Punishment>,
    /// Keyed by member id (unique per member).
    pub blacklist: HashMap<String, BlacklistEntry>,
}

impl Database {
    #[must_use]
    pub fn group_by_external_id(&self, external_group_id: &str) -> Option<&Group> {
        self.groups
            .values()
            .find(|group| group.external_group_id == external_group_id)
    }

    #[must_use]
    pub fn member_by_external_id(&self, external_member_id: &str) -> Option<&Member> {
        self.members
            .values()
            .find(|member| member.external_member_id == external_member_id)
    }

    #[must_use]
    pub fn membership_for(&self, group_id: &str, member_id: &str) -> Option<&GroupMembership> {
        self.memberships
            .values()
            .find(|membership| membership.group_id == group_id && membership.member_id == member_id)
    }

    #[must_use]
    pub fn active_punishment_for(&self, member_id: &str) -> Option<&Punishment> {
        self.punishments
            .values()
            .find(|punishment| punishment.member_id == member_id && punishment.is_active)
    }

    /// Deactivate every active punishment of a member, returning how many
    /// rows transitioned.
    pub fn deactivate_punishments_for(&mut self, member_id: &str) -> usize {
        self.punishments
            .values_mut()
            .filter(|punishment| punishment.member_id == member_id && punishment.is_active)
            .map(|punishment| punishment.deactivate())
            .filter(|transitioned| *transitioned)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PunishmentKind;

    #[test]
    fn test_empty_document_round_trip() {
        let json = serde_json::to_string(&Database::default()).unwrap();
        let parsed: Database = serde_json::from_str(&json).unwrap();
        assert!(parsed.groups.is_empty());
        assert!(parsed.blacklist.is_empty());
    }

    #[test]
    fn test_partial_document_gets_defaults() {
        // Older documents may lack newer tables
        let parsed: Database = serde_json::from_str(r#"{"groups":{}}"#).unwrap();
        assert!(parsed.punishments.is_empty());
    }

    #[test]
    fn test_deactivate_punishments_for() {
        let mut db = Database::default();
        let mut old = Punishment::new("m-1", "cm-1", "g-1", PunishmentKind::Mute, 1000, "old");
        old.is_active = false;
        let active = Punishment::new("m-1", "cm-1", "g-1", PunishmentKind::Timeout, 1000, "new");
        let other = Punishment::new("m-2", "cm-2", "g-1", PunishmentKind::Warn, 0, "other");
        db.punishments.insert(old.id.clone(), old);
        db.punishments.insert(active.id.clone(), active);
        db.punishments.insert(other.id.clone(), other.clone());

        assert_eq!(db.deactivate_punishments_for("m-1"), 1);
        assert!(db.active_punishment_for("m-1").is_none());
        // The other member's punishment is untouched
        assert!(db.active_punishment_for("m-2").is_some());
    }
}
