use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel display name used until the real name of a member is observed.
pub const PLACEHOLDER_NAME: &str = "[unnamed]";

/// A moderated chat room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    /// Identifier of the group on the external chat network. Unique and
    /// immutable after creation.
    pub external_group_id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    #[must_use]
    pub fn new(
        external_group_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            external_group_id: external_group_id.into(),
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A participant identity, scoped across groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    /// Identifier of the member on the external chat network. Unique.
    pub external_member_id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Create a member, falling back to the placeholder name when no real
    /// name has been observed yet.
    #[must_use]
    pub fn new(external_member_id: impl Into<String>, display_name: &str) -> Self {
        let now = Utc::now();
        let display_name = if display_name.trim().is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            display_name.to_string()
        };
        Self {
            id: Uuid::new_v4().to_string(),
            external_member_id: external_member_id.into(),
            display_name,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn has_placeholder_name(&self) -> bool {
        self.display_name == PLACEHOLDER_NAME
    }
}

/// The relationship and counters between a Member and a Group.
///
/// At most one row exists per (group, member) pair; rows are created lazily
/// on the first observed interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
    pub id: String,
    pub group_id: String,
    pub member_id: String,
    pub is_admin: bool,
    pub message_count: u64,
    pub timeout_count: u64,
    pub mute_count: u64,
    pub ban_count: u64,
    pub permanent_ban_count: u64,
    pub kick_count: u64,
    pub warn_count: u64,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupMembership {
    #[must_use]
    pub fn new(group_id: impl Into<String>, member_id: impl Into<String>, is_admin: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            member_id: member_id.into(),
            is_admin,
            message_count: 0,
            timeout_count: 0,
            mute_count: 0,
            ban_count: 0,
            permanent_ban_count: 0,
            kick_count: 0,
            warn_count: 0,
            note: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the per-type punishment counter.
    pub fn record_punishment(&mut self, kind: PunishmentKind) {
        let counter = match kind {
            PunishmentKind::Timeout => &mut self.timeout_count,
            PunishmentKind::Mute => &mut self.mute_count,
            PunishmentKind::Ban => &mut self.ban_count,
            PunishmentKind::PermanentBan => &mut self.permanent_ban_count,
            PunishmentKind::Kick => &mut self.kick_count,
            PunishmentKind::Warn => &mut self.warn_count,
        };
        *counter += 1;
        self.updated_at = Utc::now();
    }
}

/// The kinds of restriction that can be applied to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PunishmentKind {
    Timeout,
    Mute,
    Ban,
    PermanentBan,
    Kick,
    Warn,
}

impl Display for PunishmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Mute => write!(f, "mute"),
            Self::Ban => write!(f, "ban"),
            Self::PermanentBan => write!(f, "permanentBan"),
            Self::Kick => write!(f, "kick"),
            Self::Warn => write!(f, "warn"),
        }
    }
}

/// A timed or permanent restriction applied to a member.
///
/// Rows are immutable once written except for `is_active`, which transitions
/// true to false exactly once and never back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Punishment {
    pub id: String,
    pub member_id: String,
    pub membership_id: String,
    pub group_id: String,
    pub kind: PunishmentKind,
    /// 0 means permanent.
    pub duration_ms: u64,
    pub reason: String,
    pub applied_at: DateTime<Utc>,
    /// `None` means the punishment never expires.
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Punishment {
    #[must_use]
    pub fn new(
        member_id: impl Into<String>,
        membership_id: impl Into<String>,
        group_id: impl Into<String>,
        kind: PunishmentKind,
        duration_ms: u64,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let expires_at = if duration_ms > 0 {
            // Durations past the representable range pin to the far future
            // instead of overflowing
            let offset = Duration::milliseconds(i64::try_from(duration_ms).unwrap_or(i64::MAX));
            Some(
                now.checked_add_signed(offset)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            )
        } else {
            None
        };
        Self {
            id: Uuid::new_v4().to_string(),
            member_id: member_id.into(),
            membership_id: membership_id.into(),
            group_id: group_id.into(),
            kind,
            duration_ms,
            reason: reason.into(),
            applied_at: now,
            expires_at,
            is_active: true,
        }
    }

    /// Whether the punishment has run out at `now`. Permanent punishments
    /// never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Remaining time in milliseconds, `None` for permanent punishments.
    #[must_use]
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at
            .map(|expires_at| (expires_at - now).num_milliseconds().max(0))
    }

    /// Deactivate the punishment. Returns false if it was already inactive;
    /// the flag never transitions back to true.
    pub fn deactivate(&mut self) -> bool {
        let was_active = self.is_active;
        self.is_active = false;
        was_active
    }
}

impl Display for Punishment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "Punishment {}: member {}, kind {}, duration {}ms, active {}",
            self.id, self.member_id, self.kind, self.duration_ms, self.is_active
        ))
    }
}

/// A permanent, cross-group exclusion record for a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: String,
    /// Unique per member.
    pub member_id: String,
    pub reason: String,
    pub banned_by: Option<String>,
    pub banned_from_group_id: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl BlacklistEntry {
    #[must_use]
    pub fn new(
        member_id: impl Into<String>,
        reason: impl Into<String>,
        banned_by: Option<String>,
        banned_from_group_id: Option<String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            member_id: member_id.into(),
            reason: reason.into(),
            banned_by,
            banned_from_group_id,
            notes: notes.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punishment_kind_serialization() {
        let serialized = serde_json::to_string(&PunishmentKind::PermanentBan).unwrap();
        assert_eq!(serialized, "\"permanentBan\"");
        let deserialized: PunishmentKind = serde_json::from_str("\"timeout\"").unwrap();
        assert_eq!(deserialized, PunishmentKind::Timeout);
    }

    #[test]
    fn test_punishment_expiry() {
        let timed = Punishment::new("m", "cm", "g", PunishmentKind::Timeout, 5 * 60 * 1000, "quiet");
        assert!(timed.is_active);
        assert!(timed.expires_at.is_some());
        assert!(!timed.is_expired_at(Utc::now()));
        assert!(timed.is_expired_at(Utc::now() + Duration::minutes(6)));

        let permanent = Punishment::new("m", "cm", "g", PunishmentKind::Ban, 0, "out");
        assert!(permanent.expires_at.is_none());
        assert!(!permanent.is_expired_at(Utc::now() + Duration::days(365)));
        assert_eq!(permanent.remaining_ms(Utc::now()), None);
    }

    #[test]
    fn test_oversized_duration_pins_to_far_future() {
        let huge = Punishment::new("m", "cm", "g", PunishmentKind::Timeout, u64::MAX, "forever");
        let expires_at = huge.expires_at.unwrap();
        assert_eq!(expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!huge.is_expired_at(Utc::now()));
        assert!(huge.remaining_ms(Utc::now()).unwrap() > 0);
    }

    #[test]
    fn test_punishment_deactivate_once() {
        let mut punishment = Punishment::new("m", "cm", "g", PunishmentKind::Mute, 1000, "shh");
        assert!(punishment.deactivate());
        assert!(!punishment.is_active);
        // Second call reports no transition and the flag stays false
        assert!(!punishment.deactivate());
        assert!(!punishment.is_active);
    }

    #[test]
    fn test_member_placeholder_name() {
        let unnamed = Member::new("ext-1", "");
        assert!(unnamed.has_placeholder_name());
        let named = Member::new("ext-2", "Alice");
        assert!(!named.has_placeholder_name());
        assert_eq!(named.display_name, "Alice");
    }

    #[test]
    fn test_membership_counters() {
        let mut membership = GroupMembership::new("g", "m", false);
        membership.record_punishment(PunishmentKind::Timeout);
        membership.record_punishment(PunishmentKind::Timeout);
        membership.record_punishment(PunishmentKind::Warn);
        assert_eq!(membership.timeout_count, 2);
        assert_eq!(membership.warn_count, 1);
        assert_eq!(membership.ban_count, 0);
    }
}
