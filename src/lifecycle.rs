//! The per-message lifecycle: lazy registration of members and memberships,
//! counter updates and the lazy punishment expiry check.
//!
//! Nothing here runs on a timer. A timed punishment is only discovered to be
//! over when its member next sends a message; until then the stale row stays
//! active in the store and nobody is told.

use chrono::Utc;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::duration::format_duration;
use crate::events::{
    DomainEvent, EventKind, EventPayload, MemberMessageSent, PunishmentChecked, SendMessage,
};
use crate::model::{Member, Punishment};
use crate::{CONSOLE_TARGET, Error};

/// Wire the lifecycle into the bus.
pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::MemberMessageSent, "lifecycle", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::MemberMessageSent(message) = event.payload {
                    handle_member_message(&ctx, &message).await?;
                }
                Ok(())
            }
        });
}

/// Process one inbound group message.
///
/// Messages from groups nobody registered are dropped without side effects.
/// For registered groups the member and membership rows are created lazily,
/// the message counter moves, and the member's punishment state is checked.
pub async fn handle_member_message(
    ctx: &AppContext,
    message: &MemberMessageSent,
) -> Result<(), Error> {
    let Some(group) = ctx.groups.get_by_external_id(&message.group_id).await? else {
        debug!(
            target: CONSOLE_TARGET,
            group = %message.group_id,
            "Message from unregistered group ignored"
        );
        return Ok(());
    };

    let member = ctx
        .members
        .get_or_create(&message.member_id, &message.display_name)
        .await?;
    let member = adopt_display_name(ctx, member, &message.display_name).await?;

    let membership = ctx
        .memberships
        .get_or_create(&group.id, &member.id, message.is_admin)
        .await?;
    ctx.memberships
        .increment_message_count(&membership.id)
        .await?;

    check_punishment(ctx, message, &member).await?;
    Ok(())
}

/// Swap the placeholder for the first real name we see. A row that already
/// carries a real name is never renamed from the message path.
async fn adopt_display_name(
    ctx: &AppContext,
    member: Member,
    observed_name: &str,
) -> Result<Member, Error> {
    if !member.has_placeholder_name() || observed_name.trim().is_empty() {
        return Ok(member);
    }
    info!(
        target: CONSOLE_TARGET,
        member = %member.external_member_id,
        name = observed_name,
        "Adopting observed display name"
    );
    Ok(ctx.members.set_display_name(&member.id, observed_name).await?)
}

/// Lazy expiry check on the hot path.
///
/// An expired punishment is deactivated silently and the message passes. A
/// still-active one produces a notice into the chat and a record event for
/// other subscribers.
async fn check_punishment(
    ctx: &AppContext,
    message: &MemberMessageSent,
    member: &Member,
) -> Result<(), Error> {
    let Some(punishment) = ctx.punishments.get_active(&member.external_member_id).await? else {
        return Ok(());
    };

    let now = Utc::now();
    if punishment.is_expired_at(now) {
        ctx.punishments.deactivate(&member.external_member_id).await?;
        info!(
            target: CONSOLE_TARGET,
            member = %member.external_member_id,
            punishment = %punishment.id,
            "Punishment expired, deactivated lazily"
        );
        return Ok(());
    }

    let remaining_ms = punishment.remaining_ms(now);
    ctx.bus.publish(SendMessage::reply(
        &message.message,
        punishment_notice(&member.display_name, &punishment, remaining_ms),
    ));
    ctx.bus.publish(DomainEvent::from(PunishmentChecked {
        group_id: message.group_id.clone(),
        member_id: member.external_member_id.clone(),
        display_name: member.display_name.clone(),
        punishment,
        remaining_ms,
        message: message.message.clone(),
    }));
    Ok(())
}

fn punishment_notice(
    display_name: &str,
    punishment: &Punishment,
    remaining_ms: Option<i64>,
) -> String {
    match remaining_ms {
        Some(remaining) => format!(
            "{display_name}, your {} is still active. Time remaining: {}.",
            punishment.kind,
            format_duration(u64::try_from(remaining).unwrap_or(0))
        ),
        None => format!(
            "{display_name}, you are banned from this group permanently."
        ),
    }
}
