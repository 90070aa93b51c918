//! Moderation commands.
//!
//! The dispatcher turns inbound messages that start with a slash into
//! [`CommandExecuted`] events; each command module subscribes to those and
//! filters on its own command word. Members with an active punishment cannot
//! run commands at all.

pub mod all;
pub mod ban;
pub mod ping;
pub mod register_group;
pub mod set_free;
pub mod timeout;
pub mod unban;

use chrono::Utc;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::events::{
    CommandExecuted, DomainEvent, EventKind, EventPayload, MemberMessageSent, MessageHandle,
    SendMessage,
};
use crate::model::{Member, Punishment, PunishmentKind};
use crate::storage::CreatePunishment;
use crate::{CONSOLE_TARGET, Error};

pub const VALID_COMMANDS: &[&str] = &[
    "/timeout",
    "/ban",
    "/unban",
    "/setfree",
    "/registergroup",
    "/all",
    "/ping",
];

/// Wire the dispatcher and every command handler into the bus.
pub fn register_all(ctx: &AppContext) {
    register_dispatcher(ctx);
    timeout::register(ctx);
    ban::register(ctx);
    unban::register(ctx);
    set_free::register(ctx);
    register_group::register(ctx);
    all::register(ctx);
    ping::register(ctx);
}

fn register_dispatcher(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::MemberMessageSent, "command-dispatcher", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::MemberMessageSent(message) = event.payload {
                    dispatch(&ctx, &message).await?;
                }
                Ok(())
            }
        });
}

/// Route a slash-prefixed message to its command.
///
/// Non-command messages pass through untouched. A punished invoker is
/// silently refused; an unknown command gets the command list as a reply.
pub async fn dispatch(ctx: &AppContext, message: &MemberMessageSent) -> Result<(), Error> {
    let Some(word) = message.message.body.split_whitespace().next() else {
        return Ok(());
    };
    if !word.starts_with('/') {
        return Ok(());
    }
    let command = word.to_ascii_lowercase();

    if let Some(punishment) = ctx.punishments.get_active(&message.member_id).await?
        && !punishment.is_expired_at(Utc::now())
    {
        info!(
            target: CONSOLE_TARGET,
            member = %message.member_id,
            command,
            "Refusing command from punished member"
        );
        return Ok(());
    }

    if !VALID_COMMANDS.contains(&command.as_str()) {
        ctx.bus.publish(SendMessage::reply(
            &message.message,
            format!(
                "Unknown command {command}. Available commands: {}",
                VALID_COMMANDS.join(", ")
            ),
        ));
        return Ok(());
    }

    ctx.bus.publish(DomainEvent::from(CommandExecuted {
        command,
        message: message.message.clone(),
        chat: message.chat.clone(),
        target_member_id: message.target_member_id.clone(),
        target_display_name: message.target_display_name.clone(),
        target_author_id: message.target_author_id.clone(),
    }));
    Ok(())
}

pub(crate) fn could_not_complete(message: &MessageHandle) -> SendMessage {
    SendMessage::reply(message, "Could not complete the action.")
}

/// The command's target, or a reply telling the invoker one is required.
pub(crate) fn target_or_notice(
    ctx: &AppContext,
    cmd: &CommandExecuted,
) -> Option<(String, String)> {
    match cmd.target_member_id {
        Some(ref id) => {
            let name = cmd.target_display_name.clone().unwrap_or_default();
            Some((id.clone(), name))
        }
        None => {
            ctx.bus.publish(SendMessage::reply(
                &cmd.message,
                "Mention or quote the member this command should apply to.",
            ));
            None
        }
    }
}

/// Resolve the target in the command's group and apply a punishment to them.
///
/// The punishment row is the source of truth; a failed counter bump on the
/// membership is logged and tolerated so the punishment still lands.
pub(crate) async fn apply_punishment(
    ctx: &AppContext,
    cmd: &CommandExecuted,
    target: &(String, String),
    kind: PunishmentKind,
    duration_ms: u64,
    reason: impl Into<String>,
) -> Result<(Member, Punishment), Error> {
    let (external_member_id, display_name) = target;
    let group = ctx
        .groups
        .get_by_external_id(&cmd.chat.id)
        .await?
        .ok_or_else(|| format!("group {} is not registered", cmd.chat.id))?;

    let member = ctx
        .members
        .get_or_create(external_member_id, display_name)
        .await?;
    let membership = ctx
        .memberships
        .get_or_create(&group.id, &member.id, false)
        .await?;

    let punishment = ctx
        .punishments
        .create(CreatePunishment {
            member_id: member.id.clone(),
            external_member_id: member.external_member_id.clone(),
            membership_id: membership.id.clone(),
            group_id: group.id.clone(),
            kind,
            duration_ms,
            reason: reason.into(),
        })
        .await?;

    if let Err(error) = ctx.memberships.record_punishment(&membership.id, kind).await {
        warn!(
            target: CONSOLE_TARGET,
            membership = %membership.id,
            %error,
            "Punishment counter update failed"
        );
    }

    Ok((member, punishment))
}
