//! `/ban`: a permanent punishment plus a cross-group blacklist entry.

use crate::context::AppContext;
use crate::events::{CommandExecuted, EventKind, EventPayload, SendMessage};
use crate::model::{BlacklistEntry, PunishmentKind};
use crate::{Error, commands};

pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::CommandExecuted, "ban", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::CommandExecuted(cmd) = event.payload
                    && cmd.command == "/ban"
                {
                    run(&ctx, &cmd).await?;
                }
                Ok(())
            }
        });
}

pub async fn run(ctx: &AppContext, cmd: &CommandExecuted) -> Result<(), Error> {
    let Some(target) = commands::target_or_notice(ctx, cmd) else {
        return Ok(());
    };

    let result = ban_member(ctx, cmd, &target).await;
    match result {
        Ok(None) => {
            ctx.bus.publish(SendMessage::reply(
                &cmd.message,
                format!("{} is already banned.", target.1),
            ));
            Ok(())
        }
        Ok(Some(display_name)) => {
            ctx.bus.publish(SendMessage::reply(
                &cmd.message,
                format!("{display_name} has been banned permanently."),
            ));
            Ok(())
        }
        Err(error) => {
            ctx.bus.publish(commands::could_not_complete(&cmd.message));
            Err(error)
        }
    }
}

/// `Ok(None)` means the target was already blacklisted and nothing changed.
async fn ban_member(
    ctx: &AppContext,
    cmd: &CommandExecuted,
    target: &(String, String),
) -> Result<Option<String>, Error> {
    if let Some(member) = ctx.members.get_by_external_id(&target.0).await?
        && ctx.blacklist.is_blacklisted(&member.id).await?
    {
        return Ok(None);
    }

    let (member, punishment) =
        commands::apply_punishment(ctx, cmd, target, PunishmentKind::PermanentBan, 0, "banned by command")
            .await?;

    let entry = BlacklistEntry::new(
        member.id.clone(),
        "banned by command",
        cmd.message.author_id.clone(),
        Some(punishment.group_id),
        "",
    );
    ctx.blacklist.add(entry).await?;
    Ok(Some(member.display_name))
}
