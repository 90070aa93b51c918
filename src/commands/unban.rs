//! `/unban`: remove a member from the blacklist and deactivate their
//! punishments.

use crate::context::AppContext;
use crate::events::{CommandExecuted, EventKind, EventPayload, SendMessage};
use crate::{Error, commands};

pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::CommandExecuted, "unban", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::CommandExecuted(cmd) = event.payload
                    && cmd.command == "/unban"
                {
                    run(&ctx, &cmd).await?;
                }
                Ok(())
            }
        });
}

pub async fn run(ctx: &AppContext, cmd: &CommandExecuted) -> Result<(), Error> {
    let Some((external_member_id, display_name)) = commands::target_or_notice(ctx, cmd) else {
        return Ok(());
    };

    let result = unban_member(ctx, &external_member_id).await;
    match result {
        Ok(was_listed) => {
            let text = if was_listed {
                format!("{display_name} has been unbanned.")
            } else {
                format!("{display_name} was not on the blacklist.")
            };
            ctx.bus.publish(SendMessage::reply(&cmd.message, text));
            Ok(())
        }
        Err(error) => {
            ctx.bus.publish(commands::could_not_complete(&cmd.message));
            Err(error)
        }
    }
}

async fn unban_member(ctx: &AppContext, external_member_id: &str) -> Result<bool, Error> {
    ctx.punishments.deactivate(external_member_id).await?;

    let Some(member) = ctx.members.get_by_external_id(external_member_id).await? else {
        return Ok(false);
    };
    Ok(ctx.blacklist.remove(&member.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testutil::{collect_outbound, command, context, registered_group};

    #[tokio::test]
    async fn test_unban_reverses_a_ban() {
        let (_dir, ctx) = context().await;
        registered_group(&ctx).await;

        crate::commands::ban::run(&ctx, &command("/ban", Some(("ext-t", "Bob"))))
            .await
            .unwrap();
        let member = ctx.members.get_by_external_id("ext-t").await.unwrap().unwrap();

        let mut replies = collect_outbound(&ctx);
        run(&ctx, &command("/unban", Some(("ext-t", "Bob"))))
            .await
            .unwrap();

        assert!(ctx.punishments.get_active("ext-t").await.unwrap().is_none());
        assert!(!ctx.blacklist.is_blacklisted(&member.id).await.unwrap());
        let reply = replies.recv().await.unwrap();
        assert!(reply.text.contains("unbanned"));
    }

    #[tokio::test]
    async fn test_unban_of_unlisted_member_says_so() {
        let (_dir, ctx) = context().await;
        registered_group(&ctx).await;
        let mut replies = collect_outbound(&ctx);

        run(&ctx, &command("/unban", Some(("ext-t", "Bob"))))
            .await
            .unwrap();
        let reply = replies.recv().await.unwrap();
        assert!(reply.text.contains("not on the blacklist"));
    }
}
