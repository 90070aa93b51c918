//! `/registergroup`: put the current chat under moderation.

use crate::context::AppContext;
use crate::events::{CommandExecuted, EventKind, EventPayload, SendMessage};
use crate::storage::CreateGroup;
use crate::{Error, commands};

pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::CommandExecuted, "register-group", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::CommandExecuted(cmd) = event.payload
                    && cmd.command == "/registergroup"
                {
                    run(&ctx, &cmd).await?;
                }
                Ok(())
            }
        });
}

pub async fn run(ctx: &AppContext, cmd: &CommandExecuted) -> Result<(), Error> {
    let result = ctx
        .groups
        .create(CreateGroup {
            external_group_id: cmd.chat.id.clone(),
            name: cmd.chat.name.clone(),
            description: cmd.chat.description.clone(),
        })
        .await;

    match result {
        Ok(group) => {
            ctx.bus.publish(SendMessage::reply(
                &cmd.message,
                format!("{} is now under moderation.", group.name),
            ));
            Ok(())
        }
        Err(error) if error.is_conflict() => {
            ctx.bus.publish(SendMessage::reply(
                &cmd.message,
                "This group is already registered.",
            ));
            Ok(())
        }
        Err(error) => {
            ctx.bus.publish(commands::could_not_complete(&cmd.message));
            Err(error.into())
        }
    }
}
