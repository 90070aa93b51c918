//! `/setfree`: unconditionally deactivate a member's punishments.
//!
//! Always confirms, whether or not anything was active; the outcome state is
//! the same either way.

use crate::context::AppContext;
use crate::events::{CommandExecuted, EventKind, EventPayload, SendMessage};
use crate::{Error, commands};

pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::CommandExecuted, "set-free", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::CommandExecuted(cmd) = event.payload
                    && cmd.command == "/setfree"
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

    match ctx.punishments.deactivate(&external_member_id).await {
        Ok(_) => {
            ctx.bus.publish(SendMessage::reply(
                &cmd.message,
                format!("{display_name} is free. No punishments are active."),
            ));
            Ok(())
        }
        Err(error) => {
            ctx.bus.publish(commands::could_not_complete(&cmd.message));
            Err(error.into())
        }
    }
}
