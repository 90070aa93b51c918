//! `/ping`: liveness check.

use crate::Error;
use crate::context::AppContext;
use crate::events::{CommandExecuted, EventKind, EventPayload, SendMessage};

pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::CommandExecuted, "ping", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::CommandExecuted(cmd) = event.payload
                    && cmd.command == "/ping"
                {
                    run(&ctx, &cmd).await?;
                }
                Ok(())
            }
        });
}

pub async fn run(ctx: &AppContext, cmd: &CommandExecuted) -> Result<(), Error> {
    ctx.bus.publish(SendMessage::reply(&cmd.message, "pong"));
    Ok(())
}
