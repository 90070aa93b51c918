//! `/timeout`: a timed restriction, defaulting to ten minutes.

use crate::context::AppContext;
use crate::duration::{extract_time_argument, format_duration, parse_time_to_ms};
use crate::events::{CommandExecuted, EventKind, EventPayload, SendMessage};
use crate::model::PunishmentKind;
use crate::{Error, commands};

pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::CommandExecuted, "timeout", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::CommandExecuted(cmd) = event.payload
                    && cmd.command == "/timeout"
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
    let duration_ms = extract_time_argument(&cmd.message.body)
        .map_or_else(|| parse_time_to_ms(""), |arg| parse_time_to_ms(&arg));

    let result = commands::apply_punishment(
        ctx,
        cmd,
        &target,
        PunishmentKind::Timeout,
        duration_ms,
        "timed out by command",
    )
    .await;

    match result {
        Ok((member, _)) => {
            ctx.bus.publish(SendMessage::reply(
                &cmd.message,
                format!(
                    "{} has been timed out for {}.",
                    member.display_name,
                    format_duration(duration_ms)
                ),
            ));
            Ok(())
        }
        Err(error) => {
            ctx.bus.publish(commands::could_not_complete(&cmd.message));
            Err(error)
        }
    }
}
