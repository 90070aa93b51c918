//! `/all`: broadcast a message mentioning every participant of the group.
//!
//! The mention list comes from the chat handle the transport resolved; the
//! delivery collaborator turns the ids into actual mentions. `/edit` anywhere
//! in the text asks the collaborator to edit its previous broadcast instead
//! of sending a new one.

use crate::context::AppContext;
use crate::events::{CommandExecuted, EventKind, EventPayload, SendMessage};
use crate::{Error, commands};

pub fn register(ctx: &AppContext) {
    let handler_ctx = ctx.clone();
    ctx.bus
        .subscribe(EventKind::CommandExecuted, "all", move |event| {
            let ctx = handler_ctx.clone();
            async move {
                if let EventPayload::CommandExecuted(cmd) = event.payload
                    && cmd.command == "/all"
                {
                    run(&ctx, &cmd).await?;
                }
                Ok(())
            }
        });
}

pub async fn run(ctx: &AppContext, cmd: &CommandExecuted) -> Result<(), Error> {
    let group = match ctx.groups.get_by_external_id(&cmd.chat.id).await {
        Ok(group) => group,
        Err(error) => {
            ctx.bus.publish(commands::could_not_complete(&cmd.message));
            return Err(error.into());
        }
    };
    if group.is_none() {
        ctx.bus.publish(SendMessage::reply(
            &cmd.message,
            "This group is not registered.",
        ));
        return Ok(());
    }

    let text = cmd.message.body.replacen("/all", "", 1).trim().to_string();
    ctx.bus.publish(SendMessage {
        chat_id: cmd.message.chat_id.clone(),
        edit_existing: text.contains("/edit"),
        text,
        reply_to: Some(cmd.message.clone()),
        mention_ids: cmd.chat.participant_ids.clone(),
    });
    Ok(())
}
