pub(crate) mod clear_queue;
pub(crate) mod pause;
pub(crate) mod play;
pub(crate) mod refresh;
pub(crate) mod resume;
pub(crate) mod set_channel;
pub(crate) mod skip;
pub(crate) mod stop;

use crate::{CommandResult, Context};
use aquapod::music::discord_channel::caller_permissions;
use aquapod::music::permissions::CallerPermissions;
use aquapod::music::track::GuildKey;
use aquapod::music::{ControlAction, MusicError, MusicResult, Notice, dispatch};
use poise::CreateReply;
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

/// Permissions of the member invoking the command.
async fn caller(ctx: Context<'_>, guild_id: serenity::GuildId) -> CallerPermissions {
    match ctx.author_member().await {
        Some(member) => caller_permissions(ctx.cache(), guild_id, &member),
        None => CallerPermissions::default(),
    }
}

/// Reply privately with the outcome of a command.
async fn respond(ctx: Context<'_>, result: MusicResult<Notice>) -> CommandResult {
    let content = match result {
        Ok(notice) => notice.text(),
        Err(MusicError::PermissionDenied) => {
            debug!("Command {} denied", ctx.command().name);
            MusicError::PermissionDenied.user_message()
        }
        Err(err) => {
            warn!("Command {} failed: {}", ctx.command().name, err);
            err.user_message()
        }
    };
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

/// Run a control action for the invoking member and reply with the result.
async fn run_action(ctx: Context<'_>, action: ControlAction) -> CommandResult {
    let Some(guild_id) = ctx.guild_id() else {
        return respond(ctx, Err(MusicError::NotInGuild)).await;
    };
    let caller = caller(ctx, guild_id).await;

    // Defer the response since the controller may be busy with other guilds
    ctx.defer_ephemeral().await?;

    let result = dispatch(
        &ctx.data().controller,
        &ctx.data().permissions,
        &caller,
        GuildKey(guild_id.get()),
        action,
    )
    .await;
    respond(ctx, result).await
}
