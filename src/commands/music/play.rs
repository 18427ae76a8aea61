use super::*;
use aquapod::music::discord_channel::user_voice_channel;
use tracing::info;

/// Play a podcast or song from a YouTube/SoundCloud link or a search
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    info!("Received play command with query: {}", query);

    // Get the user's voice channel; being absent is reported after the permission check
    let voice_channel = ctx
        .guild_id()
        .and_then(|guild_id| user_voice_channel(ctx.cache(), guild_id, ctx.author().id).ok());

    run_action(
        ctx,
        ControlAction::Play {
            voice_channel,
            query,
        },
    )
    .await
}
