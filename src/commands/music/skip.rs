use super::*;

/// Skip to the next track in the queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    run_action(ctx, ControlAction::Skip).await
}
