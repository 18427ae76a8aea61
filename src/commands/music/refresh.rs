use super::*;

/// Repost the persistent queue message
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn refresh(ctx: Context<'_>) -> CommandResult {
    run_action(ctx, ControlAction::Refresh).await
}
