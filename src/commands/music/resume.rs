use super::*;

/// Resume the paused track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    run_action(ctx, ControlAction::Resume).await
}
