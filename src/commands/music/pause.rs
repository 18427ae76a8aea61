use super::*;

/// Pause the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    run_action(ctx, ControlAction::Pause).await
}
