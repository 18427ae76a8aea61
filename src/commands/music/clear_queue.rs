use super::*;

/// Remove every queued track, keeping the current one
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn clear_queue(ctx: Context<'_>) -> CommandResult {
    run_action(ctx, ControlAction::ClearQueue).await
}
