use super::*;
use aquapod::music::track::ChannelKey;

/// Set the channel that hosts the queue message
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn set_channel(
    ctx: Context<'_>,
    #[description = "Text channel for the queue message"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> CommandResult {
    run_action(ctx, ControlAction::SetChannel(ChannelKey(channel.id.get()))).await
}
