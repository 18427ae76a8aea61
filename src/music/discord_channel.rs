//! Serenity-backed [`MessageChannel`] plus the cache lookups the command
//! layer needs: the caller's voice channel and the caller's permissions.

use async_trait::async_trait;
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, ChannelId, CreateActionRow, CreateButton, CreateMessage,
    EditMessage, GuildId, MessageId, ReactionType,
};
use std::sync::Arc;
use tracing::debug;

use super::error::{ChannelError, MusicError, MusicResult};
use super::permissions::CallerPermissions;
use super::sink::{ControlButton, MessageChannel};
use super::track::{ChannelKey, MessageKey};

fn button(control: ControlButton) -> CreateButton {
    let (emoji, label, style) = match control {
        ControlButton::Pause => ("⏸️", "Pause", ButtonStyle::Primary),
        ControlButton::Resume => ("▶️", "Resume", ButtonStyle::Primary),
        ControlButton::Skip => ("⏭️", "Skip", ButtonStyle::Secondary),
        ControlButton::Stop => ("⏹️", "Stop", ButtonStyle::Danger),
    };
    CreateButton::new(control.custom_id())
        .emoji(ReactionType::Unicode(emoji.to_string()))
        .style(style)
        .label(label)
}

/// Creates a row of music control buttons
pub fn control_rows(controls: &[ControlButton]) -> Vec<CreateActionRow> {
    if controls.is_empty() {
        return Vec::new();
    }
    vec![CreateActionRow::Buttons(
        controls.iter().copied().map(button).collect(),
    )]
}

/// Posts and maintains messages through the Discord HTTP API.
#[derive(Clone)]
pub struct DiscordChannel {
    http: Arc<serenity::Http>,
}

impl DiscordChannel {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessageChannel for DiscordChannel {
    async fn send(
        &self,
        channel: ChannelKey,
        content: &str,
        controls: &[ControlButton],
    ) -> Result<MessageKey, ChannelError> {
        let message = CreateMessage::new()
            .content(content)
            .components(control_rows(controls));

        let sent = ChannelId::new(channel.0)
            .send_message(self.http.clone(), message)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))?;

        debug!("Sent message {} in {}", sent.id, channel);
        Ok(MessageKey(sent.id.get()))
    }

    async fn edit(
        &self,
        channel: ChannelKey,
        message: MessageKey,
        content: &str,
        controls: &[ControlButton],
    ) -> Result<(), ChannelError> {
        let edit = EditMessage::new()
            .content(content)
            .components(control_rows(controls));

        ChannelId::new(channel.0)
            .edit_message(self.http.clone(), MessageId::new(message.0), edit)
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::Edit(e.to_string()))
    }

    async fn delete(&self, channel: ChannelKey, message: MessageKey) -> Result<(), ChannelError> {
        self.http
            .delete_message(ChannelId::new(channel.0), MessageId::new(message.0), None)
            .await
            .map_err(|e| ChannelError::Delete(e.to_string()))
    }
}

/// Get the voice channel the user is currently in
pub fn user_voice_channel(
    cache: &serenity::Cache,
    guild_id: GuildId,
    user_id: serenity::UserId,
) -> MusicResult<ChannelKey> {
    let guild = cache.guild(guild_id).ok_or(MusicError::NotInGuild)?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
        .ok_or(MusicError::UserNotInVoiceChannel)?;

    Ok(ChannelKey(channel_id.get()))
}

/// Collect what the permission check needs to know about a member.
///
/// Interaction payloads carry the member's resolved permissions; role names
/// come from the guild cache.
pub fn caller_permissions(
    cache: &serenity::Cache,
    guild_id: GuildId,
    member: &serenity::Member,
) -> CallerPermissions {
    let resolved_admin = member
        .permissions
        .is_some_and(|permissions| permissions.administrator());

    let Some(guild) = cache.guild(guild_id) else {
        return CallerPermissions {
            administrator: resolved_admin,
            role_names: Vec::new(),
        };
    };

    let role_names = member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .map(|role| role.name.clone())
        .collect();
    let owner = guild.owner_id == member.user.id;

    CallerPermissions {
        administrator: resolved_admin || owner,
        role_names,
    }
}
