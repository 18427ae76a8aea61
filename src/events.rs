use serenity::all::{ComponentInteraction, CreateInteractionResponseFollowup};
use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::prelude::*;
use tracing::{debug, error, warn};

use aquapod::music::discord_channel::caller_permissions;
use aquapod::music::error::MusicError;
use aquapod::music::permissions::RolePermissionCheck;
use aquapod::music::sink::ControlButton;
use aquapod::music::track::GuildKey;
use aquapod::music::{ControlAction, ControllerHandle, dispatch};

const BUTTON_DENIED: &str = "You need to be a DJ or admin to use this button.";

/// Routes status-message button presses to the playback controller.
pub struct Handler {
    controller: ControllerHandle,
    permissions: RolePermissionCheck,
}

impl Handler {
    pub fn new(controller: ControllerHandle, permissions: RolePermissionCheck) -> Self {
        Self {
            controller,
            permissions,
        }
    }
}

#[async_trait]
impl serenity::prelude::EventHandler for Handler {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            if let Some(button) = ControlButton::from_custom_id(&component.data.custom_id) {
                self.music_component_interaction(&ctx, &component, button)
                    .await;
            }
        }
    }
}

impl Handler {
    /// Handle component interactions for the status message controls
    async fn music_component_interaction(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        button: ControlButton,
    ) {
        // Acknowledge first; the controller may be busy with other guilds
        if let Err(e) = component.defer_ephemeral(&ctx.http).await {
            error!("Error deferring component interaction: {}", e);
            return;
        }

        let text = match self.press(ctx, component, button).await {
            Ok(text) => text,
            Err(MusicError::PermissionDenied) => {
                debug!("Button {:?} denied", button);
                BUTTON_DENIED.to_string()
            }
            Err(e) => {
                warn!("Button {:?} failed: {}", button, e);
                e.user_message()
            }
        };

        let followup = CreateInteractionResponseFollowup::new()
            .content(text)
            .ephemeral(true);
        if let Err(e) = component.create_followup(&ctx.http, followup).await {
            error!("Error handling component interaction: {}", e);
        }
    }

    async fn press(
        &self,
        ctx: &Context,
        component: &ComponentInteraction,
        button: ControlButton,
    ) -> Result<String, MusicError> {
        let guild_id = component.guild_id.ok_or(MusicError::NotInGuild)?;
        let member = component.member.as_ref().ok_or(MusicError::NotInGuild)?;
        let caller = caller_permissions(&ctx.cache, guild_id, member);

        let notice = dispatch(
            &self.controller,
            &self.permissions,
            &caller,
            GuildKey(guild_id.get()),
            ControlAction::from(button),
        )
        .await?;
        Ok(notice.text())
    }
}
