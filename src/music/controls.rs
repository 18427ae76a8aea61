//! The single entry point shared by slash commands and status-message
//! buttons. Every action goes through the same permission check.

use tracing::{debug, info};

use super::error::{MusicError, MusicResult};
use super::event_handlers::ControllerHandle;
use super::music_manager::Notice;
use super::permissions::{CallerPermissions, PermissionCheck};
use super::sink::ControlButton;
use super::track::{ChannelKey, GuildKey};

/// A privileged operation requested by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// `voice_channel` is `None` when the caller is not in voice; that is
    /// only reported once the caller has passed the permission check.
    Play {
        voice_channel: Option<ChannelKey>,
        query: String,
    },
    Pause,
    Resume,
    Skip,
    Stop,
    ClearQueue,
    Refresh,
    SetChannel(ChannelKey),
}

impl From<ControlButton> for ControlAction {
    fn from(button: ControlButton) -> Self {
        match button {
            ControlButton::Pause => ControlAction::Pause,
            ControlButton::Resume => ControlAction::Resume,
            ControlButton::Skip => ControlAction::Skip,
            ControlButton::Stop => ControlAction::Stop,
        }
    }
}

impl ControlAction {
    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::Play { .. } => "play",
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Skip => "skip",
            ControlAction::Stop => "stop",
            ControlAction::ClearQueue => "clear_queue",
            ControlAction::Refresh => "refresh",
            ControlAction::SetChannel(_) => "set_channel",
        }
    }
}

/// Check the caller's permissions, then forward the action to the controller.
pub async fn dispatch(
    handle: &ControllerHandle,
    check: &dyn PermissionCheck,
    caller: &CallerPermissions,
    guild: GuildKey,
    action: ControlAction,
) -> MusicResult<Notice> {
    if !check.is_privileged(caller) {
        debug!(%guild, "Denied {} for unprivileged caller", action.name());
        return Err(MusicError::PermissionDenied);
    }

    info!(%guild, "Dispatching {}", action.name());
    match action {
        ControlAction::Play {
            voice_channel,
            query,
        } => {
            let voice_channel = voice_channel.ok_or(MusicError::UserNotInVoiceChannel)?;
            handle.play(guild, voice_channel, query).await
        }
        ControlAction::Pause => handle.pause(guild).await,
        ControlAction::Resume => handle.resume(guild).await,
        ControlAction::Skip => handle.skip(guild).await,
        ControlAction::Stop => handle.stop(guild).await,
        ControlAction::ClearQueue => handle.clear_queue(guild).await,
        ControlAction::Refresh => handle.refresh(guild).await,
        ControlAction::SetChannel(channel) => handle.set_channel(guild, channel).await,
    }
}
