//! Guild playback: queueing, resolution, the playback state machine and the
//! persistent status message.

pub mod audio_sources;
pub mod controls;
pub mod discord_channel;
pub mod embedded_messages;
pub mod error;
pub mod event_handlers;
pub mod music_manager;
pub mod permissions;
pub mod queue_manager;
pub mod sink;
pub mod songbird_sink;
pub mod track;

pub use controls::{ControlAction, dispatch};
pub use error::{MusicError, MusicResult};
pub use event_handlers::ControllerHandle;
pub use music_manager::{Notice, PlaybackController};
