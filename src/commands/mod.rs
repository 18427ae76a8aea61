//! This module aggregates all the command modules for the bot.

/// Commands related to playback and the status message.
pub(crate) mod music;
