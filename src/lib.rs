//! Aquapod: a Discord bot that plays podcasts and music from YouTube and
//! SoundCloud links or free-text searches into a guild voice channel.
//!
//! The binary wires these pieces to serenity, poise and songbird; everything
//! that decides what plays next lives here and can be driven without Discord.

pub mod config;
pub mod music;
