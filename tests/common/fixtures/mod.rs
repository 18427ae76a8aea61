//! Sample ids, links and tracks shared by the integration tests.

use aquapod::music::track::{ChannelKey, GuildKey, Track};

pub const GUILD: GuildKey = GuildKey(123456789);
pub const VOICE: ChannelKey = ChannelKey(555);
pub const STATUS: ChannelKey = ChannelKey(987654321);

pub const EPISODE_A: &str = "https://www.youtube.com/watch?v=aaaaaaaaaaa";
pub const EPISODE_B: &str = "https://www.youtube.com/watch?v=bbbbbbbbbbb";
pub const EPISODE_C: &str = "https://youtu.be/ccccccccccc";
pub const LIVE: &str = "https://www.youtube.com/live/lllllllllll";
pub const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PLmix";

pub fn track(title: &str, url: &str) -> Track {
    Track::new(Some(title), url, false, url).expect("valid track")
}

pub fn live_track(title: &str, url: &str) -> Track {
    Track::new(Some(title), url, true, url).expect("valid track")
}
