// playback/mod.rs
//! Client-side mirror of the server's playback state for one guild.

use crate::models::{ServerEvent, SyncPatch, Track, TrackInfo};
use serde::Serialize;
use tracing::{debug, warn};

pub const MAX_VOLUME: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicStatus {
    #[default]
    Instantiated,
    Playing,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Open,
    #[default]
    Closed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub voice_channel: Option<String>,
    pub track_id: String,
    pub current_track: Option<TrackInfo>,
    pub queue: Vec<Track>,
    /// Milliseconds into the current track at the last sync point.
    pub position: u64,
    pub status: MusicStatus,
    pub volume: u8,
    pub replay: bool,
    pub connection: ConnectionStatus,
}

impl PlaybackState {
    /// Reduces one server event into the state. Returns whether anything changed.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        let before = self.clone();

        match event {
            ServerEvent::MusicConnect(data) => {
                self.voice_channel = Some(data.voice_channel.clone());
            }
            ServerEvent::MusicLeave => {
                self.voice_channel = None;
            }
            ServerEvent::MusicPrune(data) => {
                self.queue = data.tracks.clone();
            }
            ServerEvent::MusicReplayUpdate(data) => {
                self.replay = data.replay;
            }
            ServerEvent::MusicFinish => {
                self.track_id.clear();
                self.queue.clear();
                self.position = 0;
                self.status = MusicStatus::Ended;
            }
            ServerEvent::MusicSongPause => self.transition(MusicStatus::Paused),
            ServerEvent::MusicSongResume => self.transition(MusicStatus::Playing),
            ServerEvent::MusicSongSeekUpdate(data) => {
                self.position = data.status.position;
            }
            ServerEvent::MusicSongVolumeUpdate(data) => {
                self.volume = clamp_volume(data.volume);
            }
            ServerEvent::MusicSync(patch) => self.merge(patch),
            ServerEvent::Unknown(action) => {
                debug!(%action, "Ignoring unknown music action");
            }
        }

        *self != before
    }

    /// The local player finished loading the current track.
    pub fn player_ready(&mut self) -> bool {
        if self.status == MusicStatus::Instantiated {
            self.status = MusicStatus::Playing;
            true
        } else {
            false
        }
    }

    fn transition(&mut self, next: MusicStatus) {
        if self.status == MusicStatus::Ended {
            debug!(?next, "Ignoring status change after the queue ended");
            return;
        }
        self.status = next;
    }

    fn merge(&mut self, patch: &SyncPatch) {
        // An empty channel id means "not reported", not "left".
        if let Some(voice_channel) = patch.voice_channel.as_ref().filter(|c| !c.is_empty()) {
            self.voice_channel = Some(voice_channel.clone());
        }
        if let Some(volume) = patch.volume {
            self.volume = clamp_volume(volume);
        }
        if let Some(now_playing) = &patch.status {
            self.track_id = now_playing.entry.track.clone();
            self.current_track = Some(now_playing.entry.info.clone());
            self.position = now_playing.position;
            if self.status == MusicStatus::Ended {
                self.status = MusicStatus::Instantiated;
            }
        }
        if let Some(tracks) = &patch.tracks {
            self.queue = tracks.clone();
        }
    }

    /// Whether the view should show its "Not Playing" placeholder.
    pub fn is_idle(&self) -> bool {
        self.track_id.is_empty() || self.voice_channel.is_none()
    }

    /// Resets everything except the connection status.
    pub fn reset(&mut self) {
        *self = Self {
            connection: self.connection,
            ..Self::default()
        };
    }
}

fn clamp_volume(volume: u32) -> u8 {
    if volume > MAX_VOLUME {
        warn!(volume, "Volume above {MAX_VOLUME}, clamping");
    }
    volume.min(MAX_VOLUME) as u8
}

impl TrackInfo {
    pub fn is_youtube(&self) -> bool {
        self.uri.contains("youtube")
    }

    pub fn thumbnail_url(&self) -> Option<String> {
        self.is_youtube()
            .then(|| format!("https://img.youtube.com/vi/{}/hqdefault.jpg", self.identifier))
    }

    /// Initials of the title, used as an avatar when there is no thumbnail.
    pub fn acronym(&self) -> String {
        self.title
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .filter(|c| c.is_alphanumeric())
            .collect()
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() { "Unknown Title" } else { &self.title }
    }

    pub fn display_author(&self) -> &str {
        if self.author.is_empty() { "Unknown Uploader" } else { &self.author }
    }
}
