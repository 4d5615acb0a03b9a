use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub title: String,
    pub author: String,
    pub uri: String,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub is_stream: bool,
    #[serde(default)]
    pub is_seekable: bool,
}

/// A queued entry: the encoded track blob plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub track: String,
    pub info: TrackInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub entry: Track,
    #[serde(default, deserialize_with = "millis")]
    pub position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicConnectData {
    pub voice_channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MusicPruneData {
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MusicReplayData {
    pub replay: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeekPosition {
    #[serde(deserialize_with = "millis")]
    pub position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MusicSeekData {
    pub status: SeekPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MusicVolumeData {
    pub volume: u32,
}

/// Full-sync payload. Every field is optional; present fields replace the
/// matching part of the playback state, absent ones leave it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPatch {
    #[serde(default)]
    pub voice_channel: Option<String>,
    #[serde(default)]
    pub volume: Option<u32>,
    #[serde(default)]
    pub status: Option<NowPlaying>,
    #[serde(default)]
    pub tracks: Option<Vec<Track>>,
}

/// Positions may arrive as floats (`1500.0`); they are rounded to whole milliseconds.
fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value >= 0.0 {
        Ok(value.round() as u64)
    } else {
        Err(de::Error::custom(format!("invalid position {value}")))
    }
}

/// Envelope of every message pushed by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct RawServerMessage {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    MusicConnect(MusicConnectData),
    MusicLeave,
    MusicPrune(MusicPruneData),
    MusicReplayUpdate(MusicReplayData),
    MusicFinish,
    MusicSongPause,
    MusicSongResume,
    MusicSongSeekUpdate(MusicSeekData),
    MusicSongVolumeUpdate(MusicVolumeData),
    MusicSync(SyncPatch),
    /// An action this client does not render yet.
    Unknown(String),
}

impl ServerEvent {
    /// Decodes a raw text frame. Unknown actions decode to [`ServerEvent::Unknown`];
    /// malformed JSON or a payload of the wrong shape is an error.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let RawServerMessage { action, data } = serde_json::from_str(text)?;
        Self::from_parts(action, data)
    }

    pub fn from_parts(action: String, data: Value) -> Result<Self, serde_json::Error> {
        let event = match action.as_str() {
            "MUSIC_CONNECT" => ServerEvent::MusicConnect(serde_json::from_value(data)?),
            "MUSIC_LEAVE" => ServerEvent::MusicLeave,
            "MUSIC_PRUNE" => ServerEvent::MusicPrune(serde_json::from_value(data)?),
            "MUSIC_REPLAY_UPDATE" => ServerEvent::MusicReplayUpdate(serde_json::from_value(data)?),
            "MUSIC_FINISH" => ServerEvent::MusicFinish,
            "MUSIC_SONG_PAUSE" => ServerEvent::MusicSongPause,
            "MUSIC_SONG_RESUME" => ServerEvent::MusicSongResume,
            "MUSIC_SONG_SEEK_UPDATE" => {
                ServerEvent::MusicSongSeekUpdate(serde_json::from_value(data)?)
            }
            "MUSIC_SONG_VOLUME_UPDATE" => {
                ServerEvent::MusicSongVolumeUpdate(serde_json::from_value(data)?)
            }
            "MUSIC_SYNC" => ServerEvent::MusicSync(serde_json::from_value(data)?),
            _ => ServerEvent::Unknown(action),
        };
        Ok(event)
    }

    pub fn action(&self) -> &str {
        match self {
            ServerEvent::MusicConnect(_) => "MUSIC_CONNECT",
            ServerEvent::MusicLeave => "MUSIC_LEAVE",
            ServerEvent::MusicPrune(_) => "MUSIC_PRUNE",
            ServerEvent::MusicReplayUpdate(_) => "MUSIC_REPLAY_UPDATE",
            ServerEvent::MusicFinish => "MUSIC_FINISH",
            ServerEvent::MusicSongPause => "MUSIC_SONG_PAUSE",
            ServerEvent::MusicSongResume => "MUSIC_SONG_RESUME",
            ServerEvent::MusicSongSeekUpdate(_) => "MUSIC_SONG_SEEK_UPDATE",
            ServerEvent::MusicSongVolumeUpdate(_) => "MUSIC_SONG_VOLUME_UPDATE",
            ServerEvent::MusicSync(_) => "MUSIC_SYNC",
            ServerEvent::Unknown(action) => action,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionName {
    Music,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MusicAction {
    SkipSong,
    PauseSong,
    ResumePlaying,
}

/// Messages sent from the dashboard to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    SubscriptionUpdate {
        subscription_name: SubscriptionName,
        subscription_action: SubscriptionAction,
        guild_id: String,
    },
    MusicQueueUpdate {
        guild_id: String,
        music_action: MusicAction,
    },
}

impl ClientMessage {
    pub fn subscribe(guild_id: &str) -> Self {
        ClientMessage::SubscriptionUpdate {
            subscription_name: SubscriptionName::Music,
            subscription_action: SubscriptionAction::Subscribe,
            guild_id: guild_id.to_string(),
        }
    }

    pub fn queue_update(guild_id: &str, music_action: MusicAction) -> Self {
        ClientMessage::MusicQueueUpdate {
            guild_id: guild_id.to_string(),
            music_action,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::SubscriptionUpdate { .. } => "SUBSCRIPTION_UPDATE",
            ClientMessage::MusicQueueUpdate { .. } => "MUSIC_QUEUE_UPDATE",
        }
    }
}
