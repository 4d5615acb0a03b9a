// session.rs
//! The signed-in user and their guilds, persisted between runs.

use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info, warn};

const CDN_URL: &str = "https://cdn.discordapp.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedUser {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub avatar: Option<String>,
}

impl FlattenedUser {
    pub fn avatar_url(&self, size: u16) -> String {
        match &self.avatar {
            Some(hash) => {
                let format = if hash.starts_with("a_") { "gif" } else { "png" };
                format!("{CDN_URL}/avatars/{}/{hash}.{format}?size={size}", self.id)
            }
            None => {
                let index = self.discriminator.parse::<u32>().unwrap_or(0) % 5;
                format!("{CDN_URL}/embed/avatars/{index}.png")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedGuild {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordPack {
    pub user: FlattenedUser,
    #[serde(default)]
    pub guilds: Vec<FlattenedGuild>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub authenticated: bool,
    pub pack: Option<DiscordPack>,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Explicit session state: loaded once at start-up, passed to whoever needs it
/// and cleared on logout.
#[derive(Debug)]
pub struct AppSession {
    path: PathBuf,
    session: Session,
}

impl AppSession {
    /// Reads the persisted session. A missing or unreadable file starts signed out.
    pub async fn init(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let session = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), "Discarding corrupt session file: {}", e);
                Session::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Session::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.authenticated
    }

    pub fn guild(&self, guild_id: &str) -> Option<&FlattenedGuild> {
        self.session
            .pack
            .as_ref()
            .and_then(|pack| pack.guilds.iter().find(|g| g.id == guild_id))
    }

    /// Stores a freshly fetched pack and marks the session authenticated.
    pub async fn login(&mut self, pack: DiscordPack, now: DateTime<Utc>) -> Result<(), AppError> {
        info!(user = %pack.user.username, guilds = pack.guilds.len(), "Session started");
        self.session = Session {
            authenticated: true,
            pack: Some(pack),
            last_sync: Some(now),
        };
        self.save().await
    }

    pub async fn logout(&mut self) -> Result<(), AppError> {
        self.session = Session::default();
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!("Session cleared");
        Ok(())
    }

    pub fn needs_sync(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.session.last_sync {
            Some(last) => now - last > max_age,
            None => self.session.authenticated,
        }
    }

    /// Maps a backend response status. A 401 signs the user out.
    pub async fn handle_api_status(&mut self, status: u16) -> Result<(), AppError> {
        match status {
            200..=299 => Ok(()),
            401 => {
                warn!("Backend rejected the session, signing out");
                self.logout().await?;
                Err(AppError::Unauthorized)
            }
            _ => {
                error!(status, "Backend request failed");
                Err(AppError::Api(status))
            }
        }
    }

    async fn save(&self) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(&self.session)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> DiscordPack {
        DiscordPack {
            user: FlattenedUser {
                id: "242043489611808769".into(),
                username: "kyra".into(),
                discriminator: "0001".into(),
                avatar: Some("a_1234".into()),
            },
            guilds: vec![FlattenedGuild {
                id: "254360814063058944".into(),
                name: "Skyra Lounge".into(),
                icon: None,
            }],
        }
    }

    #[tokio::test]
    async fn starts_signed_out_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let session = AppSession::init(dir.path().join("session.json")).await.unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.session(), &Session::default());
    }

    #[tokio::test]
    async fn login_persists_across_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let now = Utc::now();

        let mut session = AppSession::init(&path).await.unwrap();
        session.login(pack(), now).await.unwrap();

        let reloaded = AppSession::init(&path).await.unwrap();
        assert!(reloaded.is_authenticated());
        assert_eq!(reloaded.session().last_sync, Some(now));
        assert_eq!(reloaded.guild("254360814063058944").unwrap().name, "Skyra Lounge");
    }

    #[tokio::test]
    async fn unauthorized_clears_the_persisted_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut session = AppSession::init(&path).await.unwrap();
        session.login(pack(), Utc::now()).await.unwrap();

        assert!(session.handle_api_status(200).await.is_ok());
        assert!(matches!(session.handle_api_status(500).await, Err(AppError::Api(500))));
        assert!(session.is_authenticated());

        assert!(matches!(session.handle_api_status(401).await, Err(AppError::Unauthorized)));
        assert!(!session.is_authenticated());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn corrupt_file_starts_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"{oops").await.unwrap();
        assert!(!AppSession::init(&path).await.unwrap().is_authenticated());
    }

    #[tokio::test]
    async fn stale_sessions_need_sync() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = AppSession::init(dir.path().join("s.json")).await.unwrap();
        let then = Utc::now();
        session.login(pack(), then).await.unwrap();

        assert!(!session.needs_sync(then + Duration::seconds(30), Duration::minutes(1)));
        assert!(session.needs_sync(then + Duration::minutes(2), Duration::minutes(1)));
    }

    #[test]
    fn avatar_urls() {
        let user = pack().user;
        assert_eq!(
            user.avatar_url(256),
            "https://cdn.discordapp.com/avatars/242043489611808769/a_1234.gif?size=256"
        );

        let plain = FlattenedUser {
            avatar: None,
            discriminator: "0007".into(),
            ..user
        };
        assert_eq!(plain.avatar_url(128), "https://cdn.discordapp.com/embed/avatars/2.png");
    }
}
