// main.rs
use music_dashboard::{
    MusicSyncClient, PlaybackState,
    config::{self, Settings},
    metrics,
    session::AppSession,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log.level)),
        )
        .init();

    if settings.metrics.enabled {
        metrics::setup_metrics(settings.metrics.port)?;
        info!("Metrics exposed on port {}", settings.metrics.port);
    }

    let mut session = AppSession::init(&settings.client.session_file).await?;

    let guild_id = std::env::args()
        .nth(1)
        .or_else(|| settings.client.guild_id.clone())
        .ok_or_else(|| anyhow::anyhow!("No guild id given on the command line or in the config"))?;
    if !config::is_snowflake(&guild_id) {
        anyhow::bail!("{} is not a valid guild id", guild_id);
    }

    let mut client = MusicSyncClient::websocket(&settings.server.ws_url);
    let mut state = client.subscribe();
    client.connect(&guild_id);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                let guild_name = client
                    .guild_id()
                    .and_then(|id| session.guild(id))
                    .map(|g| g.name.as_str());
                render(&snapshot, guild_name);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(line.trim(), &mut client, &mut session).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect().await;
    Ok(())
}

/// Returns `false` when the user asked to quit.
async fn handle_command(
    line: &str,
    client: &mut MusicSyncClient,
    session: &mut AppSession,
) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };

    let result = match command {
        "skip" | "pause" | "resume" if !session.is_authenticated() => {
            warn!("Sign in to the dashboard to control playback");
            Ok(())
        }
        "skip" => client.skip(),
        "pause" => client.pause(),
        "resume" => client.resume(),
        "ready" => {
            client.player_ready();
            Ok(())
        }
        "guild" => match parts.next() {
            Some(id) if config::is_snowflake(id) => {
                client.connect(id);
                Ok(())
            }
            _ => {
                warn!("Usage: guild <id>");
                Ok(())
            }
        },
        "logout" => session.logout().await,
        "quit" | "exit" => return Ok(false),
        other => {
            warn!("Unknown command {}", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!("{} failed: {}", command, e);
    }
    Ok(true)
}

fn render(state: &PlaybackState, guild_name: Option<&str>) {
    let guild = guild_name.unwrap_or("guild");
    match (&state.current_track, state.is_idle()) {
        (Some(track), false) => info!(
            status = ?state.status,
            position_ms = state.position,
            volume = state.volume,
            replay = state.replay,
            queued = state.queue.len(),
            "[{}] {} by {}",
            guild,
            track.display_title(),
            track.display_author(),
        ),
        _ => info!(
            connection = ?state.connection,
            queued = state.queue.len(),
            "[{}] Not Playing",
            guild
        ),
    }
}
