// client/mod.rs
//! Keeps a [`PlaybackState`] in sync with the music server for one guild at a time.

use crate::{
    error::AppError,
    metrics,
    models::{ClientMessage, MusicAction, ServerEvent},
    playback::{ConnectionStatus, PlaybackState},
    transport::{Connector, Socket, WebSocketConnector},
    utils,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// State shared between the client and its connection task.
struct Shared {
    state: watch::Sender<PlaybackState>,
    /// Bumped on every connect/disconnect. A task only writes while its
    /// generation is still the current one.
    generation: AtomicU64,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Parses one inbound frame and reduces it into the state. Malformed frames
    /// are logged and dropped. Returns whether the state changed.
    fn apply_frame(&self, generation: u64, raw: &str) -> bool {
        let event = match ServerEvent::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed music message: {}", e);
                metrics::event_malformed();
                return false;
            }
        };

        match &event {
            ServerEvent::Unknown(_) => metrics::event_ignored(),
            known => metrics::event_received(known.action()),
        }

        self.state
            .send_if_modified(|state| self.is_current(generation) && state.apply(&event))
    }

    fn set_connection(&self, generation: u64, status: ConnectionStatus) {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) || state.connection == status {
                return false;
            }
            state.connection = status;
            true
        });
    }
}

/// One socket to the music server, scoped to a guild. Dropping it stops the
/// socket task.
struct Connection {
    id: Uuid,
    guild_id: String,
    commands: mpsc::UnboundedSender<ClientMessage>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Connection {
    async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if tokio::time::timeout(CLOSE_TIMEOUT, &mut self.task).await.is_err() {
            warn!(connection = %self.id, "Socket did not close in time, aborting");
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct MusicSyncClient<C: Connector = WebSocketConnector> {
    connector: Arc<C>,
    url: String,
    shared: Arc<Shared>,
    connection: Option<Connection>,
}

impl MusicSyncClient<WebSocketConnector> {
    pub fn websocket(url: impl Into<String>) -> Self {
        Self::new(WebSocketConnector, url)
    }
}

impl<C: Connector> MusicSyncClient<C> {
    pub fn new(connector: C, url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(PlaybackState::default());
        Self {
            connector: Arc::new(connector),
            url: url.into(),
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
            }),
            connection: None,
        }
    }

    /// Receiver notified on every change of the playback state.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.shared.state.borrow().clone()
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.guild_id.as_str())
    }

    /// Opens a socket for `guild_id` and subscribes to its music events.
    ///
    /// Replaces the connection to any other guild and resets the state. Calling
    /// it again for the guild that is already connected does nothing.
    pub fn connect(&mut self, guild_id: &str) {
        if let Some(current) = &self.connection {
            if current.guild_id == guild_id && !current.task.is_finished() {
                debug!(guild = %guild_id, "Already connected");
                return;
            }
        }

        // Drops the previous connection, if any, which stops its task.
        self.connection = None;

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.state.send_modify(|state| {
            state.reset();
            state.connection = ConnectionStatus::Connecting;
        });

        let id = Uuid::new_v4();
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();

        info!(connection = %id, guild = %guild_id, "Connecting to music server");
        let task = tokio::spawn(run_connection(
            Arc::clone(&self.connector),
            self.url.clone(),
            guild_id.to_string(),
            id,
            generation,
            Arc::clone(&self.shared),
            commands_rx,
            shutdown_rx,
        ));

        self.connection = Some(Connection {
            id,
            guild_id: guild_id.to_string(),
            commands,
            shutdown: Some(shutdown),
            task,
        });
    }

    /// Closes the current socket, if any. Messages still in flight are discarded.
    pub async fn disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.set_connection(generation, ConnectionStatus::Closed);
        connection.close().await;
    }

    /// Feeds one raw frame through the reducer as if the current socket had
    /// received it.
    pub fn on_message(&self, raw: &str) -> bool {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.shared.apply_frame(generation, raw)
    }

    pub fn skip(&self) -> Result<(), AppError> {
        self.queue_update(MusicAction::SkipSong)
    }

    pub fn pause(&self) -> Result<(), AppError> {
        self.queue_update(MusicAction::PauseSong)
    }

    pub fn resume(&self) -> Result<(), AppError> {
        self.queue_update(MusicAction::ResumePlaying)
    }

    /// The local player finished loading and started the current track.
    pub fn player_ready(&self) -> bool {
        self.shared.state.send_if_modified(PlaybackState::player_ready)
    }

    // Fire and forget: the state only changes once the server echoes an event.
    fn queue_update(&self, action: MusicAction) -> Result<(), AppError> {
        let connection = self.connection.as_ref().ok_or(AppError::NotConnected)?;
        connection
            .commands
            .send(ClientMessage::queue_update(&connection.guild_id, action))
            .map_err(|_| AppError::NotConnected)
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_connection<C: Connector>(
    connector: Arc<C>,
    url: String,
    guild_id: String,
    id: Uuid,
    generation: u64,
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<ClientMessage>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let socket = tokio::select! {
        result = connector.connect(&url) => result,
        _ = &mut shutdown => return,
    };

    let Socket {
        mut sink,
        mut stream,
    } = match socket {
        Ok(socket) => socket,
        Err(e) => {
            error!(connection = %id, "Failed to connect to {}: {}", url, e);
            shared.set_connection(generation, ConnectionStatus::Closed);
            return;
        }
    };

    shared.set_connection(generation, ConnectionStatus::Open);
    metrics::connection_opened();

    if let Err(e) = utils::send_message(&mut sink, &ClientMessage::subscribe(&guild_id)).await {
        error!(connection = %id, "Failed to subscribe: {}", e);
        shared.set_connection(generation, ConnectionStatus::Closed);
        return;
    }
    info!(connection = %id, guild = %guild_id, "Subscribed to music events");

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    shared.apply_frame(generation, &text);
                }
                Some(Err(e)) => {
                    error!(connection = %id, "Socket error: {}", e);
                    break;
                }
                None => {
                    info!(connection = %id, "Socket closed by server");
                    break;
                }
            },
            command = commands.recv() => match command {
                Some(message) => {
                    if let Err(e) = utils::send_message(&mut sink, &message).await {
                        error!(connection = %id, "Failed to send {}: {}", message.action(), e);
                        break;
                    }
                }
                None => break,
            },
            _ = &mut shutdown => {
                if let Err(e) = sink.close().await {
                    debug!(connection = %id, "Error while closing socket: {}", e);
                }
                break;
            }
        }
    }

    shared.set_connection(generation, ConnectionStatus::Closed);
    info!("Connection {} for guild {} closed", id, guild_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::MusicStatus;
    use crate::transport::channel_socket;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct TestConnector {
        sockets: Mutex<VecDeque<Socket>>,
    }

    impl TestConnector {
        fn new(sockets: Vec<Socket>) -> Self {
            Self {
                sockets: Mutex::new(sockets.into()),
            }
        }
    }

    #[async_trait]
    impl Connector for TestConnector {
        async fn connect(&self, _url: &str) -> Result<Socket, AppError> {
            self.sockets
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(AppError::ConnectionClosed)
        }
    }

    async fn next_sent(sent: &mut mpsc::UnboundedReceiver<String>) -> Value {
        let text = tokio::time::timeout(Duration::from_secs(2), sent.recv())
            .await
            .expect("timed out waiting for an outbound message")
            .expect("socket closed");
        serde_json::from_str(&text).unwrap()
    }

    async fn closed_within(sent: &mut mpsc::UnboundedReceiver<String>) {
        let frame = tokio::time::timeout(Duration::from_secs(2), sent.recv())
            .await
            .expect("timed out waiting for the socket to close");
        assert_eq!(frame, None);
    }

    async fn wait_for(
        rx: &mut watch::Receiver<PlaybackState>,
        predicate: impl FnMut(&PlaybackState) -> bool,
    ) -> PlaybackState {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for state")
            .expect("state sender dropped")
            .clone()
    }

    fn subscribe_json(guild_id: &str) -> Value {
        json!({
            "action": "SUBSCRIPTION_UPDATE",
            "data": {
                "subscription_name": "MUSIC",
                "subscription_action": "SUBSCRIBE",
                "guild_id": guild_id
            }
        })
    }

    #[tokio::test]
    async fn subscribes_on_open_and_mirrors_events() {
        let (socket, mut sent, inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        let mut rx = client.subscribe();

        client.connect("254360814063058944");
        assert_eq!(next_sent(&mut sent).await, subscribe_json("254360814063058944"));
        wait_for(&mut rx, |s| s.connection == ConnectionStatus::Open).await;

        inbound
            .send(json!({"action": "MUSIC_CONNECT", "data": {"voiceChannel": "555"}}).to_string())
            .unwrap();
        inbound
            .send(json!({"action": "MUSIC_SYNC", "data": {"volume": 42}}).to_string())
            .unwrap();

        let state = wait_for(&mut rx, |s| s.volume == 42).await;
        assert_eq!(state.voice_channel.as_deref(), Some("555"));
        assert!(state.queue.is_empty());
    }

    #[tokio::test]
    async fn skip_sends_one_command_and_leaves_status_alone() {
        let (socket, mut sent, _inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        client.connect("1");
        next_sent(&mut sent).await;

        client.skip().unwrap();
        assert_eq!(
            next_sent(&mut sent).await,
            json!({
                "action": "MUSIC_QUEUE_UPDATE",
                "data": {"guild_id": "1", "music_action": "SKIP_SONG"}
            })
        );
        assert!(sent.try_recv().is_err());
        assert_eq!(client.snapshot().status, MusicStatus::Instantiated);
    }

    #[tokio::test]
    async fn pause_and_resume_wait_for_the_server_echo() {
        let (socket, mut sent, inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        let mut rx = client.subscribe();
        client.connect("1");
        next_sent(&mut sent).await;
        assert!(client.player_ready());

        client.pause().unwrap();
        assert_eq!(next_sent(&mut sent).await["data"]["music_action"], "PAUSE_SONG");
        assert_eq!(client.snapshot().status, MusicStatus::Playing);

        inbound.send(r#"{"action":"MUSIC_SONG_PAUSE"}"#.to_string()).unwrap();
        wait_for(&mut rx, |s| s.status == MusicStatus::Paused).await;

        client.resume().unwrap();
        assert_eq!(next_sent(&mut sent).await["data"]["music_action"], "RESUME_PLAYING");
    }

    #[tokio::test]
    async fn commands_require_a_connection() {
        let client = MusicSyncClient::new(TestConnector::new(vec![]), "ws://test");
        assert!(matches!(client.skip(), Err(AppError::NotConnected)));
        assert!(matches!(client.pause(), Err(AppError::NotConnected)));
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let (socket, mut sent, inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        let mut rx = client.subscribe();
        client.connect("1");
        next_sent(&mut sent).await;

        inbound.send("{not json".to_string()).unwrap();
        inbound
            .send(r#"{"action":"MUSIC_SONG_VOLUME_UPDATE","data":{"volume":"loud"}}"#.to_string())
            .unwrap();
        inbound
            .send(r#"{"action":"MUSIC_REPLAY_UPDATE","data":{"replay":true}}"#.to_string())
            .unwrap();

        let state = wait_for(&mut rx, |s| s.replay).await;
        assert_eq!(state.volume, 0);
        assert_eq!(state.connection, ConnectionStatus::Open);
    }

    #[tokio::test]
    async fn unknown_actions_leave_state_untouched() {
        let client = MusicSyncClient::new(TestConnector::new(vec![]), "ws://test");
        client.on_message(r#"{"action":"MUSIC_SYNC","data":{"volume":30,"voiceChannel":"9"}}"#);
        let before = client.snapshot();

        assert!(!client.on_message(r#"{"action":"MUSIC_KARAOKE","data":{"lyrics":"la"}}"#));
        assert_eq!(client.snapshot(), before);
    }

    #[tokio::test]
    async fn guild_switch_discards_the_old_socket() {
        let (first, mut first_sent, first_inbound) = channel_socket();
        let (second, mut second_sent, _second_inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![first, second]), "ws://test");
        let mut rx = client.subscribe();

        client.connect("1");
        next_sent(&mut first_sent).await;
        first_inbound
            .send(json!({"action": "MUSIC_SYNC", "data": {"volume": 15}}).to_string())
            .unwrap();
        wait_for(&mut rx, |s| s.volume == 15).await;
        let old_generation = client.shared.generation.load(Ordering::SeqCst);

        client.connect("2");
        assert_eq!(client.guild_id(), Some("2"));
        assert_eq!(next_sent(&mut second_sent).await, subscribe_json("2"));
        assert_eq!(client.snapshot().volume, 0);

        // The first socket is torn down with its task.
        closed_within(&mut first_sent).await;
        let late = r#"{"action":"MUSIC_SONG_VOLUME_UPDATE","data":{"volume":99}}"#;
        assert!(first_inbound.send(late.to_string()).is_err());

        // A frame from the first socket that was still in flight.
        assert!(!client.shared.apply_frame(old_generation, late));
        assert_eq!(client.snapshot().volume, 0);
    }

    #[tokio::test]
    async fn dropping_the_client_closes_the_socket() {
        let (socket, mut sent, inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        client.connect("1");
        next_sent(&mut sent).await;

        drop(client);
        closed_within(&mut sent).await;
        assert!(inbound.send(r#"{"action":"MUSIC_LEAVE"}"#.to_string()).is_err());
    }

    #[tokio::test]
    async fn reconnecting_to_the_same_guild_is_a_no_op() {
        let (socket, mut sent, _inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        client.connect("1");
        next_sent(&mut sent).await;

        client.connect("1");
        assert!(sent.try_recv().is_err());
        assert_eq!(client.guild_id(), Some("1"));
    }

    #[tokio::test]
    async fn server_close_marks_connection_closed() {
        let (socket, mut sent, inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        let mut rx = client.subscribe();
        client.connect("1");
        next_sent(&mut sent).await;

        drop(inbound);
        wait_for(&mut rx, |s| s.connection == ConnectionStatus::Closed).await;
    }

    #[tokio::test]
    async fn failed_connect_marks_connection_closed() {
        let mut client = MusicSyncClient::new(TestConnector::new(vec![]), "ws://test");
        let mut rx = client.subscribe();
        client.connect("1");
        wait_for(&mut rx, |s| s.connection == ConnectionStatus::Closed).await;
    }

    #[tokio::test]
    async fn disconnect_closes_the_socket() {
        let (socket, mut sent, _inbound) = channel_socket();
        let mut client = MusicSyncClient::new(TestConnector::new(vec![socket]), "ws://test");
        client.connect("1");
        next_sent(&mut sent).await;

        client.disconnect().await;
        assert_eq!(client.snapshot().connection, ConnectionStatus::Closed);
        assert_eq!(client.guild_id(), None);
        assert!(matches!(client.skip(), Err(AppError::NotConnected)));
        // The sink side of the socket is gone once the task finished.
        assert!(sent.recv().await.is_none());
    }
}
