// transport.rs
//! Socket seam between the sync client and the network.

use crate::error::AppError;
use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future, stream};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

pub type TextSink = Pin<Box<dyn Sink<String, Error = AppError> + Send>>;
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

/// An open socket carrying JSON text frames.
pub struct Socket {
    pub sink: TextSink,
    pub stream: TextStream,
}

#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Socket, AppError>;
}

pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Socket, AppError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = ws.split();

        let sink = sink
            .with(|text: String| future::ready(Ok::<_, WsError>(Message::text(text))))
            .sink_map_err(AppError::from);

        let stream = stream.filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => String::from_utf8(bytes.to_vec()).ok().map(Ok),
                Ok(_) => None,
                Err(e) => Some(Err(AppError::from(e))),
            })
        });

        Ok(Socket {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

/// Builds a socket out of two channels: frames written to the socket arrive on
/// the returned receiver, frames sent on the returned sender are read from it.
pub fn channel_socket() -> (
    Socket,
    mpsc::UnboundedReceiver<String>,
    mpsc::UnboundedSender<String>,
) {
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

    let sink = futures_util::sink::unfold(out_tx, |tx, text: String| async move {
        tx.send(text).map_err(|_| AppError::ConnectionClosed)?;
        Ok::<_, AppError>(tx)
    });
    let stream = stream::unfold(in_rx, |mut rx| async move {
        rx.recv().await.map(|text| (Ok::<_, AppError>(text), rx))
    });

    (
        Socket {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        },
        out_rx,
        in_tx,
    )
}
