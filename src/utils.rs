// utils.rs
use crate::{error::AppError, metrics, models::ClientMessage, transport::TextSink};
use futures_util::SinkExt;
use tracing::debug;

pub async fn send_message(sink: &mut TextSink, message: &ClientMessage) -> Result<(), AppError> {
    let text = serde_json::to_string(message)?;
    sink.send(text).await?;
    metrics::command_sent(message.action());
    debug!(action = message.action(), "Sent message");
    Ok(())
}
