// lib.rs
pub mod client;
pub mod color;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod playback;
pub mod session;
pub mod transport;
pub mod utils;

pub use client::MusicSyncClient;
pub use error::{AppError, ColorError};
pub use playback::{ConnectionStatus, MusicStatus, PlaybackState};
