//! Error types for cuebox-engine
//!
//! Two layers:
//! - `Error`: failures of the engine process itself (config, I/O, the engine
//!   task having shut down). These propagate with `?`.
//! - `PlaybackError`: per-cue playback failures. These never propagate to the
//!   caller; the engine reports them through the status sink and cleans up.

use serde::Serialize;
use thiserror::Error;

/// Main error type for cuebox-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from cuebox-common
    #[error(transparent)]
    Common(#[from] cuebox_common::Error),

    /// Engine task is no longer running (shut down or panicked)
    #[error("Playback engine is not running")]
    EngineUnavailable,

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience Result type using cuebox-engine Error
pub type Result<T> = std::result::Result<T, Error>;

/// Per-cue playback failure
///
/// Each variant maps to a stable machine-readable reason string carried in the
/// status event sent for the failing cue.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum PlaybackError {
    /// Cue has no identity, or could not be resolved
    #[error("Invalid cue: {0}")]
    InvalidCue(String),

    /// Single cue or playlist item without a file reference
    #[error("No file path for {0}")]
    NoFilePath(String),

    /// File reference is syntactically unusable
    #[error("Invalid file path format: {0}")]
    InvalidFilePathFormat(String),

    /// File reference does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Playlist cue with no items
    #[error("Playlist has no items")]
    EmptyPlaylist,

    /// Audio engine declined to create a handle
    #[error("Sound creation failed: {0}")]
    SoundCreationFailed(String),

    /// Audio engine failed unexpectedly while creating a handle
    #[error("Playback setup failed: {0}")]
    PlaybackSetupException(String),

    /// A playlist item failed; wraps the item-level cause
    #[error("Playlist item failed: {0}")]
    PlaylistPlaybackError(Box<PlaybackError>),

    /// Logical index outside the active playlist order
    #[error("Invalid playlist index {index} (length {len})")]
    InvalidPlaylistIndex { index: usize, len: usize },
}

impl PlaybackError {
    /// Stable reason string for status payloads
    pub fn reason(&self) -> &'static str {
        match self {
            PlaybackError::InvalidCue(_) => "invalid_cue",
            PlaybackError::NoFilePath(_) => "no_file_path",
            PlaybackError::InvalidFilePathFormat(_) => "invalid_file_path_format",
            PlaybackError::FileNotFound(_) => "file_not_found",
            PlaybackError::EmptyPlaylist => "empty_playlist",
            PlaybackError::SoundCreationFailed(_) => "sound_creation_failed",
            PlaybackError::PlaybackSetupException(_) => "playback_setup_exception",
            PlaybackError::PlaylistPlaybackError(_) => "playlist_playback_error",
            PlaybackError::InvalidPlaylistIndex { .. } => "invalid_playlist_index",
        }
    }

    /// Wrap an item-level failure as a playlist failure (idempotent)
    pub fn into_playlist_error(self) -> Self {
        match self {
            PlaybackError::PlaylistPlaybackError(_) => self,
            other => PlaybackError::PlaylistPlaybackError(Box::new(other)),
        }
    }
}
