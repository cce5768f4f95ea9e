/// Result alias that carries the crate [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the player core.
///
/// Only [`Error::InvalidArgument`] is ever surfaced across the command
/// boundary; the remaining variants circulate between the internal
/// subsystems (import, playback, metadata) which contain and log them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument failed validation (blank playlist name,
    /// empty path, duplicate playlist name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// No usable audio output device.
    #[error("audio output unavailable: {0}")]
    AudioOutput(String),
    /// A track could not be opened or decoded for playback.
    #[error("unplayable track {path}: {reason}")]
    Unplayable {
        path: std::path::PathBuf,
        reason: String,
    },
    /// Tag extraction failed.
    #[error(transparent)]
    Metadata(#[from] lofty::error::LoftyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates an [`Error::InvalidArgument`] from any message.
    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
