//! Playback engine: the single active player handle, the transport state
//! machine, shuffle/repeat policy and auto-advance.
//!
//! All playback state lives on a dedicated thread fed by an `mpsc` command
//! channel; the receive timeout doubles as the periodic progress tick.
//! Outside observers read the shared [`TransportInfo`] handle and the event
//! channels, never the player handle itself.

mod engine;
mod output;
mod player;
mod types;

pub use output::RodioBackend;
pub use player::PlaybackEngine;
pub use types::{
    BackendFactory, EngineCmd, PlayerBackend, PlayerHandle, RepeatMode, TransportHandle,
    TransportInfo, TransportRestore,
};
