//! Core of a local-library music player.
//!
//! The crate owns the set of known tracks, the currently playing item,
//! transport state (play/pause/seek/shuffle/repeat/volume), filtering and
//! sorting of the visible track list, playlist membership and a background
//! spectrum-analysis pipeline for visualizers. Rendering, OS media
//! discovery and state-file I/O are left to the embedding application,
//! which drives the [`Controller`] with commands and observes the typed
//! event channels on [`events::EventHub`].

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod import;
pub mod library;
pub mod metadata;
pub mod playlist;
pub mod spectrum;
pub mod state;
pub mod view;

pub use controller::Controller;
pub use error::{Error, Result};
