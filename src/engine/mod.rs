//! Retrieval engine integration
//!
//! The core abstraction is the [`Engine`] trait: one async call per item that
//! streams typed progress events and returns sanitized metadata or a
//! classified [`crate::EngineError`].
//!
//! - [`YtDlpEngine`]: drives the external `yt-dlp` binary
//!
//! Engines can also describe a URL without downloading it: [`MediaInfo`] for
//! a single item, [`PlaylistInfo`] for a playlist expanded into entries.
//!
//! Raw engine payloads are wrapped into [`EngineEvent`] inside this module;
//! nothing untyped crosses into the rest of the crate.

pub mod args;
mod events;
pub mod info;
pub mod parser;
mod traits;
mod ytdlp;

pub use events::{
    EngineEvent, EventSink, PostProcessEvent, PostProcessPhase, RawFields, TransferEvent,
    TransferPhase,
};
pub use info::{AudioFormat, FormatSummary, MediaInfo, PlaylistEntry, PlaylistInfo, VideoFormat};
pub use traits::Engine;
pub use ytdlp::YtDlpEngine;
