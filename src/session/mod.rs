//! Streaming session management
//!
//! This module provides:
//! - `StreamingMediator`: bridges one client audio stream to one recognizer call
//! - `SessionRegistry`: live duplex sessions keyed by id
//! - `SessionHandler`: transport callbacks wiring a socket to its mediator
//! - Transcript events and the frames sent back to clients

mod config;
mod events;
mod handler;
mod mediator;
mod registry;

pub use config::MediatorConfig;
pub use events::{demultiplex, MediatorState, SessionStats, TranscriptEvent, TranscriptFrame};
pub use handler::{SessionHandler, SpeechSessionHandler, TranscriptSink};
pub use mediator::{transcript_callback, StreamingMediator, TranscriptCallback};
pub use registry::{Session, SessionRegistry};
