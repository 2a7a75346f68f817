//! File transcription
//!
//! - `SyncTranscriber`: one unary recognize call per upload
//! - `UploadStreamer`: replays an upload through a streaming mediator

mod sync;
mod upload_stream;

pub use sync::{aggregate, SyncTranscriber, TranscriptionResult};
pub use upload_stream::UploadStreamer;
