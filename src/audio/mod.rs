pub mod chunk;
pub mod encoding;
pub mod file;
pub mod frame;

pub use chunk::{split_frames, ChunkConfig};
pub use encoding::AudioEncoding;
pub use file::{AudioUpload, FileValidator};
pub use frame::AudioFrame;
