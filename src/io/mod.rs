//! Audio I/O modules
//!
//! Audio sources (in-memory and Symphonia-decoded files), window framing
//! and the persisted JSON records exchanged between pipeline stages.

pub mod decoder;
pub mod memory;
pub mod records;
pub mod sample_buffer;
pub mod source;

pub use decoder::{decode_file, decode_file_with};
pub use memory::MemorySource;
pub use source::{AudioSource, StreamInfo};
