//! Audio preprocessing used by the audio sources
//!
//! - Channel mixing (multichannel to mono)
//! - Linear resampling

pub mod channel_mixer;
pub mod resample;
