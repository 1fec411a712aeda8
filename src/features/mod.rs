//! Feature extraction stages
//!
//! - Pitch tracking (McLeod estimator over framed windows)
//! - Note segmentation (masking, voiced groups, histogram steps)
//! - Key estimation and pitch spelling
//! - Rhythm quantization

pub mod key;
pub mod pitch;
pub mod rhythm;
pub mod steps;
