//! # Audio Toolkit
//!
//! Decoding, encoding, level management, mixing and resampling primitives
//! shared by the pipeline stages. Everything operates on mono f32 PCM
//! buffers in the [-1.0, 1.0] range.

pub mod format;
pub mod level;
pub mod mix;
pub mod resample;
