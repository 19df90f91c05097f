//! Wav reconstruction, decoding and resampling.

pub mod decoder;
pub mod materializer;

pub use materializer::{AudioMaterializer, Waveform, is_silent, normalize};
