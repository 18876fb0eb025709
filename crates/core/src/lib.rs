//! Minstrel core: the audio engine of a voice streaming node
//!
//! This crate owns the two numerically sensitive pieces of the node:
//! the runtime-configurable DSP filter chain over interleaved s16le stereo
//! PCM, and the Ogg logical-bitstream muxer that packages Opus packets for
//! transport. The control plane, source resolution and the decode/encode
//! subprocess are external collaborators and feed this crate through plain
//! byte buffers.

pub mod domain;

pub use domain::config::{ConfigError, FilterSettings, NodeConfig};
pub use domain::dsp::{Filter, FilterChain, FilterStage};
pub use domain::ogg::{OggError, OggWriter, OpusHead, OpusTags};
