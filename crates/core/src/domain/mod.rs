//! Domain entities and business rules

pub mod config;
pub mod dsp;
pub mod ogg;
pub mod pcm;

// Re-export specific items to avoid ambiguous glob imports
pub use config::{ConfigError, FilterKind, FilterSettings, NodeConfig};
pub use dsp::{
    ChannelMix, ChannelMixParams, Distortion, DistortionParams, Equalizer, EqualizerParams,
    Filter, FilterChain, FilterStage, Karaoke, KaraokeParams, LowPass, LowPassParams, Rotation,
    RotationParams, Tremolo, TremoloParams, Vibrato, VibratoParams, BAND_COUNT,
};
pub use ogg::{OggError, OggWriter, OpusHead, OpusTags};
