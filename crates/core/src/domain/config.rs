//! Configuration for the filter engine
//!
//! Two layers, kept deliberately separate:
//! - [`NodeConfig`]: static, operator-owned TOML describing which filter
//!   kinds this node allows at all.
//! - [`FilterSettings`]: the per-session JSON payload the control plane
//!   sends when a player's filters change.
//!
//! A payload naming an unknown filter kind is rejected whole, before any
//! filter instance is built. A known sub-filter with missing or invalid
//! fields is dropped on its own, and the rest of the chain still applies.

use crate::domain::dsp::{
    self, ChannelMix, ChannelMixParams, Distortion, DistortionParams, Equalizer, EqualizerParams,
    Filter, FilterChain, Karaoke, KaraokeParams, LowPass, LowPassParams, Rotation, RotationParams,
    Tremolo, TremoloParams, Vibrato, VibratoParams, BAND_COUNT,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading or parsing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid filter payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

// ============================================================================
// STATIC NODE CONFIGURATION
// ============================================================================

/// The eight filter kinds, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    Equalizer,
    Karaoke,
    Tremolo,
    Vibrato,
    Rotation,
    Distortion,
    ChannelMix,
    LowPass,
}

impl FilterKind {
    /// Every kind, in the fixed chain order.
    pub const ALL: [FilterKind; 8] = [
        FilterKind::Equalizer,
        FilterKind::Karaoke,
        FilterKind::Tremolo,
        FilterKind::Vibrato,
        FilterKind::Rotation,
        FilterKind::Distortion,
        FilterKind::ChannelMix,
        FilterKind::LowPass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Equalizer => "equalizer",
            FilterKind::Karaoke => "karaoke",
            FilterKind::Tremolo => "tremolo",
            FilterKind::Vibrato => "vibrato",
            FilterKind::Rotation => "rotation",
            FilterKind::Distortion => "distortion",
            FilterKind::ChannelMix => "channelMix",
            FilterKind::LowPass => "lowPass",
        }
    }
}

/// Static node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// PCM sample rate the pipeline runs at
    pub sample_rate: u32,

    /// Samples per channel per 20 ms frame
    pub frame_size: usize,

    /// Filter kinds players may enable; requests for kinds not listed here
    /// are silently ignored
    pub enabled_filters: Vec<FilterKind>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::domain::pcm::SAMPLE_RATE,
            frame_size: crate::domain::pcm::FRAME_SIZE,
            enabled_filters: FilterKind::ALL.to_vec(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&content)?;
        debug!(path = %path.as_ref().display(), "node config loaded");
        Ok(config)
    }

    pub fn is_enabled(&self, kind: FilterKind) -> bool {
        self.enabled_filters.contains(&kind)
    }
}

// ============================================================================
// FILTER PAYLOAD (CONTROL PLANE JSON)
// ============================================================================

/// One equalizer band adjustment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EqualizerBandSetting {
    pub band: Option<i64>,
    pub gain: Option<f64>,
}

/// Karaoke sub-filter payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KaraokeSettings {
    pub level: Option<f64>,
    pub mono_level: Option<f64>,
    pub filter_band: Option<f64>,
    pub filter_width: Option<f64>,
}

/// Tremolo sub-filter payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TremoloSettings {
    pub frequency: Option<f64>,
    pub depth: Option<f64>,
}

/// Vibrato sub-filter payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VibratoSettings {
    pub frequency: Option<f64>,
    pub depth: Option<f64>,
}

/// Rotation sub-filter payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationSettings {
    pub rotation_hz: Option<f64>,
}

/// Distortion sub-filter payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistortionSettings {
    pub sin_offset: Option<f64>,
    pub sin_scale: Option<f64>,
    pub cos_offset: Option<f64>,
    pub cos_scale: Option<f64>,
    pub tan_offset: Option<f64>,
    pub tan_scale: Option<f64>,
    pub offset: Option<f64>,
    pub scale: Option<f64>,
}

/// Channel mix sub-filter payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMixSettings {
    pub left_to_left: Option<f64>,
    pub left_to_right: Option<f64>,
    pub right_to_left: Option<f64>,
    pub right_to_right: Option<f64>,
}

/// Low-pass sub-filter payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LowPassSettings {
    pub smoothing: Option<f64>,
}

/// The complete filter payload for one player.
///
/// Absent keys leave that filter inactive. An unknown top-level key is an
/// unknown filter kind and fails deserialization, rejecting the request
/// whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterSettings {
    pub equalizer: Option<Vec<EqualizerBandSetting>>,
    pub karaoke: Option<KaraokeSettings>,
    pub tremolo: Option<TremoloSettings>,
    pub vibrato: Option<VibratoSettings>,
    pub rotation: Option<RotationSettings>,
    pub distortion: Option<DistortionSettings>,
    pub channel_mix: Option<ChannelMixSettings>,
    pub low_pass: Option<LowPassSettings>,
}

impl FilterSettings {
    /// Parse a control-plane payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Build a fresh filter chain for this payload.
    ///
    /// Filters are instantiated in the fixed chain order. Sub-filters that
    /// fail validation are dropped with a warning; kinds disabled in the
    /// node config are ignored silently.
    pub fn build_chain(&self, config: &NodeConfig) -> FilterChain {
        let rate = config.sample_rate;
        let mut filters: Vec<Box<dyn Filter>> = Vec::new();

        if config.is_enabled(FilterKind::Equalizer) {
            if let Some(params) = self.equalizer.as_deref().and_then(validated_equalizer) {
                filters.push(Box::new(Equalizer::new(params)));
            }
        }
        if config.is_enabled(FilterKind::Karaoke) {
            if let Some(params) = self.karaoke.as_ref().and_then(|s| validated_karaoke(s, rate)) {
                filters.push(Box::new(Karaoke::new(params, rate)));
            }
        }
        if config.is_enabled(FilterKind::Tremolo) {
            if let Some(params) = self.tremolo.as_ref().and_then(validated_tremolo) {
                filters.push(Box::new(Tremolo::new(params, rate)));
            }
        }
        if config.is_enabled(FilterKind::Vibrato) {
            if let Some(params) = self.vibrato.as_ref().and_then(validated_vibrato) {
                filters.push(Box::new(Vibrato::new(params, rate)));
            }
        }
        if config.is_enabled(FilterKind::Rotation) {
            if let Some(params) = self.rotation.as_ref().and_then(validated_rotation) {
                filters.push(Box::new(Rotation::new(params, rate)));
            }
        }
        if config.is_enabled(FilterKind::Distortion) {
            if let Some(params) = self.distortion.as_ref().and_then(validated_distortion) {
                filters.push(Box::new(Distortion::new(params)));
            }
        }
        if config.is_enabled(FilterKind::ChannelMix) {
            if let Some(params) = self.channel_mix.as_ref().and_then(validated_channel_mix) {
                filters.push(Box::new(ChannelMix::new(params)));
            }
        }
        if config.is_enabled(FilterKind::LowPass) {
            if let Some(params) = self.low_pass.as_ref().and_then(validated_low_pass) {
                filters.push(Box::new(LowPass::new(params)));
            }
        }

        FilterChain::from_filters(filters)
    }
}

// ============================================================================
// SUB-FILTER VALIDATION
// ============================================================================

/// Pull a required field out of a sub-filter payload, rejecting the value
/// if it is absent or non-finite.
fn required(kind: FilterKind, field: &'static str, value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() => Some(v),
        Some(_) => {
            warn!(filter = kind.as_str(), field, "non-finite field, sub-filter dropped");
            None
        }
        None => {
            warn!(filter = kind.as_str(), field, "missing field, sub-filter dropped");
            None
        }
    }
}

fn validated_equalizer(bands: &[EqualizerBandSetting]) -> Option<EqualizerParams> {
    let mut gains = [0.0; BAND_COUNT];
    for setting in bands {
        let (Some(band), Some(gain)) = (setting.band, setting.gain) else {
            warn!(filter = "equalizer", "band entry missing fields, sub-filter dropped");
            return None;
        };
        if !(0..BAND_COUNT as i64).contains(&band) {
            warn!(filter = "equalizer", band, "band index out of range, sub-filter dropped");
            return None;
        }
        if !gain.is_finite() {
            warn!(filter = "equalizer", band, "non-finite gain, sub-filter dropped");
            return None;
        }
        gains[band as usize] = gain.clamp(dsp::params::GAIN_MIN, dsp::params::GAIN_MAX);
    }
    Some(EqualizerParams { gains })
}

fn validated_karaoke(settings: &KaraokeSettings, sample_rate: u32) -> Option<KaraokeParams> {
    let kind = FilterKind::Karaoke;
    let nyquist = sample_rate as f64 / 2.0;
    Some(KaraokeParams {
        level: required(kind, "level", settings.level)?.clamp(0.0, 1.0),
        mono_level: required(kind, "monoLevel", settings.mono_level)?.clamp(0.0, 1.0),
        filter_band: required(kind, "filterBand", settings.filter_band)?.clamp(0.0, nyquist),
        filter_width: required(kind, "filterWidth", settings.filter_width)?.max(0.0),
    })
}

fn validated_tremolo(settings: &TremoloSettings) -> Option<TremoloParams> {
    let kind = FilterKind::Tremolo;
    Some(TremoloParams {
        frequency: required(kind, "frequency", settings.frequency)?
            .clamp(dsp::params::LFO_FREQUENCY_MIN, dsp::params::LFO_FREQUENCY_MAX),
        depth: required(kind, "depth", settings.depth)?
            .clamp(dsp::params::DEPTH_MIN, dsp::params::DEPTH_MAX),
    })
}

fn validated_vibrato(settings: &VibratoSettings) -> Option<VibratoParams> {
    let kind = FilterKind::Vibrato;
    Some(VibratoParams {
        frequency: required(kind, "frequency", settings.frequency)?
            .clamp(dsp::params::LFO_FREQUENCY_MIN, dsp::params::LFO_FREQUENCY_MAX),
        depth: required(kind, "depth", settings.depth)?
            .clamp(dsp::params::DEPTH_MIN, dsp::params::DEPTH_MAX),
    })
}

fn validated_rotation(settings: &RotationSettings) -> Option<RotationParams> {
    Some(RotationParams {
        rotation_hz: required(FilterKind::Rotation, "rotationHz", settings.rotation_hz)?,
    })
}

fn validated_distortion(settings: &DistortionSettings) -> Option<DistortionParams> {
    let kind = FilterKind::Distortion;
    Some(DistortionParams {
        sin_offset: required(kind, "sinOffset", settings.sin_offset)?,
        sin_scale: required(kind, "sinScale", settings.sin_scale)?,
        cos_offset: required(kind, "cosOffset", settings.cos_offset)?,
        cos_scale: required(kind, "cosScale", settings.cos_scale)?,
        tan_offset: required(kind, "tanOffset", settings.tan_offset)?,
        tan_scale: required(kind, "tanScale", settings.tan_scale)?,
        offset: required(kind, "offset", settings.offset)?,
        scale: required(kind, "scale", settings.scale)?,
    })
}

fn validated_channel_mix(settings: &ChannelMixSettings) -> Option<ChannelMixParams> {
    let kind = FilterKind::ChannelMix;
    let clamp = |v: f64| v.clamp(dsp::params::MIX_MIN, dsp::params::MIX_MAX);
    Some(ChannelMixParams {
        left_to_left: clamp(required(kind, "leftToLeft", settings.left_to_left)?),
        left_to_right: clamp(required(kind, "leftToRight", settings.left_to_right)?),
        right_to_left: clamp(required(kind, "rightToLeft", settings.right_to_left)?),
        right_to_right: clamp(required(kind, "rightToRight", settings.right_to_right)?),
    })
}

fn validated_low_pass(settings: &LowPassSettings) -> Option<LowPassParams> {
    let smoothing = required(FilterKind::LowPass, "smoothing", settings.smoothing)?;
    if smoothing < dsp::params::SMOOTHING_MIN {
        warn!(filter = "lowPass", smoothing, "smoothing below 1, sub-filter dropped");
        return None;
    }
    Some(LowPassParams { smoothing })
}

// ============================================================================
// TESTS
// ============================================================================
