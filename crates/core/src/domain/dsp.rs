//! Digital Signal Processing filters for the playback pipeline
//!
//! This module provides the in-process filter engine:
//! - Eight per-sample-pair filters (equalizer, karaoke, tremolo, vibrato,
//!   rotation, distortion, channel mix, low pass)
//! - A fixed-order [`FilterChain`] driving them over interleaved i16 PCM
//! - A byte-level [`FilterStage`] that keeps chunk boundaries sample-aligned
//!
//! All filters are designed for:
//! - Zero allocations in the hot path
//! - Strict in-order processing (every filter is a stateful recurrence)
//! - One owner per playback session; reconfiguring builds a fresh chain

pub mod delay;
pub mod lfo;

use crate::domain::pcm::{self, quantize, BYTES_PER_PAIR};
use delay::FractionalDelay;
use lfo::Lfo;
use std::f64::consts::TAU;
use tracing::debug;

/// Core trait for all audio filters
///
/// Filters transform one interleaved stereo sample pair at a time, in f64.
/// Quantization back to i16 (including the non-finite guard) is the chain's
/// job, so filters can hand intermediate values to each other at full
/// precision.
pub trait Filter: Send {
    /// Transform a single sample pair.
    fn process(&mut self, left: f64, right: f64) -> (f64, f64);

    /// Clear internal state back to initial conditions.
    fn reset(&mut self);

    /// Wire name of this filter kind, as used in configuration payloads.
    fn name(&self) -> &'static str;
}

/// Parameter constraints for the filter set
///
/// Soft ranges: values outside are clamped into these bounds during
/// validation. Hard constraints (band indices, low-pass smoothing) reject
/// the sub-filter instead; see the config layer.
pub mod params {
    /// Equalizer band gain range
    pub const GAIN_MIN: f64 = -0.25;
    pub const GAIN_MAX: f64 = 1.0;

    /// LFO-driven filter frequency range (Hz)
    pub const LFO_FREQUENCY_MIN: f64 = 0.0;
    pub const LFO_FREQUENCY_MAX: f64 = 14.0;

    /// Modulation depth range
    pub const DEPTH_MIN: f64 = 0.0;
    pub const DEPTH_MAX: f64 = 1.0;

    /// Channel mix coefficient range
    pub const MIX_MIN: f64 = 0.0;
    pub const MIX_MAX: f64 = 1.0;

    /// Minimum low-pass smoothing factor (divisor; below this is rejected)
    pub const SMOOTHING_MIN: f64 = 1.0;
}

// ============================================================================
// EQUALIZER
// ============================================================================

/// Number of equalizer bands
pub const BAND_COUNT: usize = 15;

/// Per-band IIR coefficient triple, fixed for 48 kHz.
#[derive(Debug, Clone, Copy)]
struct BandCoefficients {
    alpha: f64,
    beta: f64,
    gamma: f64,
}

const fn band(alpha: f64, beta: f64, gamma: f64) -> BandCoefficients {
    BandCoefficients { alpha, beta, gamma }
}

/// Precomputed 48 kHz coefficient table, band 0 (lowest) to 14 (highest).
const COEFFICIENTS: [BandCoefficients; BAND_COUNT] = [
    band(0.00076226668143, 0.99847546664, 1.9984647656),
    band(0.0012190767289, 0.99756184654, 1.9975344645),
    band(0.0019186931041, 0.99616261379, 1.9960947369),
    band(0.0030421072865, 0.99391578543, 1.9937449618),
    band(0.0048584639242, 0.99028307215, 1.9898465702),
    band(0.0075705136795, 0.98485897264, 1.9837962543),
    band(0.012057436715, 0.97588512657, 1.9731772447),
    band(0.018857390928, 0.96228521814, 1.9556164694),
    band(0.029595334338, 0.94080933132, 1.9242054384),
    band(0.046489704022, 0.90702059196, 1.8653476166),
    band(0.070659978553, 0.85868004289, 1.7600401337),
    band(0.10795194606, 0.78409610788, 1.5450725522),
    band(0.15833569499, 0.68332861002, 1.1426447155),
    band(0.22366240886, 0.55267518228, 0.40186190803),
    band(0.29094055777, 0.41811888447, -0.70905944223),
];

/// Equalizer parameters: one gain per band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerParams {
    pub gains: [f64; BAND_COUNT],
}

impl Default for EqualizerParams {
    fn default() -> Self {
        Self {
            gains: [0.0; BAND_COUNT],
        }
    }
}

/// Rolling recurrence history for one channel.
///
/// Layout: 6 slots per band, the first 3 holding input generations and the
/// last 3 holding output generations. A single modulo-3 counter replaces the
/// three separately-rotated indices of the original recurrence.
#[derive(Debug, Clone)]
struct EqualizerState {
    history: [f64; BAND_COUNT * 6],
    generation: usize,
}

impl EqualizerState {
    fn new() -> Self {
        Self {
            history: [0.0; BAND_COUNT * 6],
            generation: 0,
        }
    }

    #[inline]
    fn process(&mut self, sample: f64, gains: &[f64; BAND_COUNT]) -> f64 {
        let current = self.generation;
        let minus1 = (self.generation + 2) % 3;
        let minus2 = (self.generation + 1) % 3;

        let mut processed = sample * 0.25;
        for (band, coeffs) in COEFFICIENTS.iter().enumerate() {
            let x = band * 6;
            let y = x + 3;

            let band_out = coeffs.alpha * (sample - self.history[x + minus2])
                + coeffs.gamma * self.history[y + minus1]
                - coeffs.beta * self.history[y + minus2];

            self.history[x + current] = sample;
            self.history[y + current] = band_out;

            processed += band_out * gains[band];
        }

        self.generation = (self.generation + 1) % 3;
        processed * 4.0
    }

    fn reset(&mut self) {
        self.history = [0.0; BAND_COUNT * 6];
        self.generation = 0;
    }
}

/// 15-band equalizer over a fixed 48 kHz filter bank.
#[derive(Debug, Clone)]
pub struct Equalizer {
    gains: [f64; BAND_COUNT],
    left: EqualizerState,
    right: EqualizerState,
    coupled: bool,
}

impl Equalizer {
    /// Independent recurrence state per channel.
    pub fn new(params: EqualizerParams) -> Self {
        Self {
            gains: params.gains,
            left: EqualizerState::new(),
            right: EqualizerState::new(),
            coupled: false,
        }
    }

    /// Variant where both channels share one history, the right channel
    /// seeing state already advanced by the left within the same sample
    /// period. Matches the sequential-stereo behavior of older engines.
    pub fn coupled(params: EqualizerParams) -> Self {
        Self {
            coupled: true,
            ..Self::new(params)
        }
    }
}

impl Filter for Equalizer {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        if self.coupled {
            let l = self.left.process(left, &self.gains);
            let r = self.left.process(right, &self.gains);
            (l, r)
        } else {
            (
                self.left.process(left, &self.gains),
                self.right.process(right, &self.gains),
            )
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn name(&self) -> &'static str {
        "equalizer"
    }
}

// ============================================================================
// KARAOKE
// ============================================================================

/// Karaoke parameters: how much center-panned content to remove and the
/// band-pass region the removed signal is re-blended from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KaraokeParams {
    pub level: f64,
    pub mono_level: f64,
    pub filter_band: f64,
    pub filter_width: f64,
}

impl Default for KaraokeParams {
    fn default() -> Self {
        Self {
            level: 1.0,
            mono_level: 1.0,
            filter_band: 220.0,
            filter_width: 100.0,
        }
    }
}

/// Center-channel suppression, attenuating common-panned content (vocals).
#[derive(Debug, Clone)]
pub struct Karaoke {
    level: f64,
    mono_level: f64,
    // Band-pass recurrence coefficients, derived once from band/width.
    a: f64,
    b: f64,
    c: f64,
    y1: f64,
    y2: f64,
}

impl Karaoke {
    pub fn new(params: KaraokeParams, sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        let c = (-TAU * params.filter_width / rate).exp();
        let b = (-4.0 * c / (1.0 + c)) * (TAU * params.filter_band / rate).cos();
        let a = (1.0 - b * b / (4.0 * c)).sqrt() * (1.0 - c);
        Self {
            level: params.level,
            mono_level: params.mono_level,
            a,
            b,
            c,
            y1: 0.0,
            y2: 0.0,
        }
    }
}

impl Filter for Karaoke {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let mono = (left + right) * 0.5;
        let y = self.a * mono - self.b * self.y1 - self.c * self.y2;
        self.y2 = self.y1;
        self.y1 = y;

        let center = y * self.mono_level * self.level;
        (
            left - right * self.level + center,
            right - left * self.level + center,
        )
    }

    fn reset(&mut self) {
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    fn name(&self) -> &'static str {
        "karaoke"
    }
}

// ============================================================================
// TREMOLO
// ============================================================================

/// Tremolo parameters: oscillation rate and how deep the amplitude dips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TremoloParams {
    pub frequency: f64,
    pub depth: f64,
}

impl Default for TremoloParams {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            depth: 0.5,
        }
    }
}

/// Amplitude modulation; both channels share one envelope.
///
/// The envelope is phase-shifted a quarter cycle so it starts at its peak:
/// the first sample of a fresh tremolo passes through at full level.
#[derive(Debug, Clone)]
pub struct Tremolo {
    frequency: f64,
    offset: f64,
    phase: f64,
    period: f64,
    sample_rate: f64,
}

impl Tremolo {
    pub fn new(params: TremoloParams, sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        Self {
            frequency: params.frequency,
            offset: 1.0 - params.depth / 2.0,
            phase: 0.0,
            period: if params.frequency > 0.0 {
                rate / params.frequency
            } else {
                f64::INFINITY
            },
            sample_rate: rate,
        }
    }
}

impl Filter for Tremolo {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let env = (TAU * ((self.frequency * self.phase / self.sample_rate + 0.25) % 1.0)).sin();
        let multiplier = env * (1.0 - self.offset.abs()) + self.offset;

        self.phase += 1.0;
        if self.phase >= self.period {
            self.phase -= self.period;
        }

        (left * multiplier, right * multiplier)
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }

    fn name(&self) -> &'static str {
        "tremolo"
    }
}

// ============================================================================
// VIBRATO
// ============================================================================

/// Vibrato parameters: warble rate and depth of the pitch excursion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibratoParams {
    pub frequency: f64,
    pub depth: f64,
}

impl Default for VibratoParams {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            depth: 0.5,
        }
    }
}

/// Base modulated delay: 2 ms of history at the pipeline sample rate.
const VIBRATO_BASE_DELAY_SEC: f64 = 0.002;

/// Constant delay floor keeping the Hermite window behind the write head.
const VIBRATO_ADDITIONAL_DELAY: f64 = 3.0;

#[derive(Debug, Clone)]
struct VibratoChannel {
    lfo: Lfo,
    line: FractionalDelay,
}

impl VibratoChannel {
    fn new(frequency: f64, max_delay: usize, sample_rate: u32) -> Self {
        Self {
            lfo: Lfo::new(frequency, sample_rate),
            // One extra slot so the computed delay stays strictly below the
            // readable history even at full LFO swing.
            line: FractionalDelay::new(max_delay + VIBRATO_ADDITIONAL_DELAY as usize + 1),
        }
    }

    #[inline]
    fn process(&mut self, sample: f64, depth: f64, max_delay: f64) -> f64 {
        let value = self.lfo.advance();
        let delay = value * depth * max_delay + VIBRATO_ADDITIONAL_DELAY;
        // Read before write: the current sample must not be visible to its
        // own delayed read.
        let out = self.line.read_at(delay);
        self.line.write(sample);
        out
    }

    fn reset(&mut self) {
        self.lfo.reset();
        self.line.reset();
    }
}

/// Pitch warble via an LFO-modulated fractional delay.
#[derive(Debug, Clone)]
pub struct Vibrato {
    depth: f64,
    max_delay: f64,
    left: VibratoChannel,
    right: VibratoChannel,
    coupled: bool,
}

impl Vibrato {
    /// Independent LFO and delay line per channel.
    pub fn new(params: VibratoParams, sample_rate: u32) -> Self {
        let max_delay = (VIBRATO_BASE_DELAY_SEC * sample_rate as f64).ceil() as usize;
        Self {
            depth: params.depth,
            max_delay: max_delay as f64,
            left: VibratoChannel::new(params.frequency, max_delay, sample_rate),
            right: VibratoChannel::new(params.frequency, max_delay, sample_rate),
            coupled: false,
        }
    }

    /// Variant where both channels run through one LFO and one delay line,
    /// sequentially, matching the shared-state behavior of older engines.
    pub fn coupled(params: VibratoParams, sample_rate: u32) -> Self {
        Self {
            coupled: true,
            ..Self::new(params, sample_rate)
        }
    }
}

impl Filter for Vibrato {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        if self.coupled {
            let l = self.left.process(left, self.depth, self.max_delay);
            let r = self.left.process(right, self.depth, self.max_delay);
            (l, r)
        } else {
            (
                self.left.process(left, self.depth, self.max_delay),
                self.right.process(right, self.depth, self.max_delay),
            )
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn name(&self) -> &'static str {
        "vibrato"
    }
}

// ============================================================================
// ROTATION (AUTO-PAN)
// ============================================================================

/// Rotation parameters: how fast the audio circles the stereo field (Hz).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationParams {
    pub rotation_hz: f64,
}

/// Continuous sine auto-pan.
#[derive(Debug, Clone)]
pub struct Rotation {
    step: f64,
    x: f64,
}

impl Rotation {
    pub fn new(params: RotationParams, sample_rate: u32) -> Self {
        // samples_per_cycle = rate / (hz * 2π); zero rate means zero step,
        // never a division.
        let step = if params.rotation_hz == 0.0 {
            0.0
        } else {
            TAU * params.rotation_hz / sample_rate as f64
        };
        Self { step, x: 0.0 }
    }
}

impl Filter for Rotation {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        if self.step == 0.0 {
            return (left, right);
        }
        let sin = self.x.sin();
        self.x += self.step;
        (left * (sin + 1.0) * 0.5, right * (1.0 - sin) * 0.5)
    }

    fn reset(&mut self) {
        self.x = 0.0;
    }

    fn name(&self) -> &'static str {
        "rotation"
    }
}

// ============================================================================
// DISTORTION
// ============================================================================

/// Distortion parameters: trig waveshaping terms plus linear offset/scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionParams {
    pub sin_offset: f64,
    pub sin_scale: f64,
    pub cos_offset: f64,
    pub cos_scale: f64,
    pub tan_offset: f64,
    pub tan_scale: f64,
    pub offset: f64,
    pub scale: f64,
}

impl Default for DistortionParams {
    fn default() -> Self {
        Self {
            sin_offset: 0.0,
            sin_scale: 1.0,
            cos_offset: 0.0,
            cos_scale: 1.0,
            tan_offset: 0.0,
            tan_scale: 1.0,
            offset: 0.0,
            scale: 1.0,
        }
    }
}

/// Trigonometric waveshaper; channels are independent and stateless.
///
/// A scale of exactly 1 disables its trig term (forced to 1), so the default
/// parameter set reduces to `sample * (offset + scale)`.
#[derive(Debug, Clone)]
pub struct Distortion {
    params: DistortionParams,
}

impl Distortion {
    pub fn new(params: DistortionParams) -> Self {
        Self { params }
    }

    #[inline]
    fn shape(&self, sample: f64) -> f64 {
        let p = &self.params;
        let s1 = if p.sin_scale == 1.0 {
            1.0
        } else {
            p.sin_offset + (sample * p.sin_scale).sin()
        };
        let s2 = if p.cos_scale == 1.0 {
            1.0
        } else {
            p.cos_offset + (sample * p.cos_scale).cos()
        };
        let s3 = if p.tan_scale == 1.0 {
            1.0
        } else {
            p.tan_offset + (sample * p.tan_scale).tan()
        };
        sample * (p.offset + p.scale * s1 * s2 * s3)
    }
}

impl Filter for Distortion {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        (self.shape(left), self.shape(right))
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "distortion"
    }
}

// ============================================================================
// CHANNEL MIX
// ============================================================================

/// 2x2 stereo mixing matrix coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMixParams {
    pub left_to_left: f64,
    pub left_to_right: f64,
    pub right_to_left: f64,
    pub right_to_right: f64,
}

impl Default for ChannelMixParams {
    fn default() -> Self {
        Self {
            left_to_left: 1.0,
            left_to_right: 0.0,
            right_to_left: 0.0,
            right_to_right: 1.0,
        }
    }
}

/// Stereo matrix mix; the identity matrix is a no-op.
#[derive(Debug, Clone)]
pub struct ChannelMix {
    params: ChannelMixParams,
}

impl ChannelMix {
    pub fn new(params: ChannelMixParams) -> Self {
        Self { params }
    }
}

impl Filter for ChannelMix {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let p = &self.params;
        (
            p.left_to_left * left + p.right_to_left * right,
            p.left_to_right * left + p.right_to_right * right,
        )
    }

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "channelMix"
    }
}

// ============================================================================
// LOW PASS
// ============================================================================

/// Low-pass parameters: higher smoothing means a lower cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowPassParams {
    pub smoothing: f64,
}

impl Default for LowPassParams {
    fn default() -> Self {
        Self { smoothing: 20.0 }
    }
}

/// One-pole smoother per channel, primed lazily with the first sample so a
/// track does not fade in from silence.
#[derive(Debug, Clone)]
pub struct LowPass {
    smoothing: f64,
    left: Option<f64>,
    right: Option<f64>,
}

impl LowPass {
    pub fn new(params: LowPassParams) -> Self {
        Self {
            smoothing: params.smoothing,
            left: None,
            right: None,
        }
    }

    #[inline]
    fn smooth(value: &mut Option<f64>, sample: f64, smoothing: f64) -> f64 {
        let state = value.get_or_insert(sample);
        *state += (sample - *state) / smoothing;
        *state
    }
}

impl Filter for LowPass {
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        (
            Self::smooth(&mut self.left, left, self.smoothing),
            Self::smooth(&mut self.right, right, self.smoothing),
        )
    }

    fn reset(&mut self) {
        self.left = None;
        self.right = None;
    }

    fn name(&self) -> &'static str {
        "lowPass"
    }
}

// ============================================================================
// FILTER CHAIN
// ============================================================================

/// Ordered set of active filter instances for one playback session.
///
/// Built by the config layer in the fixed order equalizer → karaoke →
/// tremolo → vibrato → rotation → distortion → channelMix → lowPass.
/// Created fresh on every (re)configuration; never shared across sessions.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// An empty chain: [`FilterChain::apply`] is the identity.
    pub fn empty() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    pub(crate) fn from_filters(filters: Vec<Box<dyn Filter>>) -> Self {
        if !filters.is_empty() {
            debug!(
                filters = ?filters.iter().map(|f| f.name()).collect::<Vec<_>>(),
                "filter chain built"
            );
        }
        Self { filters }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Active filter names in processing order.
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every active filter over an interleaved stereo buffer, in place.
    ///
    /// Samples are processed in strict pair order; with no filters
    /// configured the buffer is untouched, byte for byte. A trailing
    /// unpaired sample (odd-length slice) is left as-is; the byte-level
    /// [`FilterStage`] never produces one.
    pub fn apply(&mut self, samples: &mut [i16]) {
        if self.filters.is_empty() {
            return;
        }

        for frame in samples.chunks_exact_mut(2) {
            let mut left = frame[0] as f64;
            let mut right = frame[1] as f64;
            for filter in &mut self.filters {
                (left, right) = filter.process(left, right);
            }
            frame[0] = quantize(left);
            frame[1] = quantize(right);
        }
    }

    /// Reset every filter's state without rebuilding the chain.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}

// ============================================================================
// FILTER STAGE (BYTE-LEVEL)
// ============================================================================

/// Byte-stream adapter around a [`FilterChain`].
///
/// The streaming loop hands this stage whatever chunk sizes the decoder
/// produces. A stereo sample pair is 4 bytes, so a chunk boundary can split
/// a pair mid-sample; the stage carries the trailing 1–3 bytes into the next
/// call instead of dropping or misaligning them. Output is always
/// pair-aligned.
pub struct FilterStage {
    chain: FilterChain,
    carry: Vec<u8>,
}

impl FilterStage {
    pub fn new(chain: FilterChain) -> Self {
        Self {
            chain,
            carry: Vec::with_capacity(BYTES_PER_PAIR),
        }
    }

    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Replace the chain with a freshly built one.
    ///
    /// The byte carry is alignment state of the input stream, not filter
    /// state, so it survives reconfiguration; every output buffer is
    /// produced entirely under one chain instance.
    pub fn set_chain(&mut self, chain: FilterChain) {
        debug!(filters = ?chain.names(), "filter stage reconfigured");
        self.chain = chain;
    }

    /// Process one chunk of s16le interleaved stereo bytes.
    ///
    /// Returns the filtered, pair-aligned bytes; up to 3 trailing bytes are
    /// held back and prepended to the next chunk. Splitting a stream at any
    /// byte offset yields output bit-identical to processing it whole.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.carry.len() + chunk.len());
        data.extend_from_slice(&self.carry);
        data.extend_from_slice(chunk);

        let aligned = data.len() - data.len() % BYTES_PER_PAIR;
        self.carry.clear();
        self.carry.extend_from_slice(&data[aligned..]);
        data.truncate(aligned);

        if self.chain.is_empty() || data.is_empty() {
            return data;
        }

        let mut samples = vec![0i16; aligned / 2];
        for (pair, bytes) in samples.chunks_exact_mut(2).zip(data.chunks_exact(4)) {
            (pair[0], pair[1]) = pcm::pair_from_le(bytes);
        }
        self.chain.apply(&mut samples);
        for (pair, bytes) in samples.chunks_exact(2).zip(data.chunks_exact_mut(4)) {
            pcm::pair_to_le(pair[0], pair[1], bytes);
        }
        data
    }

    /// Drop alignment and filter state (track end, stop, or seek).
    pub fn reset(&mut self) {
        self.carry.clear();
        self.chain.reset();
    }
}

// ============================================================================
// TESTS
// ============================================================================
