//! Integration tests for the minstrel audio engine
//!
//! These tests drive the public surface end to end: control-plane JSON into
//! a filter chain, chunked PCM through the byte stage, and Opus packets
//! through the Ogg muxer, verified with an independent page reader.

#[cfg(test)]
mod ogg_reader;
#[cfg(test)]
mod ogg_roundtrip;
#[cfg(test)]
mod pipeline;
