//! Ogg logical-bitstream muxing for Opus packets
//!
//! A from-scratch, single-stream Ogg writer: two fixed header pages
//! (OpusHead, OpusTags) followed by audio pages. Packets are laced into
//! pages whole; continuation across pages is deliberately unsupported, so
//! a packet needing more than 255 lacing segments is a hard error for the
//! stream.

use crate::domain::pcm::SAMPLE_RATE;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, trace};

pub type Result<T> = std::result::Result<T, OggError>;

/// Errors from the Ogg output path
#[derive(Debug, Error)]
pub enum OggError {
    /// The packet cannot be laced into a single page. Unrecoverable for
    /// this stream; the caller must fail the output path, not retry.
    #[error("packet of {size} bytes needs more than 255 lacing segments")]
    PacketTooLarge { size: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Ogg page capture pattern.
const CAPTURE_PATTERN: &[u8; 4] = b"OggS";

/// Fixed page header size before the lacing table.
const PAGE_HEADER_LEN: usize = 27;

/// Maximum lacing segments per page.
const MAX_SEGMENTS: usize = 255;

/// Header-type flag bits.
const FLAG_BOS: u8 = 0x02;
const FLAG_EOS: u8 = 0x04;

// ============================================================================
// CRC-32
// ============================================================================

/// Ogg page checksum polynomial (unreflected, zero init, no final xor).
const CRC_POLYNOMIAL: u32 = 0x04C1_1DB7;

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            r = if r & 0x8000_0000 != 0 {
                (r << 1) ^ CRC_POLYNOMIAL
            } else {
                r << 1
            };
            bit += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = build_crc_table();

fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0u32;
    for &byte in data {
        crc = (crc << 8) ^ CRC_TABLE[(((crc >> 24) as u8) ^ byte) as usize];
    }
    crc
}

// ============================================================================
// OPUS PACKET TIMING
// ============================================================================

/// Frame duration in milliseconds by Opus TOC configuration (TOC byte >> 3).
const FRAME_DURATIONS_MS: [f64; 32] = [
    // SILK NB / MB / WB
    10.0, 20.0, 40.0, 60.0, //
    10.0, 20.0, 40.0, 60.0, //
    10.0, 20.0, 40.0, 60.0, //
    // Hybrid SWB / FB
    10.0, 20.0, //
    10.0, 20.0, //
    // CELT NB / WB / SWB / FB
    2.5, 5.0, 10.0, 20.0, //
    2.5, 5.0, 10.0, 20.0, //
    2.5, 5.0, 10.0, 20.0, //
    2.5, 5.0, 10.0, 20.0,
];

/// Decoded sample count an audio packet contributes to the granule position.
fn packet_samples(packet: &[u8], sample_rate: u32) -> u64 {
    match packet.first() {
        Some(&toc) => {
            let ms = FRAME_DURATIONS_MS[(toc >> 3) as usize];
            (ms * sample_rate as f64 / 1000.0) as u64
        }
        None => 0,
    }
}

// ============================================================================
// HEADER PACKETS
// ============================================================================

/// OpusHead identification packet, always the sole packet of page 0.
#[derive(Debug, Clone)]
pub struct OpusHead {
    pub channels: u8,
    pub pre_skip: u16,
    pub input_sample_rate: u32,
    pub output_gain: i16,
}

impl Default for OpusHead {
    fn default() -> Self {
        Self {
            channels: 2,
            pre_skip: 312,
            input_sample_rate: SAMPLE_RATE,
            output_gain: 0,
        }
    }
}

impl OpusHead {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(19);
        buf.extend_from_slice(b"OpusHead");
        buf.push(1); // version
        buf.push(self.channels);
        buf.extend_from_slice(&self.pre_skip.to_le_bytes());
        buf.extend_from_slice(&self.input_sample_rate.to_le_bytes());
        buf.extend_from_slice(&self.output_gain.to_le_bytes());
        buf.push(0); // mapping family: mono/stereo, no mapping table
        buf
    }
}

/// OpusTags comment packet, always the sole packet of page 1.
#[derive(Debug, Clone)]
pub struct OpusTags {
    pub vendor: String,
    pub comments: Vec<String>,
}

impl Default for OpusTags {
    fn default() -> Self {
        Self {
            vendor: "minstrel".to_string(),
            comments: Vec::new(),
        }
    }
}

impl OpusTags {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"OpusTags");
        buf.extend_from_slice(&(self.vendor.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.vendor.as_bytes());
        buf.extend_from_slice(&(self.comments.len() as u32).to_le_bytes());
        for comment in &self.comments {
            buf.extend_from_slice(&(comment.len() as u32).to_le_bytes());
            buf.extend_from_slice(comment.as_bytes());
        }
        buf
    }
}

// ============================================================================
// OGG WRITER
// ============================================================================

/// Single logical-bitstream Ogg muxer.
///
/// Owned by one playback session. Pages are emitted with strictly
/// increasing sequence numbers and a non-decreasing granule position;
/// header pages never advance the granule. [`OggWriter::finish`] must be
/// called to emit the final page with the end-of-stream flag.
pub struct OggWriter<W: Write> {
    writer: W,
    serial: u32,
    sequence: u32,
    granule_position: u64,
    segments: Vec<u8>,
    packet_data: Vec<u8>,
    pending_packets: usize,
    max_page_packets: Option<usize>,
}

impl<W: Write> OggWriter<W> {
    pub fn new(writer: W, serial: u32) -> Self {
        Self {
            writer,
            serial,
            sequence: 0,
            granule_position: 0,
            segments: Vec::with_capacity(MAX_SEGMENTS),
            packet_data: Vec::new(),
            pending_packets: 0,
            max_page_packets: None,
        }
    }

    /// Cap the number of packets per page, flushing early once reached.
    pub fn with_max_packets(mut self, max: usize) -> Self {
        self.max_page_packets = Some(max.max(1));
        self
    }

    /// Cumulative decoded samples represented by the stream so far.
    pub fn granule_position(&self) -> u64 {
        self.granule_position
    }

    /// Sequence number the next page will carry.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Emit the two mandatory header pages.
    ///
    /// Must be called once, before any audio packet: OpusHead as the sole
    /// packet of the first page (beginning-of-stream flag set), OpusTags as
    /// the sole packet of the next page. Neither counts toward the granule
    /// position.
    pub fn write_headers(&mut self, head: &OpusHead, tags: &OpusTags) -> Result<()> {
        self.append_packet(&head.to_bytes())?;
        self.flush_page(false)?;
        self.append_packet(&tags.to_bytes())?;
        self.flush_page(false)?;
        debug!(serial = self.serial, "ogg headers written");
        Ok(())
    }

    /// Queue one encoded audio packet, flushing pages as they fill.
    pub fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        let needed = packet.len() / MAX_SEGMENTS + 1;
        if needed > MAX_SEGMENTS {
            return Err(OggError::PacketTooLarge { size: packet.len() });
        }

        let page_full = self.segments.len() + needed > MAX_SEGMENTS
            || self
                .max_page_packets
                .is_some_and(|max| self.pending_packets >= max);
        if page_full {
            self.flush_page(false)?;
        }

        self.append_packet(packet)?;
        self.granule_position += packet_samples(packet, SAMPLE_RATE);
        Ok(())
    }

    /// Flush any pending packets onto a page without ending the stream.
    pub fn flush(&mut self) -> Result<()> {
        if !self.segments.is_empty() {
            self.flush_page(false)?;
        }
        Ok(())
    }

    /// Emit the final page. Always writes a page, even an empty one, so the
    /// stream is terminated by the end-of-stream flag.
    pub fn finish(&mut self) -> Result<()> {
        self.flush_page(true)?;
        debug!(
            serial = self.serial,
            pages = self.sequence,
            granule = self.granule_position,
            "ogg stream finished"
        );
        Ok(())
    }

    /// Lace one packet into the pending page.
    ///
    /// Segments are 255-byte chunks plus a final chunk strictly below 255
    /// bytes; a packet length that is an exact multiple of 255 therefore
    /// ends with a zero lacing value marking the packet boundary.
    fn append_packet(&mut self, packet: &[u8]) -> Result<()> {
        let full_segments = packet.len() / MAX_SEGMENTS;
        for _ in 0..full_segments {
            self.segments.push(MAX_SEGMENTS as u8);
        }
        self.segments.push((packet.len() % MAX_SEGMENTS) as u8);
        self.packet_data.extend_from_slice(packet);
        self.pending_packets += 1;
        Ok(())
    }

    /// Assemble, checksum and write the pending page.
    fn flush_page(&mut self, end_of_stream: bool) -> Result<()> {
        if self.segments.is_empty() && !end_of_stream {
            return Ok(());
        }

        let mut flags = 0u8;
        if self.sequence == 0 {
            flags |= FLAG_BOS;
        }
        if end_of_stream {
            flags |= FLAG_EOS;
        }

        let mut page =
            Vec::with_capacity(PAGE_HEADER_LEN + self.segments.len() + self.packet_data.len());
        page.extend_from_slice(CAPTURE_PATTERN);
        page.push(0); // stream structure version
        page.push(flags);
        page.write_u64::<LittleEndian>(self.granule_position)?;
        page.write_u32::<LittleEndian>(self.serial)?;
        page.write_u32::<LittleEndian>(self.sequence)?;
        page.write_u32::<LittleEndian>(0)?; // checksum, patched below
        page.push(self.segments.len() as u8);
        page.extend_from_slice(&self.segments);
        page.extend_from_slice(&self.packet_data);

        let checksum = crc32(&page);
        page[22..26].copy_from_slice(&checksum.to_le_bytes());

        self.writer.write_all(&page)?;
        trace!(
            sequence = self.sequence,
            segments = self.segments.len(),
            granule = self.granule_position,
            eos = end_of_stream,
            "ogg page flushed"
        );

        self.sequence += 1;
        self.segments.clear();
        self.packet_data.clear();
        self.pending_packets = 0;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
