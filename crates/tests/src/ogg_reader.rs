//! Independent Ogg page reader
//!
//! A deliberately separate implementation used to check the muxer: parsing
//! is plain byte slicing and the checksum is recomputed bit by bit, sharing
//! no code with the writer.

use anyhow::{bail, ensure, Result};

/// One parsed Ogg page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub version: u8,
    pub flags: u8,
    pub granule_position: u64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub lacing: Vec<u8>,
    pub body: Vec<u8>,
    /// The complete raw page, for checksum verification.
    pub raw: Vec<u8>,
}

impl ParsedPage {
    pub fn is_bos(&self) -> bool {
        self.flags & 0x02 != 0
    }

    pub fn is_eos(&self) -> bool {
        self.flags & 0x04 != 0
    }

    pub fn is_continued(&self) -> bool {
        self.flags & 0x01 != 0
    }

    /// Recompute the page checksum with the checksum field zeroed.
    pub fn crc_valid(&self) -> bool {
        let mut copy = self.raw.clone();
        copy[22..26].fill(0);
        crc_bitwise(&copy) == self.checksum
    }

    /// Reassemble packets from the lacing table.
    ///
    /// A lacing value below 255 terminates a packet; a page whose final
    /// lacing value is 255 would continue into the next page, which this
    /// reader (like the writer) does not support.
    pub fn packets(&self) -> Result<Vec<Vec<u8>>> {
        let mut packets = Vec::new();
        let mut current = Vec::new();
        let mut offset = 0usize;
        for &value in &self.lacing {
            current.extend_from_slice(&self.body[offset..offset + value as usize]);
            offset += value as usize;
            if value < 255 {
                packets.push(std::mem::take(&mut current));
            }
        }
        ensure!(
            current.is_empty(),
            "page ends mid-packet (continuation unsupported)"
        );
        Ok(packets)
    }
}

/// Bit-at-a-time CRC-32, poly 0x04C11DB7, init 0, no reflection, no xor out.
fn crc_bitwise(data: &[u8]) -> u32 {
    let mut crc: u32 = 0;
    for &byte in data {
        crc ^= (byte as u32) << 24;
        for _ in 0..8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ 0x04C1_1DB7;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Parse a byte stream into pages, validating framing as it goes.
pub fn parse_stream(bytes: &[u8]) -> Result<Vec<ParsedPage>> {
    let mut pages = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        ensure!(rest.len() >= 27, "truncated page header");
        if &rest[0..4] != b"OggS" {
            bail!("bad capture pattern at page {}", pages.len());
        }
        let segment_count = rest[26] as usize;
        let lacing = rest[27..27 + segment_count].to_vec();
        let body_len: usize = lacing.iter().map(|&v| v as usize).sum();
        let total = 27 + segment_count + body_len;
        ensure!(rest.len() >= total, "truncated page body");

        pages.push(ParsedPage {
            version: rest[4],
            flags: rest[5],
            granule_position: u64::from_le_bytes(rest[6..14].try_into()?),
            serial: u32::from_le_bytes(rest[14..18].try_into()?),
            sequence: u32::from_le_bytes(rest[18..22].try_into()?),
            checksum: u32::from_le_bytes(rest[22..26].try_into()?),
            lacing,
            body: rest[27 + segment_count..total].to_vec(),
            raw: rest[..total].to_vec(),
        });
        rest = &rest[total..];
    }
    Ok(pages)
}

/// Flatten a page sequence back into its packet stream.
pub fn extract_packets(pages: &[ParsedPage]) -> Result<Vec<Vec<u8>>> {
    let mut packets = Vec::new();
    for page in pages {
        packets.extend(page.packets()?);
    }
    Ok(packets)
}
