//! Muxer round-trip tests against the independent reader

use crate::ogg_reader::{extract_packets, parse_stream};
use minstrel_core::domain::ogg::{OggWriter, OpusHead, OpusTags};

/// TOC byte for a 20 ms CELT fullband frame.
const TOC_20MS: u8 = 31 << 3;

fn synthetic_packet(index: usize, len: usize) -> Vec<u8> {
    let mut packet = Vec::with_capacity(len);
    packet.push(TOC_20MS);
    while packet.len() < len {
        packet.push((index as u8).wrapping_mul(31).wrapping_add(packet.len() as u8));
    }
    packet
}

fn mux(packets: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut writer = OggWriter::new(&mut out, 0x0D15_EA5E);
    writer
        .write_headers(&OpusHead::default(), &OpusTags::default())
        .unwrap();
    for packet in packets {
        writer.write_packet(packet).unwrap();
    }
    writer.finish().unwrap();
    out
}

#[test]
fn round_trip_reconstructs_packets_in_order() {
    // Sizes spanning single-byte packets to multi-segment lacing, including
    // the exact-multiple-of-255 case that needs a zero terminator.
    let sizes = [1usize, 2, 100, 254, 255, 256, 510, 511, 600, 1000, 4000];
    let packets: Vec<Vec<u8>> = sizes
        .iter()
        .enumerate()
        .map(|(i, &len)| synthetic_packet(i, len))
        .collect();

    let stream = mux(&packets);
    let pages = parse_stream(&stream).unwrap();

    for page in &pages {
        assert_eq!(page.version, 0);
        assert_eq!(page.serial, 0x0D15_EA5E);
        assert!(page.crc_valid(), "page {} fails CRC", page.sequence);
        assert!(!page.is_continued());
    }

    let recovered = extract_packets(&pages).unwrap();
    // Two header packets, then ours, in order.
    assert_eq!(&recovered[0][0..8], b"OpusHead");
    assert_eq!(&recovered[1][0..8], b"OpusTags");
    assert_eq!(&recovered[2..], &packets[..]);
}

#[test]
fn sequence_strictly_increases_and_granule_never_decreases() {
    let packets: Vec<Vec<u8>> = (0..500).map(|i| synthetic_packet(i, 120)).collect();
    let stream = mux(&packets);
    let pages = parse_stream(&stream).unwrap();
    assert!(pages.len() > 3, "500 packets must span multiple pages");

    for (i, window) in pages.windows(2).enumerate() {
        assert_eq!(window[1].sequence, window[0].sequence + 1, "at page {i}");
        assert!(window[1].granule_position >= window[0].granule_position);
    }
}

#[test]
fn header_pages_are_exactly_the_first_two() {
    let stream = mux(&[synthetic_packet(0, 64)]);
    let pages = parse_stream(&stream).unwrap();

    assert!(pages[0].is_bos());
    let first_packets = pages[0].packets().unwrap();
    assert_eq!(first_packets.len(), 1);
    assert_eq!(&first_packets[0][0..8], b"OpusHead");
    assert_eq!(pages[0].granule_position, 0);

    assert!(!pages[1].is_bos());
    let second_packets = pages[1].packets().unwrap();
    assert_eq!(second_packets.len(), 1);
    assert_eq!(&second_packets[0][0..8], b"OpusTags");
    assert_eq!(pages[1].granule_position, 0);

    for page in &pages[1..] {
        assert!(!page.is_bos());
    }
    assert!(pages.last().unwrap().is_eos());
    for page in &pages[..pages.len() - 1] {
        assert!(!page.is_eos());
    }
}

#[test]
fn granule_matches_twenty_ms_packet_durations() {
    let packets: Vec<Vec<u8>> = (0..10).map(|i| synthetic_packet(i, 80)).collect();
    let stream = mux(&packets);
    let pages = parse_stream(&stream).unwrap();

    // 10 packets x 20 ms at 48 kHz.
    assert_eq!(pages.last().unwrap().granule_position, 10 * 960);
}

#[test]
fn corrupting_any_byte_breaks_the_checksum() {
    let stream = mux(&[synthetic_packet(0, 300)]);
    let pages = parse_stream(&stream).unwrap();
    let audio_page = &pages[2];

    let mut corrupted = audio_page.clone();
    corrupted.raw[30] ^= 0x40;
    assert!(!corrupted.crc_valid());
}
