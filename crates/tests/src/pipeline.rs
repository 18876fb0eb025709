//! End-to-end pipeline tests: payload JSON → filter chain → byte stage →
//! Ogg muxer, the way the streaming loop drives them.

use crate::ogg_reader::{extract_packets, parse_stream};
use anyhow::Result;
use minstrel_core::domain::config::{FilterKind, FilterSettings, NodeConfig};
use minstrel_core::domain::dsp::FilterStage;
use minstrel_core::domain::ogg::{OggWriter, OpusHead, OpusTags};
use minstrel_core::domain::pcm::SAMPLE_RATE;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 440 Hz stereo tone as s16le bytes.
fn tone_bytes(pairs: usize) -> Vec<u8> {
    (0..pairs)
        .flat_map(|i| {
            let phase = std::f64::consts::TAU * 440.0 * i as f64 / SAMPLE_RATE as f64;
            let sample = (phase.sin() * 11000.0) as i16;
            let b = sample.to_le_bytes();
            [b[0], b[1], b[0], b[1]]
        })
        .collect()
}

fn stage_for(payload: &str) -> Result<FilterStage> {
    let settings = FilterSettings::from_json(payload)?;
    Ok(FilterStage::new(settings.build_chain(&NodeConfig::default())))
}

const PAYLOAD: &str = r#"{
    "equalizer": [{"band": 2, "gain": 0.6}],
    "tremolo": {"frequency": 6.0, "depth": 0.8},
    "channelMix": {"leftToLeft": 0.8, "leftToRight": 0.2, "rightToLeft": 0.2, "rightToRight": 0.8}
}"#;

#[test]
fn empty_configuration_is_byte_identity() -> Result<()> {
    init_tracing();
    let mut stage = stage_for("{}")?;
    let input = tone_bytes(4800);
    let output = stage.process(&input);
    assert_eq!(output, input);
    Ok(())
}

#[test]
fn configured_chain_changes_audio_but_keeps_alignment() -> Result<()> {
    let mut stage = stage_for(PAYLOAD)?;
    let input = tone_bytes(4800);
    let output = stage.process(&input);
    assert_eq!(output.len(), input.len());
    assert_ne!(output, input);
    Ok(())
}

#[test]
fn odd_chunking_matches_single_shot_processing() -> Result<()> {
    // The §-scenario sizes: 8003 bytes as 4001 + 4002.
    let mut input = tone_bytes(2001);
    input.truncate(8003);

    let mut whole = stage_for(PAYLOAD)?;
    let expected = whole.process(&input);

    let mut chunked = stage_for(PAYLOAD)?;
    let mut actual = chunked.process(&input[..4001]);
    actual.extend_from_slice(&chunked.process(&input[4001..]));

    assert_eq!(expected, actual);
    assert_eq!(expected.len(), 8000);
    Ok(())
}

#[test]
fn many_tiny_chunks_match_single_shot_processing() -> Result<()> {
    let input = tone_bytes(1000);

    let mut whole = stage_for(PAYLOAD)?;
    let expected = whole.process(&input);

    let mut chunked = stage_for(PAYLOAD)?;
    let mut actual = Vec::new();
    for chunk in input.chunks(7) {
        actual.extend_from_slice(&chunked.process(chunk));
    }

    assert_eq!(expected, actual);
    Ok(())
}

#[test]
fn reconfiguring_replaces_chain_with_fresh_state() -> Result<()> {
    let settings = FilterSettings::from_json(PAYLOAD)?;
    let config = NodeConfig::default();

    let mut stage = FilterStage::new(settings.build_chain(&config));
    let frame = tone_bytes(960);
    let first = stage.process(&frame);

    // Replacing the chain with an identically-configured fresh one must
    // restart filter state: the same input frame produces the same output
    // as the first frame did.
    stage.set_chain(settings.build_chain(&config));
    let after_swap = stage.process(&frame);
    assert_eq!(first, after_swap);

    // And clearing filters entirely returns the stage to identity.
    stage.set_chain(FilterSettings::default().build_chain(&config));
    assert_eq!(stage.process(&frame), frame);
    Ok(())
}

#[test]
fn node_config_gates_filter_kinds() -> Result<()> {
    let config = NodeConfig {
        enabled_filters: vec![FilterKind::Tremolo],
        ..NodeConfig::default()
    };
    let settings = FilterSettings::from_json(PAYLOAD)?;
    let chain = settings.build_chain(&config);
    assert_eq!(chain.names(), vec!["tremolo"]);
    Ok(())
}

#[test]
fn filtered_frames_mux_into_a_valid_stream() -> Result<()> {
    init_tracing();

    // Filter a second of audio in 20 ms frames, stand in for the encoder by
    // wrapping each filtered frame in a TOC-tagged packet, and mux.
    let mut stage = stage_for(PAYLOAD)?;
    let mut out = Vec::new();
    let mut writer = OggWriter::new(&mut out, 0x5EED).with_max_packets(10);
    writer.write_headers(&OpusHead::default(), &OpusTags::default())?;

    let mut packet_count = 0usize;
    for _ in 0..50 {
        let frame = tone_bytes(960);
        let filtered = stage.process(&frame);
        assert_eq!(filtered.len() % 4, 0);

        // Fake encode: TOC byte for a 20 ms frame plus a digest of the PCM.
        let mut packet = vec![31u8 << 3];
        packet.extend_from_slice(&filtered[..60]);
        writer.write_packet(&packet)?;
        packet_count += 1;
    }
    writer.finish()?;

    let pages = parse_stream(&out).unwrap();
    for page in &pages {
        assert!(page.crc_valid());
    }
    let packets = extract_packets(&pages).unwrap();
    assert_eq!(packets.len(), packet_count + 2);
    assert_eq!(pages.last().unwrap().granule_position, 50 * 960);
    Ok(())
}
