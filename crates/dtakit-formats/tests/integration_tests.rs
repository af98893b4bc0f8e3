//! End-to-end tests against synthetic archives

mod common;

use std::io::{Cursor, Write};

use common::{ArchiveBuilder, TEST_KEYS, block, literal_lzss_block, raw_block};
use dtakit_crypto::{DtaCipher, KeyPair, KeyTable};
use dtakit_formats::codec::dpcm::{WAV_HEADER_SIZE, WavHeader};
use dtakit_formats::codec::tables::{SERIALIZED_SIZE, TABLE_LEN};
use dtakit_formats::{
    BlockType, DeltaTables, DtaArchive, DtaConfig, DtaError, SizeCheck, extract_entry,
};
use pretty_assertions::assert_eq;

/// Raw "AB", LZSS run of 16 'x', raw "CD"
fn three_block_entry() -> Vec<Vec<u8>> {
    vec![
        raw_block(b"AB"),
        block(BlockType::Lzss, &[0x80, 0x00, 0x00, 0x00, 0x00, b'x']),
        raw_block(b"CD"),
    ]
}

fn expected_three_block() -> Vec<u8> {
    let mut expected = b"AB".to_vec();
    expected.extend([b'x'; 16]);
    expected.extend(b"CD");
    expected
}

/// DPCM block whose payload starts with the encrypted audio header
fn first_audio_block(block_type: BlockType, channels: u16, samples: &[u8]) -> Vec<u8> {
    let header = WavHeader::pcm16(channels, 11_025, 0)
        .to_bytes()
        .expect("Test operation should succeed");
    let mut payload = DtaCipher::new(TEST_KEYS).transform(&header, 0);
    payload.extend_from_slice(samples);
    block(block_type, &payload)
}

fn load(bytes: Vec<u8>) -> DtaArchive<Cursor<Vec<u8>>> {
    DtaArchive::load(Cursor::new(bytes), TEST_KEYS).expect("Test operation should succeed")
}

fn pcm(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[test]
fn test_three_block_scenario() {
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("data\\mixed.bin", three_block_entry(), 20)
        .build();
    let archive = load(bytes);

    assert_eq!(archive.len(), 1);
    assert_eq!(archive.file_size(0).expect("Test operation should succeed"), 20);

    let output = archive.extract(0).expect("Test operation should succeed");
    assert_eq!(output, expected_three_block());
}

#[test]
fn test_encrypted_blocks() {
    let text = b"The quick brown fox jumps over the lazy dog";
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .encrypted_entry(
            "texts\\fox.txt",
            vec![literal_lzss_block(&text[..20]), raw_block(&text[20..])],
            text.len() as u32,
        )
        .entry("plain.txt", vec![raw_block(b"plain")], 5)
        .build();
    let archive = load(bytes);

    let entry = archive.catalog().get(0).expect("Test operation should succeed");
    assert!(entry.is_encrypted());
    assert_eq!(entry.name, "texts\\fox.txt");
    assert_eq!(entry.name_bytes(), b"texts\\fox.txt");

    assert_eq!(
        archive.extract_by_name("texts\\fox.txt").expect("Test operation should succeed"),
        text
    );
    assert_eq!(
        archive.extract_by_name("plain.txt").expect("Test operation should succeed"),
        b"plain"
    );
}

#[test]
fn test_bad_signature_stops_reading() {
    let mut stream = Cursor::new(b"ISDX".to_vec());
    let rejected = matches!(
        DtaArchive::load(&mut stream, TEST_KEYS),
        Err(DtaError::BadSignature(magic)) if &magic == b"ISDX"
    );
    assert!(rejected);
    assert_eq!(stream.position(), 4);

    let mut longer = ArchiveBuilder::new(TEST_KEYS)
        .entry("a", vec![raw_block(b"a")], 1)
        .build();
    longer[0] = b'P';
    let mut stream = Cursor::new(longer);
    assert!(matches!(
        DtaArchive::load(&mut stream, TEST_KEYS),
        Err(DtaError::BadSignature(_))
    ));
    assert_eq!(stream.position(), 4);
}

#[test]
fn test_empty_stream_is_truncated() {
    let result = DtaArchive::load(Cursor::new(Vec::new()), TEST_KEYS);
    assert!(matches!(
        result,
        Err(DtaError::Truncated {
            what: "signature",
            ..
        })
    ));
}

#[test]
fn test_wrong_keys_fail_structure_checks() {
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("a", vec![raw_block(b"a")], 1)
        .build();

    let result = DtaArchive::load(Cursor::new(bytes), KeyPair::zero());
    assert!(matches!(result, Err(DtaError::Truncated { .. })));
}

#[test]
fn test_truncation_inside_block() {
    let mut bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("first", vec![raw_block(b"ok")], 2)
        .entry("second", vec![raw_block(b"this block gets cut short")], 25)
        .build();
    bytes.truncate(bytes.len() - 10);
    let archive = load(bytes);

    assert_eq!(archive.extract(0).expect("Test operation should succeed"), b"ok");
    assert!(matches!(
        archive.extract(1),
        Err(DtaError::Truncated { what: "block", .. })
    ));
}

#[test]
fn test_lookup_errors() {
    let archive = load(
        ArchiveBuilder::new(TEST_KEYS)
            .entry("Readme.txt", vec![raw_block(b"hi")], 2)
            .build(),
    );

    assert_eq!(archive.find_index_by_name("Readme.txt"), Some(0));
    assert_eq!(archive.find_index_by_name("readme.txt"), None);
    assert!(matches!(
        archive.extract_by_name("missing.txt"),
        Err(DtaError::EntryNotFound(name)) if name == "missing.txt"
    ));
    assert!(matches!(
        archive.extract(3),
        Err(DtaError::IndexOutOfRange { index: 3, count: 1 })
    ));
    assert!(matches!(
        archive.file_size(1),
        Err(DtaError::IndexOutOfRange { index: 1, count: 1 })
    ));
}

#[test]
fn test_dpcm_header_once_across_blocks() {
    let blocks = vec![
        // Seed 100, +2, -4
        first_audio_block(BlockType::Dpcm0, 1, &[0x64, 0x00, 0x02, 0x84]),
        // Seed 16, +64
        block(BlockType::Dpcm0, &[0x10, 0x00, 0x20]),
    ];
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("sounds\\beep.wav", blocks, (WAV_HEADER_SIZE + 10) as u32)
        .build();
    let archive = load(bytes);

    let output = archive.extract(0).expect("Test operation should succeed");
    assert_eq!(output.len(), WAV_HEADER_SIZE + 10);
    assert_eq!(&output[..4], b"RIFF");
    assert_eq!(&output[8..12], b"WAVE");
    assert_eq!(pcm(&output[WAV_HEADER_SIZE..]), vec![100, 102, 98, 16, 80]);

    // A second extraction starts from a fresh session
    assert_eq!(archive.extract(0).expect("Test operation should succeed"), output);
}

#[test]
fn test_dpcm_stereo_rejected() {
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry(
            "music\\theme.wav",
            vec![first_audio_block(BlockType::Dpcm4, 2, &[0, 0, 1])],
            0,
        )
        .build();
    let archive = load(bytes);

    assert!(matches!(
        archive.extract(0),
        Err(DtaError::UnsupportedAudioLayout { channels: 2 })
    ));
}

#[test]
fn test_custom_delta_tables() {
    let blocks = vec![first_audio_block(BlockType::Dpcm2, 1, &[0x00, 0x00, 0x01, 0x01])];
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("step.wav", blocks, (WAV_HEADER_SIZE + 6) as u32)
        .build();

    // Variant 2, magnitude 1 -> 1000
    let mut resource = vec![0u8; SERIALIZED_SIZE];
    let index = (2 * TABLE_LEN + 1) * 2;
    resource[index..index + 2].copy_from_slice(&1000u16.to_le_bytes());
    let tables = DeltaTables::from_le_bytes(&resource).expect("Test operation should succeed");

    let archive = load(bytes).with_delta_tables(tables);
    let output = archive.extract(0).expect("Test operation should succeed");
    assert_eq!(pcm(&output[WAV_HEADER_SIZE..]), vec![0, 1000, 2000]);
}

#[test]
fn test_catalog_survives_failed_extract() {
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("broken.bin", vec![raw_block(b"ok"), vec![0x7F, 1, 2, 3]], 5)
        .entry("fine.bin", three_block_entry(), 20)
        .build();
    let archive = load(bytes);

    assert!(matches!(
        archive.extract(0),
        Err(DtaError::UnknownBlockType(0x7F))
    ));
    assert_eq!(archive.len(), 2);
    assert_eq!(
        archive.extract_by_name("fine.bin").expect("Test operation should succeed"),
        expected_three_block()
    );
}

#[test]
fn test_strict_size_mismatch() {
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("liar.bin", vec![raw_block(b"four")], 40)
        .build();

    let lenient = load(bytes.clone());
    assert_eq!(lenient.extract(0).expect("Test operation should succeed"), b"four");

    let strict = DtaArchive::load_with_config(
        Cursor::new(bytes),
        TEST_KEYS,
        DtaConfig::new().with_size_check(SizeCheck::Strict),
    )
    .expect("Test operation should succeed");
    assert!(matches!(
        strict.extract(0),
        Err(DtaError::SizeMismatch {
            expected: 40,
            actual: 4,
            ..
        })
    ));
}

#[test]
fn test_concurrent_extraction() {
    let mut builder = ArchiveBuilder::new(TEST_KEYS);
    for i in 0..8u8 {
        let content = vec![b'a' + i; 100 + usize::from(i)];
        builder = builder.entry(
            &format!("file{i}.dat"),
            vec![literal_lzss_block(&content)],
            content.len() as u32,
        );
    }
    let archive = load(builder.build());

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let archive = &archive;
            scope.spawn(move || {
                for round in 0..10 {
                    let index = (worker + round) % archive.len();
                    let data = archive.extract(index).expect("Test operation should succeed");
                    assert_eq!(data.len(), 100 + index);
                    assert!(data.iter().all(|&b| usize::from(b - b'a') == index));
                }
            });
        }
    });
}

#[test]
fn test_extract_entry_with_independent_stream() {
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("one", vec![raw_block(b"1")], 1)
        .entry("two", three_block_entry(), 20)
        .build();
    let archive = load(bytes.clone());

    let entry = archive.catalog().get(1).expect("Test operation should succeed");
    let mut own_stream = Cursor::new(bytes);
    let output = extract_entry(
        &mut own_stream,
        entry,
        archive.cipher(),
        archive.delta_tables(),
        archive.config(),
    )
    .expect("Test operation should succeed");

    assert_eq!(output, expected_three_block());
}

#[test]
fn test_open_resolves_keys_by_file_name() {
    let bytes = ArchiveBuilder::new(TEST_KEYS)
        .entry("maps\\level.4ds", vec![raw_block(b"mesh")], 4)
        .build();

    let dir = tempfile::tempdir().expect("Test operation should succeed");
    let path = dir.path().join("A7.DTA");
    let mut file = std::fs::File::create(&path).expect("Test operation should succeed");
    file.write_all(&bytes).expect("Test operation should succeed");
    drop(file);

    let mut keys = KeyTable::new();
    keys.insert("a7.dta", TEST_KEYS);

    let archive = DtaArchive::open(&path, &keys).expect("Test operation should succeed");
    assert_eq!(archive.catalog().len(), 1);
    assert_eq!(
        archive.extract_by_name("maps\\level.4ds").expect("Test operation should succeed"),
        b"mesh"
    );
    assert_eq!(archive.header().file_count, 1);
}
