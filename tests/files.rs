use std::fs;

use tempfile::tempdir;
use x3_core::{Config, X3Error, decode_file, encode_file};

#[test]
fn file_round_trip() {
    let dir = tempdir().expect("temp dir");
    let raw = dir.path().join("input.txt");
    let packed = dir.path().join("input.txt.x3");
    let restored = dir.path().join("restored.txt");

    let data: Vec<u8> = b"It was the best of times, it was the worst of times, "
        .iter()
        .cycle()
        .take(10_000)
        .copied()
        .collect();
    fs::write(&raw, &data).expect("write input");

    encode_file(&raw, &packed, None).expect("encode");
    let packed_len = fs::metadata(&packed).expect("packed metadata").len();
    assert!(packed_len < data.len() as u64 / 4);

    decode_file(&packed, &restored).expect("decode");
    assert_eq!(fs::read(&restored).expect("read restored"), data);
}

#[test]
fn custom_config_round_trip() {
    let dir = tempdir().expect("temp dir");
    let raw = dir.path().join("a.bin");
    let packed = dir.path().join("a.bin.x3");
    let restored = dir.path().join("a.out");
    let data: Vec<u8> = (0..4096u32).map(|i| (i % 97) as u8).collect();
    fs::write(&raw, &data).expect("write input");

    let config = Config::default().with_forward_window_kib(1).with_max_match_count(2);
    encode_file(&raw, &packed, Some(config)).expect("encode");
    decode_file(&packed, &restored).expect("decode");
    assert_eq!(fs::read(&restored).expect("read restored"), data);
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempdir().expect("temp dir");
    let err = encode_file(dir.path().join("nope"), dir.path().join("out"), None);
    assert!(matches!(err, Err(X3Error::IoError(_))));
    let err = decode_file(dir.path().join("nope"), dir.path().join("out"));
    assert!(matches!(err, Err(X3Error::IoError(_))));
}
