//! Rolling checksum values checked against hand-computed sums.
//!
//! The packed value is `(s2 << 16) | (s1 & 0xffff)` where `s1` is the sum of
//! the (signed) bytes and `s2` the sum of the running `s1` values.

use checksums::RollingChecksum;
use checksums::strong::{Md4, Md4Seed};

#[test]
fn single_ascii_byte_repeats_in_both_halves() {
    for byte in [0x00u8, 0x01, 0x42, 0x7f] {
        let expected = (u32::from(byte) << 16) | u32::from(byte);
        assert_eq!(RollingChecksum::of(&[byte]), expected, "byte {byte:#04x}");
    }
}

#[test]
fn abc_block() {
    // s1 = 97 + 98 + 99 = 294, s2 = 97 + 195 + 294 = 586
    assert_eq!(RollingChecksum::of(b"abc"), (586 << 16) | 294);
}

#[test]
fn sliding_across_a_text_matches_fresh_computation() {
    let text = b"The quick brown fox jumps over the lazy dog";
    let window = 8;
    let mut rolling = RollingChecksum::new();
    rolling.update(&text[..window]);

    for start in 1..=text.len() - window {
        rolling
            .roll(text[start - 1], text[start + window - 1])
            .expect("window is populated");
        assert_eq!(
            rolling.value(),
            RollingChecksum::of(&text[start..start + window]),
            "offset {start}"
        );
    }
}

#[test]
fn bytes_above_0x7f_count_as_negative() {
    // 0x80 contributes -128 to s1 and to s2.
    let value = RollingChecksum::of(&[0x80]);
    assert_eq!(value & 0xffff, 0xff80);
    assert_eq!(value >> 16, 0xff80);
}

#[test]
fn whole_file_sum_hashes_seed_before_content() {
    let seed = 0x5a5a_0001_i32;
    let mut hasher = Md4::with_seed(Md4Seed::prefix(seed));
    hasher.update(b"hello ");
    hasher.update(b"world");

    let mut manual = seed.to_le_bytes().to_vec();
    manual.extend_from_slice(b"hello world");
    assert_eq!(hasher.finalize(), Md4::digest(&manual));
}
