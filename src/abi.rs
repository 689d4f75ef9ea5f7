use tiny_keccak::{Hasher, Keccak};

const WORD: usize = 32;

pub fn keccak256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut out = [0u8; 32];
    hasher.update(input);
    hasher.finalize(&mut out);
    out
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn word(value: usize) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    out[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    out
}

/// Calldata for `<function>(string)`: selector, head offset, length, right-padded bytes.
pub fn encode_string_call(function: &str, arg: &str) -> Vec<u8> {
    let bytes = arg.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;

    let mut data = Vec::with_capacity(4 + 2 * WORD + padded);
    data.extend_from_slice(&selector(&format!("{function}(string)")));
    data.extend_from_slice(&word(WORD));
    data.extend_from_slice(&word(bytes.len()));
    data.extend_from_slice(bytes);
    data.resize(4 + 2 * WORD + padded, 0);
    data
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn quantity(value: u64) -> String {
    format!("{value:#x}")
}

/// `0x` + 40 hex digits, case-insensitive. Checksums are not verified.
pub fn is_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|h| h.len() == 40 && h.chars().all(|c| c.is_ascii_hexdigit()))
}

pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
