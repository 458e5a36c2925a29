//! c32check address encoding used by Stacks principals.
//!
//! An address is `S` + version char + c32(hash160 || checksum), where the
//! checksum is the first 4 bytes of `sha256(sha256(version || hash160))`.

use sha2::{Digest, Sha256};
use thiserror::Error;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

pub const MAINNET_SINGLESIG: u8 = 22;
pub const MAINNET_MULTISIG: u8 = 20;
pub const TESTNET_SINGLESIG: u8 = 26;
pub const TESTNET_MULTISIG: u8 = 21;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum C32Error {
    #[error("address must start with 'S'")]
    MissingPrefix,
    #[error("invalid c32 character '{0}'")]
    InvalidChar(char),
    #[error("invalid version {0}")]
    InvalidVersion(u8),
    #[error("address payload has {0} bytes, expected 24")]
    BadLength(usize),
    #[error("checksum mismatch")]
    BadChecksum,
}

fn c32_value(c: u8) -> Option<u8> {
    // Crockford-style normalization: case-insensitive, O→0, I/L→1.
    let c = match c.to_ascii_uppercase() {
        b'O' => b'0',
        b'I' | b'L' => b'1',
        other => other,
    };
    C32_ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}

/// Encode bytes as c32, preserving leading zero bytes as `0` digits.
pub fn encode(input: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u8 = 0;
    let mut carry_bits: u8 = 0;

    for &byte in input.iter().rev() {
        let take = 5 - carry_bits;
        let low = byte & ((1u8 << take) - 1);
        out.push(C32_ALPHABET[((low << carry_bits) + carry) as usize]);
        carry_bits = carry_bits + 8 - 5;
        carry = byte >> (8 - carry_bits);
        if carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }
    if carry_bits > 0 {
        out.push(C32_ALPHABET[carry as usize]);
    }

    while out.last() == Some(&C32_ALPHABET[0]) {
        out.pop();
    }
    for &byte in input {
        if byte != 0 {
            break;
        }
        out.push(C32_ALPHABET[0]);
    }

    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Decode a c32 string back to bytes, preserving leading `0` digits as zero bytes.
pub fn decode(input: &str) -> Result<Vec<u8>, C32Error> {
    let digits = input
        .bytes()
        .rev()
        .map(|b| c32_value(b).ok_or(C32Error::InvalidChar(char::from(b))))
        .collect::<Result<Vec<u8>, _>>()?;

    let mut out: Vec<u8> = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;
    for &d in &digits {
        carry += (d as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }
    if carry_bits > 0 {
        out.push(carry as u8);
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    for &d in digits.iter().rev() {
        if d != 0 {
            break;
        }
        out.push(0);
    }

    out.reverse();
    Ok(out)
}

fn checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(data);
    let once = hasher.finalize();
    let twice = Sha256::digest(once);
    [twice[0], twice[1], twice[2], twice[3]]
}

/// Build a Stacks address from a version byte and a hash160.
pub fn encode_address(version: u8, hash160: &[u8; 20]) -> Result<String, C32Error> {
    if version >= 32 {
        return Err(C32Error::InvalidVersion(version));
    }
    let mut payload = hash160.to_vec();
    payload.extend_from_slice(&checksum(version, hash160));
    Ok(format!(
        "S{}{}",
        char::from(C32_ALPHABET[version as usize]),
        encode(&payload)
    ))
}

/// Parse and checksum-verify a Stacks address.
pub fn decode_address(address: &str) -> Result<(u8, [u8; 20]), C32Error> {
    let rest = address
        .strip_prefix('S')
        .or_else(|| address.strip_prefix('s'))
        .ok_or(C32Error::MissingPrefix)?;
    let mut chars = rest.bytes();
    let version_char = chars.next().ok_or(C32Error::BadLength(0))?;
    let version = c32_value(version_char).ok_or(C32Error::InvalidChar(char::from(version_char)))?;

    let payload = decode(&rest[1..])?;
    if payload.len() != 24 {
        return Err(C32Error::BadLength(payload.len()));
    }
    let (data, sum) = payload.split_at(20);
    if checksum(version, data) != sum {
        return Err(C32Error::BadChecksum);
    }
    let mut hash160 = [0u8; 20];
    hash160.copy_from_slice(data);
    Ok((version, hash160))
}

pub fn is_mainnet_version(version: u8) -> bool {
    version == MAINNET_SINGLESIG || version == MAINNET_MULTISIG
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_from_hex(s: &str) -> [u8; 20] {
        let mut out = [0u8; 20];
        out.copy_from_slice(&hex::decode(s).unwrap());
        out
    }

    #[test]
    fn boot_addresses() {
        assert_eq!(
            encode_address(MAINNET_SINGLESIG, &[0u8; 20]).unwrap(),
            "SP000000000000000000002Q6VF78"
        );
        assert_eq!(
            encode_address(TESTNET_SINGLESIG, &[0u8; 20]).unwrap(),
            "ST000000000000000000002AMW42H"
        );
    }

    #[test]
    fn known_mainnet_address() {
        let hash = hash_from_hex("a46ff88886c2ef9762d970b4d2c63678835bd39d");
        let addr = encode_address(MAINNET_SINGLESIG, &hash).unwrap();
        assert_eq!(addr, "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7");

        let (version, decoded) = decode_address(&addr).unwrap();
        assert_eq!(version, MAINNET_SINGLESIG);
        assert_eq!(decoded, hash);
    }

    #[test]
    fn decode_is_lenient_on_case() {
        let (version, hash) = decode_address("sp2j6zy48gv1ez5v2v5rb9mp66sw86pykknrv9ej7").unwrap();
        assert_eq!(version, MAINNET_SINGLESIG);
        assert_eq!(hash, hash_from_hex("a46ff88886c2ef9762d970b4d2c63678835bd39d"));
    }

    #[test]
    fn rejects_bad_checksum() {
        assert_eq!(
            decode_address("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ8"),
            Err(C32Error::BadChecksum)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(decode_address("XP123"), Err(C32Error::MissingPrefix));
        assert!(matches!(decode_address("SPU"), Err(C32Error::InvalidChar('U'))));
        assert!(matches!(decode_address("SP12"), Err(C32Error::BadLength(_))));
    }

    #[test]
    fn leading_zero_bytes_survive() {
        let bytes = [0u8, 0, 1, 2, 3];
        let enc = encode(&bytes);
        assert!(enc.starts_with("00"));
        assert_eq!(decode(&enc).unwrap(), bytes);
    }
}
