use crate::error::{Error, Result};
use md5::Md5;
use num_bigint_dig::{BigInt, ModInverse, Sign};
use rsa::BigUint;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Bytes of fixed overhead in the deterministic encoding:
/// `0x00 0x01`, at least eight `0xff` and the `0x00` separator.
const PADDING_OVERHEAD: usize = 11;

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub(crate) fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

pub(crate) fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Number of bytes needed to hold `n`.
pub(crate) fn byte_len(n: &BigUint) -> usize {
    (n.bits() + 7) >> 3
}

// PKCS#1 v1.5 shaped embedding, but with fixed 0xff filler (block type 1)
// instead of random bytes, so a given digest always maps to one integer.
//
// EM = 0x00 || 0x01 || 0xff .. 0xff || 0x00 || digest_hex
//
// The leading zero byte keeps the integer below any modulus of `k` bytes.
pub(crate) fn pad_deterministic(digest_hex: &str, k: usize) -> Result<BigUint> {
    let msg = digest_hex.as_bytes();
    let needed = msg.len() + PADDING_OVERHEAD;
    if k < needed {
        return Err(Error::MessageTooLong {
            needed,
            available: k,
        });
    }

    let mut em = vec![0xffu8; k];
    em[0] = 0x00;
    em[1] = 0x01;
    let sep = k - msg.len() - 1;
    em[sep] = 0x00;
    em[sep + 1..].copy_from_slice(msg);

    Ok(BigUint::from_bytes_be(&em))
}

/// Lowercase hex without leading zeros, the form sigma is published
/// and hashed in.
pub(crate) fn biguint_to_hex(n: &BigUint) -> String {
    n.to_str_radix(16)
}

pub(crate) fn biguint_from_hex(s: &str) -> Result<BigUint> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Format(format!("not a hex integer: {:?}", s)));
    }
    BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or_else(|| Error::Format(format!("not a hex integer: {:?}", s)))
}

// x = a^-1 mod n, or None when gcd(a, n) != 1
pub(crate) fn mod_inverse(a: &BigUint, n: &BigUint) -> Option<BigUint> {
    let inv: BigInt = a.clone().mod_inverse(n)?;
    let n = BigInt::from_biguint(Sign::Plus, n.clone());
    (((inv % &n) + &n) % &n).to_biguint()
}

pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid(format!("{} must not be empty", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn padding_is_deterministic_and_shaped() -> Result<()> {
        let digest = sha256_hex(b"#rust");
        let a = pad_deterministic(&digest, 128)?;
        let b = pad_deterministic(&digest, 128)?;
        assert_eq!(a, b);

        let bytes = a.to_bytes_be();
        // leading 0x00 is dropped by the integer encoding
        assert_eq!(bytes.len(), 127);
        assert_eq!(bytes[0], 0x01);
        assert!(bytes[1..127 - 65].iter().all(|b| *b == 0xff));
        assert_eq!(bytes[127 - 65], 0x00);
        assert_eq!(&bytes[127 - 64..], digest.as_bytes());
        Ok(())
    }

    #[test]
    fn padding_rejects_small_modulus() {
        let digest = sha256_hex(b"#rust");
        match pad_deterministic(&digest, 74) {
            Err(Error::MessageTooLong { needed, available }) => {
                assert_eq!(needed, 75);
                assert_eq!(available, 74);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn hex_codec() -> Result<()> {
        let n = biguint_from_hex("0ff")?;
        assert_eq!(n, BigUint::from(255u32));
        assert_eq!(biguint_to_hex(&n), "ff");
        assert!(matches!(biguint_from_hex(""), Err(Error::Format(_))));
        assert!(matches!(biguint_from_hex("12_34"), Err(Error::Format(_))));
        assert!(matches!(biguint_from_hex("xyz"), Err(Error::Format(_))));
        Ok(())
    }

    #[test]
    fn inverse_modulo() {
        let n = BigUint::from(3233u32);
        let a = BigUint::from(17u32);
        let inv = mod_inverse(&a, &n).unwrap();
        assert_eq!((a * inv) % &n, BigUint::from(1u32));

        // shares a factor with n = 61 * 53
        assert!(mod_inverse(&BigUint::from(61u32), &n).is_none());
        assert!(mod_inverse(&BigUint::from(0u32), &n).is_none());
    }
}
