//! Per-hashtag message encryption keyed by sigma.
//!
//! The key is `pad16(SHA1(sigma_hex))`, 32 bytes for a SHA-1 digest, and
//! messages are AES-CBC with PKCS#7 padding under a fresh random IV. The
//! ciphertext string is `base64(iv || ciphertext)`.

use crate::blind_sigs::compute_sigma_directly;
use crate::error::{Error, Result};
use crate::key_derivation::derive_symmetric_key;
use crate::keys::KeyPair;
use crate::utils::sha1_hex;
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::{CryptoRng, RngCore};
use tracing::debug;

const IV_LEN: usize = 16;

/// `SHA1(sigma_hex)`, the digest the message key is derived from.
pub fn message_key_digest(sigma_hex: &str) -> String {
    sha1_hex(sigma_hex.as_bytes())
}

pub fn encrypt(sigma_hex: &str, plaintext: &str) -> Result<String> {
    encrypt_with(&mut rand::thread_rng(), sigma_hex, plaintext)
}

pub fn encrypt_with<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    sigma_hex: &str,
    plaintext: &str,
) -> Result<String> {
    let key = message_key(sigma_hex)?;

    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);
    let ciphertext = cbc_encrypt(&key, &iv, plaintext.as_bytes())?;

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(out))
}

pub fn decrypt(sigma_hex: &str, ciphertext: &str) -> Result<String> {
    let key = message_key(sigma_hex)?;

    let raw = STANDARD
        .decode(ciphertext)
        .map_err(|e| Error::Decryption(format!("ciphertext is not base64: {}", e)))?;
    if raw.len() < 2 * IV_LEN || raw.len() % IV_LEN != 0 {
        return Err(Error::Decryption(format!(
            "ciphertext has invalid length {}",
            raw.len()
        )));
    }
    let (iv, body) = raw.split_at(IV_LEN);

    let plaintext = cbc_decrypt(&key, iv, body)?;
    String::from_utf8(plaintext)
        .map_err(|_| Error::Decryption("plaintext is not valid utf-8".to_string()))
}

/// Encrypts for `hashtag` as the holder of the target's private key,
/// computing sigma directly.
pub fn encrypt_for_hashtag(kp: &KeyPair, hashtag: &str, plaintext: &str) -> Result<String> {
    let sigma = compute_sigma_directly(kp, hashtag)?;
    debug!("encrypting message for hashtag");
    encrypt(&sigma.to_hex(), plaintext)
}

pub fn decrypt_for_hashtag(kp: &KeyPair, hashtag: &str, ciphertext: &str) -> Result<String> {
    let sigma = compute_sigma_directly(kp, hashtag)?;
    decrypt(&sigma.to_hex(), ciphertext)
}

fn message_key(sigma_hex: &str) -> Result<Vec<u8>> {
    if sigma_hex.is_empty() || !sigma_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::invalid("sigma must be a non-empty hex string"));
    }
    derive_symmetric_key(&message_key_digest(sigma_hex))
}

fn cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let ct = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|e| Error::invalid(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|e| Error::invalid(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|e| Error::invalid(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        n => return Err(Error::invalid(format!("no AES variant for a {} byte key", n))),
    };
    Ok(ct)
}

fn cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let pt = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|e| Error::invalid(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|e| Error::invalid(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|e| Error::invalid(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        n => return Err(Error::invalid(format!("no AES variant for a {} byte key", n))),
    };
    pt.map_err(|_| Error::Decryption("bad padding".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::tests::{other_target_key, target_key};

    const SIGMA: &str = "5d41402abc4b2a76b9719d911017c592";

    #[test]
    fn round_trips() -> Result<()> {
        let long = "x".repeat(1000);
        for plaintext in ["", "hello world", "ünïcödé ✓ 鳥のさえずり", long.as_str()] {
            let ct = encrypt(SIGMA, plaintext)?;
            assert_eq!(decrypt(SIGMA, &ct)?, plaintext);
        }
        Ok(())
    }

    #[test]
    fn fresh_iv_per_message() -> Result<()> {
        let a = encrypt(SIGMA, "same text")?;
        let b = encrypt(SIGMA, "same text")?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn key_is_sha1_of_sigma_padded() -> Result<()> {
        let digest = message_key_digest(SIGMA);
        assert_eq!(digest.len(), 40);
        let key = message_key(SIGMA)?;
        assert_eq!(key.len(), 32);
        assert_eq!(key, derive_symmetric_key(&digest)?);
        Ok(())
    }

    #[test]
    fn wrong_sigma_does_not_decrypt() -> Result<()> {
        let ct = encrypt(SIGMA, "for subscribers only, padded past one block")?;
        match decrypt("abcdef", &ct) {
            Err(Error::Decryption(_)) => {}
            Ok(pt) => assert_ne!(pt, "for subscribers only, padded past one block"),
            Err(e) => panic!("unexpected error: {}", e),
        }
        Ok(())
    }

    #[test]
    fn corrupted_ciphertext_is_a_decryption_error() {
        assert!(matches!(
            decrypt(SIGMA, "***not base64***"),
            Err(Error::Decryption(_))
        ));
        assert!(matches!(
            decrypt(SIGMA, &STANDARD.encode([0u8; 20])),
            Err(Error::Decryption(_))
        ));
        assert!(matches!(decrypt(SIGMA, ""), Err(Error::Decryption(_))));
    }

    #[test]
    fn malformed_sigma_is_rejected() {
        assert!(matches!(encrypt("", "hi"), Err(Error::InvalidArgument(_))));
        assert!(matches!(
            encrypt("not-hex", "hi"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn key_holder_path_matches_subscriber_path() -> Result<()> {
        let kp = target_key();
        let ct = encrypt_for_hashtag(kp, "#rustlang", "meetup at 7")?;

        let sigma = compute_sigma_directly(kp, "#rustlang")?;
        assert_eq!(decrypt(&sigma.to_hex(), &ct)?, "meetup at 7");
        assert_eq!(decrypt_for_hashtag(kp, "#rustlang", &ct)?, "meetup at 7");

        let other = compute_sigma_directly(other_target_key(), "#rustlang")?;
        assert_ne!(other, sigma);
        Ok(())
    }
}
