//! Turning hex digests into symmetric cipher keys.

use crate::error::{Error, Result};

/// Symmetric keys are extended to a multiple of this many bytes.
pub const KEY_BLOCK_SIZE: usize = 16;

/// Interprets consecutive hex character pairs as byte values.
///
/// Usually fed a 40 character SHA-1 digest, but any even-length hex
/// string is accepted. The empty string yields no bytes.
pub fn bytes_from_hex_digest(hash: &str) -> Result<Vec<u8>> {
    if hash.len() % 2 != 0 {
        return Err(Error::Format(format!(
            "odd number of hex characters ({})",
            hash.len()
        )));
    }
    Ok(hex::decode(hash)?)
}

/// Converts a hex digest into key bytes, zero-extended to the next
/// multiple of [`KEY_BLOCK_SIZE`]. A SHA-1 digest gives a 32 byte key.
pub fn derive_symmetric_key(hash: &str) -> Result<Vec<u8>> {
    let bytes = bytes_from_hex_digest(hash)?;
    Ok(pad16(bytes))
}

fn pad16(mut bytes: Vec<u8>) -> Vec<u8> {
    let padding = (KEY_BLOCK_SIZE - bytes.len() % KEY_BLOCK_SIZE) % KEY_BLOCK_SIZE;
    bytes.resize(bytes.len() + padding, 0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_become_bytes() -> Result<()> {
        assert_eq!(bytes_from_hex_digest("00ff10Ab")?, vec![0x00, 0xff, 0x10, 0xab]);
        assert!(bytes_from_hex_digest("")?.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_hex_is_a_format_error() {
        assert!(matches!(bytes_from_hex_digest("abc"), Err(Error::Format(_))));
        assert!(matches!(bytes_from_hex_digest("zz"), Err(Error::Format(_))));
    }

    #[test]
    fn sha1_digest_pads_to_32_bytes() -> Result<()> {
        let digest = "a9993e364706816aba3e25717850c26c9cd0d89d";
        let key = derive_symmetric_key(digest)?;
        assert_eq!(key.len(), 32);
        assert_eq!(&key[..20], &bytes_from_hex_digest(digest)?[..]);
        assert!(key[20..].iter().all(|b| *b == 0));
        assert_eq!(key, derive_symmetric_key(digest)?);
        Ok(())
    }

    #[test]
    fn aligned_input_is_not_extended() -> Result<()> {
        let digest = "00112233445566778899aabbccddeeff";
        assert_eq!(derive_symmetric_key(digest)?.len(), 16);
        Ok(())
    }
}
