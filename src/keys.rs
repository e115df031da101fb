use crate::error::{Error, Result};
use crate::store::{KeyValueStore, StoreNamespace};
use crate::utils::{biguint_from_hex, biguint_to_hex, mod_inverse, require_non_empty};
use rsa::rand_core::CryptoRngCore;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_KEY_BITS: usize = 1024;

/// An RSA key pair owned by a single user.
///
/// Targets sign with it, subscribers only ever see the public half.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPair {
    sk: RsaPrivateKey,
}

impl KeyPair {
    pub fn generate(bits: usize) -> Result<Self> {
        Self::generate_with(&mut rand::thread_rng(), bits)
    }

    pub fn generate_with<R: CryptoRngCore + ?Sized>(rng: &mut R, bits: usize) -> Result<Self> {
        let sk = RsaPrivateKey::new(rng, bits)?;
        debug!(bits, "generated key pair");
        Ok(Self { sk })
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.sk.to_public_key()
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.sk
    }

    pub fn modulus(&self) -> &BigUint {
        self.sk.n()
    }
}

impl From<RsaPrivateKey> for KeyPair {
    fn from(sk: RsaPrivateKey) -> Self {
        Self { sk }
    }
}

/// Serialized private key material, every integer as lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKey {
    pub n: String,
    pub e: String,
    pub d: String,
    pub p: String,
    pub q: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dmp1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dmq1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coeff: Option<String>,
}

impl TryFrom<&KeyPair> for StoredKey {
    type Error = Error;

    fn try_from(kp: &KeyPair) -> Result<Self> {
        let sk = kp.private_key();
        let (p, q) = match sk.primes() {
            [p, q] => (p, q),
            primes => {
                return Err(Error::invalid(format!(
                    "expected a two prime key, got {} primes",
                    primes.len()
                )))
            }
        };
        let one = BigUint::from(1u32);
        let dmp1 = sk.d() % (p - &one);
        let dmq1 = sk.d() % (q - &one);
        let coeff = mod_inverse(q, p);

        Ok(Self {
            n: biguint_to_hex(sk.n()),
            e: biguint_to_hex(sk.e()),
            d: biguint_to_hex(sk.d()),
            p: biguint_to_hex(p),
            q: biguint_to_hex(q),
            dmp1: Some(biguint_to_hex(&dmp1)),
            dmq1: Some(biguint_to_hex(&dmq1)),
            coeff: coeff.as_ref().map(biguint_to_hex),
        })
    }
}

impl TryFrom<&StoredKey> for KeyPair {
    type Error = Error;

    // CRT values are recomputed from the primes rather than trusted.
    fn try_from(stored: &StoredKey) -> Result<Self> {
        let sk = RsaPrivateKey::from_components(
            biguint_from_hex(&stored.n)?,
            biguint_from_hex(&stored.e)?,
            biguint_from_hex(&stored.d)?,
            vec![biguint_from_hex(&stored.p)?, biguint_from_hex(&stored.q)?],
        )?;
        sk.validate()?;
        Ok(Self { sk })
    }
}

/// The public half as published to other users.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    pub n: String,
    pub e: String,
}

impl From<&RsaPublicKey> for PublicKeyRecord {
    fn from(pk: &RsaPublicKey) -> Self {
        Self {
            n: biguint_to_hex(pk.n()),
            e: biguint_to_hex(pk.e()),
        }
    }
}

impl TryFrom<&PublicKeyRecord> for RsaPublicKey {
    type Error = Error;

    fn try_from(record: &PublicKeyRecord) -> Result<Self> {
        Ok(RsaPublicKey::new(
            biguint_from_hex(&record.n)?,
            biguint_from_hex(&record.e)?,
        )?)
    }
}

pub fn store_private_key<S: KeyValueStore + ?Sized>(
    store: &mut S,
    ns: &StoreNamespace,
    user_id: &str,
    kp: &KeyPair,
) -> Result<()> {
    require_non_empty(user_id, "user id")?;

    let stored = StoredKey::try_from(kp)?;
    let key = ns.private_key_key(user_id);
    store.set(&key, serde_json::to_vec(&stored)?)?;

    info!(user_id, "stored private key");
    Ok(())
}

pub fn load_private_key<S: KeyValueStore + ?Sized>(
    store: &S,
    ns: &StoreNamespace,
    user_id: &str,
) -> Result<KeyPair> {
    require_non_empty(user_id, "user id")?;

    let key = ns.private_key_key(user_id);
    let bytes = store
        .get(&key)?
        .ok_or_else(|| Error::NotFound(format!("no private key stored for {}", user_id)))?;
    let stored: StoredKey = serde_json::from_slice(&bytes)?;
    let kp = KeyPair::try_from(&stored)?;

    debug!(user_id, "retrieved private key");
    Ok(kp)
}
