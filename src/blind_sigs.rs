use crate::error::{Error, Result};
use crate::keys::KeyPair;
use crate::recovery;
use crate::store::{load_subscription, save_subscription, KeyValueStore, StoreNamespace};
use crate::utils::*;
use num_bigint_dig::RandBigInt;
use rand::{CryptoRng, RngCore};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::debug;

/// Default size of the random blinding factor, in bits.
pub const DEFAULT_BLINDING_BITS: usize = 1024;

/// The target's signature over a hashtag's padded digest.
///
/// Whoever holds it can derive the hashtag's message key, so it is
/// never logged and never published. Publish its [`Token`] instead.
#[derive(Clone, PartialEq, Eq)]
pub struct Sigma(BigUint);

impl Sigma {
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(biguint_from_hex(s)?))
    }

    pub fn to_hex(&self) -> String {
        biguint_to_hex(&self.0)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn token(&self) -> Token {
        Token::for_sigma_hex(&self.to_hex())
    }
}

impl fmt::Debug for Sigma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sigma(..)")
    }
}

impl From<BigUint> for Sigma {
    fn from(n: BigUint) -> Self {
        Self(n)
    }
}

/// `MD5(hex(sigma))`, a publishable fingerprint of a sigma.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn for_sigma_hex(sigma_hex: &str) -> Self {
        Self(md5_hex(sigma_hex.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The blinding factor a subscriber keeps until the approved value
/// comes back.
#[derive(Clone, PartialEq, Eq)]
pub struct BlindingRecord {
    pub hashtag: String,
    pub r: BigUint,
}

impl fmt::Debug for BlindingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlindingRecord")
            .field("hashtag", &self.hashtag)
            .finish_non_exhaustive()
    }
}

/// A blinded hashtag digest, `pad(SHA256(hashtag)) * r^e mod n`.
///
/// This is all the target ever sees of the hashtag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlindedRequest {
    blinded_msg: BigUint,
}

impl BlindedRequest {
    pub fn blinded_msg(&self) -> &BigUint {
        &self.blinded_msg
    }

    pub fn to_hex(&self) -> String {
        biguint_to_hex(&self.blinded_msg)
    }
}

impl From<BigUint> for BlindedRequest {
    fn from(blinded_msg: BigUint) -> Self {
        Self { blinded_msg }
    }
}

impl TryFrom<&str> for BlindedRequest {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Ok(Self::from(biguint_from_hex(s)?))
    }
}

/// A blinded request with the target's private key applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovedRequest {
    approved: BigUint,
}

impl ApprovedRequest {
    pub fn approved(&self) -> &BigUint {
        &self.approved
    }

    pub fn to_hex(&self) -> String {
        biguint_to_hex(&self.approved)
    }
}

impl From<BigUint> for ApprovedRequest {
    fn from(approved: BigUint) -> Self {
        Self { approved }
    }
}

impl TryFrom<&str> for ApprovedRequest {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Ok(Self::from(biguint_from_hex(s)?))
    }
}

/// The integer a hashtag is signed as: its SHA-256 hex digest,
/// deterministically padded to the width of `n`.
pub(crate) fn hashtag_representative(hashtag: &str, n: &BigUint) -> Result<BigUint> {
    let digest = sha256_hex(hashtag.as_bytes());
    pad_deterministic(&digest, byte_len(n))
}

fn private_op(sk: &RsaPrivateKey, m: &BigUint) -> BigUint {
    m.modpow(sk.d(), sk.n())
}

// r is redrawn until it is non-zero and invertible mod n, otherwise
// the approved value could never be unblinded.
fn draw_blinding_factor<R: RngCore + CryptoRng + ?Sized>(
    rng: &mut R,
    bits: usize,
    n: &BigUint,
) -> BigUint {
    loop {
        let r = rng.gen_biguint(bits);
        if mod_inverse(&r, n).is_some() {
            return r;
        }
    }
}

/// Signs a blinded request. Run by the target, which learns nothing
/// about the hashtag inside.
pub fn approve(kp: &KeyPair, request: &BlindedRequest) -> ApprovedRequest {
    let approved = private_op(kp.private_key(), request.blinded_msg());
    debug!("approved blinded request");
    ApprovedRequest::from(approved)
}

/// Sigma for a hashtag straight from the private key, without the
/// blind/unblind round trip.
pub fn compute_sigma_directly(kp: &KeyPair, hashtag: &str) -> Result<Sigma> {
    require_non_empty(hashtag, "hashtag")?;

    let m = hashtag_representative(hashtag, kp.modulus())?;
    Ok(Sigma(private_op(kp.private_key(), &m)))
}

/// The party that wants to follow a hashtag on a target without telling
/// the target which hashtag.
///
/// Keeps its blinding factors and sigmas in the injected store, under
/// keys scoped to (subscriber, target).
pub struct Subscriber<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    ns: StoreNamespace,
    id: String,
}

impl<'a, S: KeyValueStore + ?Sized> Subscriber<'a, S> {
    pub fn new(store: &'a mut S, id: &str) -> Result<Self> {
        Self::with_namespace(store, StoreNamespace::default(), id)
    }

    pub fn with_namespace(store: &'a mut S, ns: StoreNamespace, id: &str) -> Result<Self> {
        require_non_empty(id, "subscriber id")?;
        Ok(Self {
            store,
            ns,
            id: id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Blinds `hashtag` for the target owning `target_pk` and stores the
    /// blinding factor before handing back the request.
    ///
    /// A previous request in flight to the same target is replaced;
    /// sigmas already obtained are kept.
    pub fn create_blinded_token(
        &mut self,
        hashtag: &str,
        target_pk: &RsaPublicKey,
        bit_length: usize,
        target_id: &str,
    ) -> Result<(BlindedRequest, BlindingRecord)> {
        self.create_blinded_token_with(
            &mut rand::thread_rng(),
            hashtag,
            target_pk,
            bit_length,
            target_id,
        )
    }

    pub fn create_blinded_token_with<R: RngCore + CryptoRng + ?Sized>(
        &mut self,
        rng: &mut R,
        hashtag: &str,
        target_pk: &RsaPublicKey,
        bit_length: usize,
        target_id: &str,
    ) -> Result<(BlindedRequest, BlindingRecord)> {
        require_non_empty(hashtag, "hashtag")?;
        require_non_empty(target_id, "target id")?;

        // a short r leaves the padded digest recognisable to the target
        let n = target_pk.n();
        if bit_length < n.bits() {
            return Err(Error::invalid(format!(
                "bit length {} is below the {} bit modulus",
                bit_length,
                n.bits()
            )));
        }

        let m = hashtag_representative(hashtag, n)?;

        // y = m * r^e mod n
        let r = draw_blinding_factor(rng, bit_length, n);
        let encrypted_r = r.modpow(target_pk.e(), n);
        let blinded = (m * encrypted_r) % n;

        let key = self.ns.subscription_key(&self.id, target_id);
        let mut record = load_subscription(&*self.store, &key)?.unwrap_or_default();
        record.hashtag = Some(hashtag.to_string());
        record.r = Some(biguint_to_hex(&r));
        save_subscription(&mut *self.store, &key, &record)?;

        debug!(
            subscriber = %self.id,
            target = target_id,
            bit_length,
            "created blinded request"
        );

        let blinding = BlindingRecord {
            hashtag: hashtag.to_string(),
            r,
        };
        Ok((BlindedRequest::from(blinded), blinding))
    }

    /// Removes the blinding factor from an approved request, recovering
    /// sigma. The sigma is appended to the stored record; the blinding
    /// factor and the cleartext hashtag are dropped from it.
    pub fn unblind(
        &mut self,
        target_pk: &RsaPublicKey,
        target_id: &str,
        approved: &ApprovedRequest,
    ) -> Result<(Sigma, Token)> {
        require_non_empty(target_id, "target id")?;

        let key = self.ns.subscription_key(&self.id, target_id);
        let mut record = load_subscription(&*self.store, &key)?.ok_or_else(|| {
            Error::NotFound(format!("no blind request from {} to {}", self.id, target_id))
        })?;
        let r = match record.r.as_deref() {
            Some(r) => biguint_from_hex(r)?,
            None => {
                return Err(Error::NotFound(format!(
                    "no blind request from {} to {} in flight",
                    self.id, target_id
                )))
            }
        };

        // x = y * r^-1 mod n
        let n = target_pk.n();
        let r_inv = mod_inverse(&r, n)
            .ok_or_else(|| Error::invalid("blinding factor is not invertible for this key"))?;
        let sigma = (approved.approved() * r_inv) % n;

        if let Some(hashtag) = record.hashtag.as_deref() {
            let m = hashtag_representative(hashtag, n)?;
            if sigma.modpow(target_pk.e(), n) != m {
                return Err(Error::VerificationFailed);
            }
        }

        let sigma = Sigma(sigma);
        let token = sigma.token();

        record.r = None;
        record.hashtag = None;
        record.push_sigma(sigma.to_hex());
        save_subscription(&mut *self.store, &key, &record)?;

        debug!(
            subscriber = %self.id,
            target = target_id,
            token = %token,
            "unblinded approved request"
        );
        Ok((sigma, token))
    }

    /// See [`recovery::recover_sigma`].
    pub fn recover_sigma(&self, target_id: &str, token: &Token) -> Result<Option<String>> {
        recovery::recover_sigma(&*self.store, &self.ns, &self.id, target_id, token)
    }
}

/// The party being followed. Signs blinded requests and can compute
/// any hashtag's sigma directly.
#[derive(Clone, Debug)]
pub struct BlindSigner {
    kp: KeyPair,
}

impl BlindSigner {
    pub fn new(kp: KeyPair) -> Self {
        Self { kp }
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.kp.public_key()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.kp
    }

    pub fn approve(&self, request: &BlindedRequest) -> ApprovedRequest {
        approve(&self.kp, request)
    }

    pub fn sigma_for_hashtag(&self, hashtag: &str) -> Result<Sigma> {
        compute_sigma_directly(&self.kp, hashtag)
    }
}

impl From<KeyPair> for BlindSigner {
    fn from(kp: KeyPair) -> Self {
        Self::new(kp)
    }
}
