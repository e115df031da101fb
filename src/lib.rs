mod blind_sigs;
pub mod cipher;
mod error;
mod hashtag;
pub mod key_derivation;
mod keys;
mod recovery;
mod store;
mod utils;

pub use crate::blind_sigs::{
    approve, compute_sigma_directly, ApprovedRequest, BlindSigner, BlindedRequest,
    BlindingRecord, Sigma, Subscriber, Token, DEFAULT_BLINDING_BITS,
};
pub use crate::error::{BlindTagError, Error, Result};
pub use crate::hashtag::{extract_hashtags, first_hashtag};
pub use crate::keys::{
    load_private_key, store_private_key, KeyPair, PublicKeyRecord, StoredKey, DEFAULT_KEY_BITS,
};
pub use crate::recovery::recover_sigma;
pub use crate::store::{
    KeyValueStore, MemoryStore, StoreNamespace, SubscriptionRecord, DEFAULT_PRIVATE_KEY_PREFIX,
    DEFAULT_REQUEST_TOKEN_PREFIX,
};

pub use rsa::{BigUint, RsaPublicKey};
