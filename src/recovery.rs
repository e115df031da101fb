//! Matching a received token back to a held sigma.

use crate::blind_sigs::Token;
use crate::error::Result;
use crate::store::{load_subscription, KeyValueStore, StoreNamespace};
use crate::utils::require_non_empty;
use tracing::debug;

/// Finds the sigma, among those `subscriber_id` holds for `target_id`,
/// whose token equals `token`.
///
/// Tokens are one-way, so this is a linear scan. `Ok(None)` means the
/// message is not addressed to any hashtag the subscriber holds, which
/// is an expected outcome and not an error.
pub fn recover_sigma<S: KeyValueStore + ?Sized>(
    store: &S,
    ns: &StoreNamespace,
    subscriber_id: &str,
    target_id: &str,
    token: &Token,
) -> Result<Option<String>> {
    require_non_empty(subscriber_id, "subscriber id")?;
    require_non_empty(target_id, "target id")?;

    let key = ns.subscription_key(subscriber_id, target_id);
    let record = match load_subscription(store, &key)? {
        Some(record) => record,
        None => return Ok(None),
    };

    let found = record
        .sigmas()
        .iter()
        .find(|sigma| Token::for_sigma_hex(sigma) == *token)
        .cloned();

    debug!(
        subscriber = subscriber_id,
        target = target_id,
        token = %token,
        held = record.sigmas().len(),
        matched = found.is_some(),
        "token recovery"
    );
    Ok(found)
}
