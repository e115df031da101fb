use blindtag::{
    cipher, first_hashtag, load_private_key, recover_sigma, store_private_key, ApprovedRequest,
    BlindSigner, BlindedRequest, KeyPair, MemoryStore, PublicKeyRecord, Result, RsaPublicKey,
    StoreNamespace, Subscriber, DEFAULT_BLINDING_BITS, DEFAULT_KEY_BITS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn follow_a_hashtag_and_read_tagged_messages() -> Result<()> {
    let ns = StoreNamespace::default();

    // bob, the target, keeps the private key in a separate store
    let mut bob_store = MemoryStore::new();
    let mut rng = StdRng::seed_from_u64(2013);
    store_private_key(
        &mut bob_store,
        &ns,
        "bob",
        &KeyPair::generate_with(&mut rng, DEFAULT_KEY_BITS)?,
    )?;
    let bob = BlindSigner::from(load_private_key(&bob_store, &ns, "bob")?);
    let published = PublicKeyRecord::from(&bob.public_key());

    // alice picks the hashtag out of one of bob's messages
    let hashtag = first_hashtag("release party #rustconf and #afterparty").unwrap();
    let bob_pk = RsaPublicKey::try_from(&published)?;

    let mut alice_store = MemoryStore::new();
    let mut alice = Subscriber::new(&mut alice_store, "alice")?;
    let (request, _) =
        alice.create_blinded_token(hashtag, &bob_pk, DEFAULT_BLINDING_BITS, "bob")?;

    // only hex crosses between them
    let request_hex = request.to_hex();
    let approved_hex = bob.approve(&BlindedRequest::try_from(request_hex.as_str())?).to_hex();

    let approved = ApprovedRequest::try_from(approved_hex.as_str())?;
    let (sigma, token) = alice.unblind(&bob_pk, "bob", &approved)?;
    assert_eq!(sigma, bob.sigma_for_hashtag("#rustconf")?);

    // bob posts under the hashtag, tagging the post with the token
    let posted = cipher::encrypt_for_hashtag(bob.key_pair(), "#rustconf", "doors open at 8")?;
    let tag = bob.sigma_for_hashtag("#rustconf")?.token();
    assert_eq!(tag, token);

    let sigma_hex = recover_sigma(&alice_store, &ns, "alice", "bob", &tag)?.unwrap();
    assert_eq!(cipher::decrypt(&sigma_hex, &posted)?, "doors open at 8");

    // a post under a hashtag alice never subscribed to does not match
    let other = bob.sigma_for_hashtag("#afterparty")?.token();
    assert_eq!(recover_sigma(&alice_store, &ns, "alice", "bob", &other)?, None);
    Ok(())
}
