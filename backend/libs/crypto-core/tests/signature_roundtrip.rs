use crypto_core::{CryptoError, SignatureCodec};

#[test]
fn shared_secret_decodes_across_instances() {
    // Gateway mints, backend validates with its own codec instance.
    let gateway = SignatureCodec::new("your-encryption-key").expect("gateway codec");
    let backend = SignatureCodec::new("your-encryption-key").expect("backend codec");

    let token = gateway
        .encrypt(Some("100"), "200", 4_102_444_800)
        .expect("encrypt");
    let decoded = backend.validate(&token, 1_700_000_000).expect("validate");

    assert_eq!(decoded.item_id.as_deref(), Some("100"));
    assert_eq!(decoded.media_source_id, "200");
    assert_eq!(decoded.expire_at, 4_102_444_800);
    assert_eq!(gateway.fingerprint(), backend.fingerprint());
}

#[test]
fn token_survives_query_string_encoding() {
    let codec = SignatureCodec::new("k").expect("codec");
    let token = codec.encrypt(None, "mediasource_9", 4_102_444_800).expect("encrypt");

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("signature", &token)
        .finish();
    assert_eq!(query, format!("signature={}", token));
}

#[test]
fn foreign_secret_is_rejected() {
    let ours = SignatureCodec::new("secret-a").expect("codec");
    let theirs = SignatureCodec::new("secret-b").expect("codec");

    let token = theirs.encrypt(Some("1"), "2", 4_102_444_800).expect("encrypt");
    let err = ours.decrypt(&token).expect_err("must not decode");
    assert!(matches!(err, CryptoError::Decryption(_)));
}
