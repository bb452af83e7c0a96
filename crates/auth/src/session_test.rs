use super::*;

fn crypto() -> TokenCrypto {
    TokenCrypto::new(&[1u8; 16], &[2u8; 32]).unwrap()
}

fn session() -> LoginSession {
    LoginSession {
        issued: 1_500_000_000,
        user: "sam".to_string(),
        prefixes: ["campus/building1/", "campus/building2/"]
            .into_iter()
            .map(String::from)
            .collect(),
    }
}

/// Hand-roll a token whose padded plaintext is `plaintext`, with a valid
/// MAC. Used to reach the key-compromise paths.
fn forge_with_real_keys(crypto: &TokenCrypto, plaintext: &[u8]) -> Vec<u8> {
    assert_eq!(plaintext.len() % BLOCK_SIZE, 0);
    let iv = [7u8; BLOCK_SIZE];
    let ciphertext = crypto.encrypt(&iv, plaintext);
    let mut mac = crypto.mac();
    mac.update(plaintext);
    let tag = mac.finalize().into_bytes();

    let mut token = Vec::new();
    token.extend_from_slice(&iv);
    token.extend_from_slice(&ciphertext);
    token.extend_from_slice(&tag);
    token
}

#[test]
fn test_key_validation() {
    assert!(matches!(
        TokenCrypto::new(&[0u8; 15], &[1u8; 32]),
        Err(AuthError::InvalidEncryptKeyLength(15))
    ));
    assert!(matches!(
        TokenCrypto::new(&[0u8; 16], &[1u8; 8]),
        Err(AuthError::InvalidMacKeyLength(8))
    ));
    assert!(matches!(
        TokenCrypto::new(&[3u8; 16], &[3u8; 16]),
        Err(AuthError::IdenticalKeys)
    ));
    assert!(TokenCrypto::new(&[0u8; 24], &[1u8; 16]).is_ok());
    assert!(TokenCrypto::new(&[0u8; 32], &[1u8; 64]).is_ok());
}

#[test]
fn test_roundtrip() {
    let crypto = crypto();
    let session = session();
    let token = crypto.encode(&session).unwrap();
    assert_eq!(crypto.open(&token), Some(session));
}

#[test]
fn test_roundtrip_all_key_sizes() {
    let session = session();
    for crypto in [
        TokenCrypto::new(&[1u8; 16], &[2u8; 32]).unwrap(),
        TokenCrypto::new(&[1u8; 24], &[2u8; 32]).unwrap(),
        TokenCrypto::new(&[1u8; 32], &[2u8; 16]).unwrap(),
    ] {
        let token = crypto.encode(&session).unwrap();
        assert_eq!(crypto.open(&token), Some(session.clone()));
    }
}

#[test]
fn test_token_length_formula() {
    let crypto = crypto();
    let session = session();
    let token = crypto.encode(&session).unwrap();

    let json_len = serde_json::to_vec(&session).unwrap().len();
    let padded = json_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
    assert_eq!(token.len(), BLOCK_SIZE + padded + MAC_SIZE);
}

#[test]
fn test_tampering_any_byte_fails() {
    let crypto = crypto();
    let token = crypto.encode(&session()).unwrap();

    for i in 0..token.len() {
        let mut tampered = token.clone();
        tampered[i] ^= 0x01;
        assert!(
            crypto.open(&tampered).is_none(),
            "tampered byte {} accepted",
            i
        );
    }
}

#[test]
fn test_wrong_keys_fail() {
    let crypto = crypto();
    let other = TokenCrypto::new(&[9u8; 16], &[8u8; 32]).unwrap();
    let token = crypto.encode(&session()).unwrap();
    assert!(other.open(&token).is_none());
}

#[test]
fn test_structural_preconditions() {
    let crypto = crypto();

    // Too short: must exceed blocksize + macsize
    assert!(crypto.open(&[0u8; BLOCK_SIZE + MAC_SIZE]).is_none());
    assert!(crypto.open(b"").is_none());

    // Ciphertext not a multiple of the block size
    let token = crypto.encode(&session()).unwrap();
    let mut truncated = token.clone();
    truncated.remove(BLOCK_SIZE + 3);
    assert!(crypto.open(&truncated).is_none());
}

#[test]
fn test_mac_valid_garbage_json_is_rejected() {
    let crypto = crypto();
    let mut plaintext = b"this is not json".to_vec();
    plaintext.resize(plaintext.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
    let token = forge_with_real_keys(&crypto, &plaintext);
    assert!(crypto.open(&token).is_none());
}

#[test]
fn test_mac_valid_null_json_is_rejected() {
    let crypto = crypto();
    let mut plaintext = b"null".to_vec();
    plaintext.resize(BLOCK_SIZE, 0);
    let token = forge_with_real_keys(&crypto, &plaintext);
    assert!(crypto.open(&token).is_none());
}

#[test]
fn test_mac_valid_overlong_padding_is_rejected() {
    let crypto = crypto();
    // A full block of NULs: padding length == blocksize
    let mut plaintext = serde_json::to_vec(&session()).unwrap();
    plaintext.resize(plaintext.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
    plaintext.extend_from_slice(&[0u8; BLOCK_SIZE]);
    let token = forge_with_real_keys(&crypto, &plaintext);
    assert!(crypto.open(&token).is_none());
}

#[test]
fn test_sessions_serialize_canonically() {
    // BTreeSet ordering makes the encoding independent of insertion order.
    let mut a = session();
    let mut b = session();
    a.prefixes = ["z/", "a/"].into_iter().map(String::from).collect();
    b.prefixes = ["a/", "z/"].into_iter().map(String::from).collect();
    assert_eq!(
        serde_json::to_vec(&a).unwrap(),
        serde_json::to_vec(&b).unwrap()
    );
}
