use crate::envelope::{self, EnvelopeError, SealedEnvelope, IV_LEN};
use crate::kdf::{derive_key, SALT_LEN};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use rand_core::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum CryptoError {
    /// The envelope or the decrypted payload is not the expected shape.
    Format(String),
    /// Wrong password or tampered ciphertext. The two are not told apart.
    Authentication,
    Encrypt,
}

impl From<EnvelopeError> for CryptoError {
    fn from(err: EnvelopeError) -> Self {
        Self::Format(err.to_string())
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(message) => write!(f, "corrupt data: {message}"),
            Self::Authentication => f.write_str("incorrect password or corrupted data"),
            Self::Encrypt => f.write_str("encryption failed"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Serializes `records` to JSON and seals them under `password`.
///
/// Salt and iv come fresh from the OS RNG on every call.
pub fn seal<T: Serialize + ?Sized>(records: &T, password: &str) -> Result<String, CryptoError> {
    let plaintext =
        serde_json::to_vec(records).map_err(|err| CryptoError::Format(err.to_string()))?;

    let mut salt = [0u8; SALT_LEN];
    rand_core::OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; IV_LEN];
    rand_core::OsRng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Encrypt)?;
    let nonce = aes_gcm::Nonce::from_slice(&iv);
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_ref())
        .map_err(|_| CryptoError::Encrypt)?;

    Ok(envelope::encode(&SealedEnvelope::new(salt, iv, ciphertext))?)
}

/// Opens an envelope produced by [`seal`] and parses the plaintext as `T`.
pub fn unseal<T: DeserializeOwned>(text: &str, password: &str) -> Result<T, CryptoError> {
    let plaintext = unseal_bytes(text, password)?;
    serde_json::from_slice(&plaintext).map_err(|err| CryptoError::Format(err.to_string()))
}

fn unseal_bytes(text: &str, password: &str) -> Result<Vec<u8>, CryptoError> {
    let sealed = envelope::decode(text)?;
    let key = derive_key(password, &sealed.salt);
    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Authentication)?;
    let nonce = aes_gcm::Nonce::from_slice(&sealed.iv);
    cipher
        .decrypt(nonce, sealed.ciphertext.as_ref())
        .map_err(|_| CryptoError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::{seal, unseal, CryptoError};
    use crate::envelope;
    use serde_json::{json, Value};

    #[test]
    fn seal_then_unseal_returns_original_records() {
        let records = json!([
            { "id": "1", "title": "Picnic", "category": "Grupales" },
            { "id": "2", "title": "Ñandú", "description": "línea\nnueva" }
        ]);
        let text = seal(&records, "correct horse").expect("seal");
        let opened: Value = unseal(&text, "correct horse").expect("unseal");
        assert_eq!(opened, records);
    }

    #[test]
    fn unseal_with_other_password_is_authentication_error() {
        let text = seal(&json!({ "a": 1 }), "pw-one").expect("seal");
        let result = unseal::<Value>(&text, "pw-two");
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn corrupting_a_ciphertext_byte_is_authentication_error() {
        let text = seal(&json!({ "a": 1 }), "pw").expect("seal");
        let mut sealed = envelope::decode(&text).expect("decode");
        sealed.ciphertext[0] ^= 0x01;
        let tampered = envelope::encode(&sealed).expect("encode");

        let result = unseal::<Value>(&tampered, "pw");
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn flipping_any_byte_never_yields_plaintext() {
        let text = seal(&json!({ "a": 1 }), "pw").expect("seal");
        let sealed = envelope::decode(&text).expect("decode");
        // ciphertext is 7 bytes of `{"a":1}` plus the 16-byte tag
        assert_eq!(sealed.ciphertext.len(), 7 + 16);

        for index in [0, 3, 6, 7, 15, sealed.ciphertext.len() - 1] {
            let mut tampered = sealed.clone();
            tampered.ciphertext[index] = tampered.ciphertext[index].wrapping_add(1);
            let tampered = envelope::encode(&tampered).expect("encode");
            let result = unseal::<Value>(&tampered, "pw");
            assert!(
                matches!(result, Err(CryptoError::Authentication)),
                "byte {index} was accepted"
            );
        }
    }

    #[test]
    fn tampered_iv_or_salt_fails_authentication() {
        let text = seal(&json!({ "a": 1 }), "pw").expect("seal");

        let mut sealed = envelope::decode(&text).expect("decode");
        sealed.iv[0] ^= 0x80;
        let bad_iv = envelope::encode(&sealed).expect("encode");
        assert!(matches!(
            unseal::<Value>(&bad_iv, "pw"),
            Err(CryptoError::Authentication)
        ));

        let mut sealed = envelope::decode(&text).expect("decode");
        sealed.salt[5] ^= 0x80;
        let bad_salt = envelope::encode(&sealed).expect("encode");
        assert!(matches!(
            unseal::<Value>(&bad_salt, "pw"),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn two_seals_use_fresh_salt_iv_and_ciphertext() {
        let records = json!({ "a": 1 });
        let first = envelope::decode(&seal(&records, "pw").expect("seal")).expect("decode");
        let second = envelope::decode(&seal(&records, "pw").expect("seal")).expect("decode");
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn malformed_envelope_is_format_error() {
        let result = unseal::<Value>("{\"salt\": [1, 2]}", "pw");
        assert!(matches!(result, Err(CryptoError::Format(_))));
    }

    #[test]
    fn unexpected_plaintext_shape_is_format_error() {
        let text = seal(&json!("just a string"), "pw").expect("seal");
        let result = unseal::<Vec<Value>>(&text, "pw");
        assert!(matches!(result, Err(CryptoError::Format(_))));
    }
}
