use crate::kdf::SALT_LEN;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const IV_LEN: usize = 12;

const FINGERPRINT_LEN: usize = 16;

#[derive(Debug)]
pub enum EnvelopeError {
    Malformed(serde_json::Error),
}

impl From<serde_json::Error> for EnvelopeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err)
    }
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(err) => write!(f, "malformed envelope: {err}"),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// Salt, nonce and AES-GCM output (ciphertext followed by the 16-byte tag).
/// Each field is encoded as a JSON array of numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    pub fn new(salt: [u8; SALT_LEN], iv: [u8; IV_LEN], ciphertext: Vec<u8>) -> Self {
        Self {
            salt,
            iv,
            ciphertext,
        }
    }
}

pub fn encode(envelope: &SealedEnvelope) -> Result<String, EnvelopeError> {
    Ok(serde_json::to_string(envelope)?)
}

pub fn decode(text: &str) -> Result<SealedEnvelope, EnvelopeError> {
    Ok(serde_json::from_str(text.trim())?)
}

/// Short SHA-256 digest of an encoded envelope, for logs and export summaries.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    let digest = hasher.finalize();
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}
