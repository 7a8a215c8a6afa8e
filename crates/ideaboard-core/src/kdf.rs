use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

pub const SALT_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derives the AES-256 key for a password and envelope salt.
///
/// PBKDF2-HMAC-SHA256 with a fixed iteration count. Keys are never cached;
/// every seal and unseal derives its own and drops it on return.
pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::{derive_key, SALT_LEN};

    #[test]
    fn derive_key_is_deterministic_for_same_inputs() {
        let salt = [7u8; SALT_LEN];
        assert_eq!(derive_key("hunter2", &salt), derive_key("hunter2", &salt));
    }

    #[test]
    fn derive_key_depends_on_password_and_salt() {
        let salt_a = [1u8; SALT_LEN];
        let salt_b = [2u8; SALT_LEN];
        let base = derive_key("pw", &salt_a);
        assert_ne!(base, derive_key("pw2", &salt_a));
        assert_ne!(base, derive_key("pw", &salt_b));
    }

    #[test]
    fn derive_key_handles_empty_password() {
        let key = derive_key("", &[0u8; SALT_LEN]);
        assert_ne!(key, [0u8; 32]);
    }
}
