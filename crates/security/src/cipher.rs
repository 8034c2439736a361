//! Credential cipher — AES-256-CBC encryption of secrets at rest.
//!
//! Platform access tokens and other long-lived credentials are never stored
//! in cleartext. Each value is encrypted under a 32-byte master key with a
//! fresh random IV and persisted as an opaque envelope string:
//!
//! ```text
//! <32-hex-char IV>:<hex ciphertext>
//! ```
//!
//! Failures on either direction degrade to `None` rather than propagating:
//! callers must branch on `None` ("secret not persisted" / "secret
//! unreadable") and decide their own remediation. Nothing past this
//! boundary ever sees partial or garbage plaintext.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use tracing::warn;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Filler byte for master secrets shorter than the key length.
const KEY_PAD_BYTE: u8 = b'0';

/// Encrypts and decrypts credential strings under a derived master key.
///
/// Built once from configuration at startup and shared freely: the key is
/// immutable and every call is a pure function over it.
pub struct CredentialCipher {
    key: [u8; KEY_LEN],
}

impl CredentialCipher {
    /// Create a cipher from the configured master secret.
    ///
    /// The key is the secret's bytes normalized to exactly 32: padded with
    /// `'0'` when shorter, truncated when longer. Rotating the secret
    /// orphans previously stored envelopes — there is no key versioning.
    pub fn new(master_secret: &str) -> Self {
        Self {
            key: derive_key(master_secret),
        }
    }

    /// Create a cipher from raw key bytes.
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Encrypt a credential for storage. Returns the envelope string, or
    /// `None` when there is nothing to store (empty input) or the cipher
    /// fails internally.
    pub fn encrypt(&self, plaintext: &str) -> Option<String> {
        if plaintext.is_empty() {
            return None;
        }

        let iv = generate_iv();
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        Some(format!("{}:{}", hex::encode(iv), hex::encode(ciphertext)))
    }

    /// Decrypt a stored envelope back to the credential. Returns `None` on
    /// empty input or any parse/cryptographic failure — bad hex, wrong key,
    /// corrupted padding. Never panics across this boundary.
    pub fn decrypt(&self, envelope: &str) -> Option<String> {
        if envelope.is_empty() {
            return None;
        }

        match self.try_decrypt(envelope) {
            Ok(plaintext) => Some(plaintext),
            Err(reason) => {
                warn!(reason = %reason, "credential decrypt failed");
                None
            }
        }
    }

    fn try_decrypt(&self, envelope: &str) -> Result<String, &'static str> {
        // The IV segment is exactly the first token; everything after the
        // first ':' is ciphertext hex.
        let (iv_hex, ct_hex) = envelope.split_once(':').ok_or("missing ':' separator")?;

        let iv: [u8; IV_LEN] = hex::decode(iv_hex)
            .map_err(|_| "iv segment is not valid hex")?
            .try_into()
            .map_err(|_| "iv segment is not 16 bytes")?;

        let ciphertext = hex::decode(ct_hex).map_err(|_| "ciphertext is not valid hex")?;

        let plaintext = Aes256CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| "bad padding — wrong key or corrupted ciphertext")?;

        String::from_utf8(plaintext).map_err(|_| "decrypted bytes are not valid UTF-8")
    }
}

/// Normalize the master secret to exactly 32 key bytes.
fn derive_key(master_secret: &str) -> [u8; KEY_LEN] {
    let mut key = [KEY_PAD_BYTE; KEY_LEN];
    let bytes = master_secret.as_bytes();
    let len = bytes.len().min(KEY_LEN);
    key[..len].copy_from_slice(&bytes[..len]);
    key
}

/// Generate a fresh random IV. Never reused across encryptions.
fn generate_iv() -> [u8; IV_LEN] {
    use rand::Rng;
    let mut rng = rand::rng();
    let mut iv = [0u8; IV_LEN];
    rng.fill(&mut iv[..]);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let cipher = CredentialCipher::new("my-master-secret");
        let plaintext = "EAAGm0PX4ZCpsBAxxxxx";

        let envelope = cipher.encrypt(plaintext).unwrap();
        assert_ne!(envelope, plaintext);

        assert_eq!(cipher.decrypt(&envelope).unwrap(), plaintext);
    }

    #[test]
    fn envelope_format() {
        let cipher = CredentialCipher::new("master");
        let envelope = cipher.encrypt("token").unwrap();

        let (iv_hex, ct_hex) = envelope.split_once(':').unwrap();
        assert_eq!(iv_hex.len(), 32);
        assert!(iv_hex.bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(!ct_hex.is_empty());
        assert_eq!(ct_hex.len() % 32, 0); // whole AES blocks
    }

    #[test]
    fn known_envelope_decrypts() {
        // Fixed-key vector: AES-256-CBC("tok_12345") under the key below
        // with IV 000102...0f. Catches algorithm or envelope drift.
        let cipher = CredentialCipher::from_key(*b"0123456789abcdef0123456789abcdef");
        let envelope = "000102030405060708090a0b0c0d0e0f:1fd89b7a54f76e2d6179831396ab5691";
        assert_eq!(cipher.decrypt(envelope).unwrap(), "tok_12345");
    }

    #[test]
    fn fresh_iv_per_call() {
        let cipher = CredentialCipher::new("master");
        let a = cipher.encrypt("same-token").unwrap();
        let b = cipher.encrypt("same-token").unwrap();

        assert_ne!(a, b);

        // Both still decrypt to the same value
        assert_eq!(cipher.decrypt(&a).unwrap(), "same-token");
        assert_eq!(cipher.decrypt(&b).unwrap(), "same-token");
    }

    #[test]
    fn empty_inputs_are_nothing_to_store() {
        let cipher = CredentialCipher::new("master");
        assert_eq!(cipher.encrypt(""), None);
        assert_eq!(cipher.decrypt(""), None);
    }

    #[test]
    fn short_master_secret_pads_and_roundtrips() {
        let cipher = CredentialCipher::new("shortkey");
        let envelope = cipher.encrypt("value").unwrap();
        assert_eq!(cipher.decrypt(&envelope).unwrap(), "value");

        // Padding is deterministic: the padded key equals the explicit one.
        let explicit = CredentialCipher::from_key(*b"shortkey000000000000000000000000");
        assert_eq!(explicit.decrypt(&envelope).unwrap(), "value");
    }

    #[test]
    fn long_master_secret_truncates_and_roundtrips() {
        let long = "0123456789abcdef0123456789abcdef-extra-tail";
        let cipher = CredentialCipher::new(long);
        let envelope = cipher.encrypt("value").unwrap();
        assert_eq!(cipher.decrypt(&envelope).unwrap(), "value");

        // Only the first 32 bytes participate in the key.
        let truncated = CredentialCipher::new(&long[..32]);
        assert_eq!(truncated.decrypt(&envelope).unwrap(), "value");
    }

    #[test]
    fn wrong_key_fails_closed() {
        // Fixed envelope (see known_envelope_decrypts) under a different key:
        // padding validation rejects it deterministically.
        let envelope = "000102030405060708090a0b0c0d0e0f:1fd89b7a54f76e2d6179831396ab5691";
        let other = CredentialCipher::new("wrong-master");
        assert_eq!(other.decrypt(envelope), None);
    }

    #[test]
    fn malformed_envelopes_return_none() {
        let cipher = CredentialCipher::new("master");
        let cases = [
            "no-separator",
            "nothex:deadbeef",
            "00ff:deadbeef",                                        // iv too short
            "000102030405060708090a0b0c0d0e0f:not-hex",             // bad ciphertext hex
            "000102030405060708090a0b0c0d0e0f:",                    // empty ciphertext
            "000102030405060708090a0b0c0d0e0f:deadbeef",            // not a whole block
            "000102030405060708090a0b0c0d0e0f:1fd8:9b7a",           // stray ':' in ciphertext
            ":deadbeef",
        ];
        for envelope in cases {
            assert_eq!(cipher.decrypt(envelope), None, "envelope {envelope:?}");
        }
    }

    #[test]
    fn tampered_ciphertext_fails_closed() {
        // Last byte of the known-good envelope flipped (0x91 -> 0x6e):
        // padding validation rejects it deterministically.
        let cipher = CredentialCipher::from_key(*b"0123456789abcdef0123456789abcdef");
        let tampered = "000102030405060708090a0b0c0d0e0f:1fd89b7a54f76e2d6179831396ab566e";
        assert_eq!(cipher.decrypt(tampered), None);
    }

    #[test]
    fn unicode_credentials_roundtrip() {
        let cipher = CredentialCipher::new("master");
        let plaintext = "døgnåpen-令牌-ключ";
        let envelope = cipher.encrypt(plaintext).unwrap();
        assert_eq!(cipher.decrypt(&envelope).unwrap(), plaintext);
    }

    #[test]
    fn long_credentials_roundtrip() {
        let cipher = CredentialCipher::new("master");
        let plaintext = "t".repeat(4096);
        let envelope = cipher.encrypt(&plaintext).unwrap();
        assert_eq!(cipher.decrypt(&envelope).unwrap(), plaintext);
    }
}
