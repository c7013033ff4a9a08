//! Key pair boundary
//!
//! Wraps the asymmetric primitive behind a small API so the rest of the
//! crate only sees opaque keys with `encrypt`/`decrypt`, plus session
//! token minting. On the wire a public key travels as two big-endian
//! byte strings: the modulus and the public exponent.

use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::error::{MaildropError, Result};

/// RSA key size used for freshly generated client key pairs
const KEY_BITS: usize = 512;

/// Exact byte length of a session token
pub const SESSION_TOKEN_LENGTH: usize = 32;

/// An opaque server-minted credential binding requests to an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken([u8; SESSION_TOKEN_LENGTH]);

impl SessionToken {
    /// Wrap raw token bytes, enforcing the length invariant
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let token: [u8; SESSION_TOKEN_LENGTH] = bytes
            .try_into()
            .map_err(|_| MaildropError::Validation("Session token is incorrect length".to_string()))?;
        Ok(Self(token))
    }

    /// The raw token bytes
    pub fn as_bytes(&self) -> &[u8; SESSION_TOKEN_LENGTH] {
        &self.0
    }
}

/// Generate a fresh random session token
pub fn generate_session_token() -> SessionToken {
    let mut bytes = [0u8; SESSION_TOKEN_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    SessionToken(bytes)
}

/// A user's public key, as registered with the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// The wire representation: big-endian modulus and exponent bytes
    pub fn components(&self) -> (Vec<u8>, Vec<u8>) {
        (self.inner.n().to_bytes_be(), self.inner.e().to_bytes_be())
    }

    /// Rebuild a public key from its wire components
    pub fn from_components(modulus: &[u8], exponent: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::new(
            BigUint::from_bytes_be(modulus),
            BigUint::from_bytes_be(exponent),
        )
        .map_err(|e| MaildropError::Crypto(format!("Invalid public key components: {}", e)))?;

        Ok(Self { inner: key })
    }

    /// Encrypt a short plaintext to the key's owner
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.inner
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| MaildropError::Crypto(format!("Encryption failed: {}", e)))
    }
}

/// A client's public/private key pair
pub struct KeyPair {
    public: PublicKey,
    private: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a fresh key pair
    pub fn generate() -> Result<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
            .map_err(|e| MaildropError::Crypto(format!("Key generation failed: {}", e)))?;

        let public = PublicKey {
            inner: RsaPublicKey::from(&private),
        };

        Ok(Self { public, private })
    }

    /// The public half of the key pair
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Decrypt a ciphertext addressed to this key pair
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.private
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|e| MaildropError::Crypto(format!("Decryption failed: {}", e)))
    }
}
