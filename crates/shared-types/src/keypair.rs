//! # Ed25519 Keypair
//!
//! Local signing key used for freshly generated accounts and for the
//! local wallet identity.
//!
//! ## Security Properties
//!
//! - Deterministic nonces (no RNG dependency at signing time)
//! - Secret key zeroized on drop by `SigningKey` itself

use crate::capabilities::CoSigner;
use crate::entities::{Address, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// Ed25519 keypair whose public key is a ledger `Address`.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Public address of this keypair.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::new(self.signing_key.sign(message).to_bytes())
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl CoSigner for Keypair {
    fn address(&self) -> Address {
        Keypair::address(self)
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        self.sign(message)
    }
}

/// Verify `signature` over `message` by the key behind `signer`.
///
/// Returns `false` for addresses that are not valid curve points.
pub fn verify_signature(signer: &Address, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying_key.verify(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"counter initialize";

        let signature = keypair.sign(message);
        assert!(verify_signature(&keypair.address(), message, &signature));
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Keypair::generate();

        let signature = keypair.sign(b"message1");
        assert!(!verify_signature(&keypair.address(), b"message2", &signature));
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = Keypair::generate();
        let keypair2 = Keypair::generate();

        let signature = keypair1.sign(b"test");
        assert!(!verify_signature(&keypair2.address(), b"test", &signature));
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Keypair::from_seed([0xABu8; 32]);
        let message = b"deterministic test";

        assert_eq!(keypair.sign(message), keypair.sign(message));
    }

    #[test]
    fn test_roundtrip_seed() {
        let original = Keypair::generate();
        let restored = Keypair::from_seed(original.to_seed());

        assert_eq!(original.address(), restored.address());
    }
}
