//! BLS12-381 Collective Signatures
//!
//! Provides the BLS primitives a collective authority needs:
//! - Key generation (random or from a fixed seed)
//! - Sign/verify over arbitrary messages
//! - Signature and public key aggregation
//!
//! Uses blst's `min_pk` variant: 48-byte public keys, 96-byte signatures.

use blst::min_pk::{AggregatePublicKey, AggregateSignature, PublicKey, SecretKey, Signature};
use blst::BLST_ERROR;
use rand::RngCore;

use crate::CryptoError;

/// Domain separation tag for BLS signatures (Ethereum 2.0 compatible)
const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Compressed public key length.
pub const PUBLIC_KEY_SIZE: usize = 48;

/// Compressed signature length.
pub const SIGNATURE_SIZE: usize = 96;

/// BLS public key (48 bytes compressed)
#[derive(Clone, Debug)]
pub struct BlsPublicKey(PublicKey);

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsPublicKey {}

/// BLS signature (96 bytes)
#[derive(Clone, Debug)]
pub struct BlsSignature(Signature);

impl PartialEq for BlsSignature {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BlsSignature {}

/// BLS key pair held by one member of a collective authority.
pub struct BlsKeyPair {
    secret: SecretKey,
    public: BlsPublicKey,
}

impl BlsKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut ikm = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut ikm);
        Self::from_seed(&ikm)
    }

    /// Derive a key pair deterministically from 32 bytes of key material.
    pub fn from_seed(ikm: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::key_gen(ikm, &[])
            .map_err(|e| CryptoError::KeyGenerationFailed(format!("{:?}", e)))?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Create from existing secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public = BlsPublicKey(secret.sk_to_pk());
        Ok(Self { secret, public })
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> BlsSignature {
        BlsSignature(self.secret.sign(message, DST, &[]))
    }

    /// Get the public key.
    pub fn public_key(&self) -> BlsPublicKey {
        self.public.clone()
    }
}

impl BlsPublicKey {
    /// Verify a signature against this public key.
    pub fn verify(&self, message: &[u8], signature: &BlsSignature) -> Result<(), CryptoError> {
        match signature.0.verify(true, message, DST, &[], &self.0, true) {
            BLST_ERROR::BLST_SUCCESS => Ok(()),
            _ => Err(CryptoError::SignatureVerificationFailed),
        }
    }

    /// Parse a compressed key of any slice length (must be 48 bytes).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        PublicKey::from_bytes(bytes)
            .map(BlsPublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Serialize to 48-byte compressed form.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Aggregate multiple public keys into one.
    ///
    /// The aggregated key verifies signatures aggregated from the same signers.
    pub fn aggregate(keys: &[BlsPublicKey]) -> Result<Self, CryptoError> {
        if keys.is_empty() {
            return Err(CryptoError::InvalidInput("empty key list".into()));
        }
        let refs: Vec<&PublicKey> = keys.iter().map(|k| &k.0).collect();
        AggregatePublicKey::aggregate(&refs, true)
            .map(|apk| BlsPublicKey(apk.to_public_key()))
            .map_err(|_| CryptoError::AggregationFailed)
    }
}

impl BlsSignature {
    /// Parse a signature of any slice length (must be 96 bytes).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: SIGNATURE_SIZE,
                actual: bytes.len(),
            });
        }
        Signature::from_bytes(bytes)
            .map(BlsSignature)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Serialize to 96-byte form.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.0.to_bytes()
    }

    /// Aggregate multiple signatures into one.
    pub fn aggregate(sigs: &[BlsSignature]) -> Result<Self, CryptoError> {
        if sigs.is_empty() {
            return Err(CryptoError::InvalidInput("empty signature list".into()));
        }
        let refs: Vec<&Signature> = sigs.iter().map(|s| &s.0).collect();
        AggregateSignature::aggregate(&refs, true)
            .map(|asig| BlsSignature(asig.to_signature()))
            .map_err(|_| CryptoError::AggregationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bls_sign_verify_roundtrip() {
        let keypair = BlsKeyPair::generate().unwrap();
        let message = b"test message";
        let signature = keypair.sign(message);
        assert!(keypair.public_key().verify(message, &signature).is_ok());
    }

    #[test]
    fn test_bls_wrong_message_rejected() {
        let keypair = BlsKeyPair::generate().unwrap();
        let signature = keypair.sign(b"test message");
        assert_eq!(
            keypair.public_key().verify(b"wrong message", &signature),
            Err(CryptoError::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_bls_different_key_rejected() {
        let keypair1 = BlsKeyPair::generate().unwrap();
        let keypair2 = BlsKeyPair::generate().unwrap();
        let signature = keypair1.sign(b"test message");
        assert!(keypair2.public_key().verify(b"test message", &signature).is_err());
    }

    #[test]
    fn test_bls_aggregate_signatures() {
        let kp1 = BlsKeyPair::generate().unwrap();
        let kp2 = BlsKeyPair::generate().unwrap();
        let message = b"same message";

        let agg_sig = BlsSignature::aggregate(&[kp1.sign(message), kp2.sign(message)]).unwrap();
        let agg_pk = BlsPublicKey::aggregate(&[kp1.public_key(), kp2.public_key()]).unwrap();

        assert!(agg_pk.verify(message, &agg_sig).is_ok());
    }

    #[test]
    fn test_bls_partial_aggregate_rejected() {
        let kp1 = BlsKeyPair::generate().unwrap();
        let kp2 = BlsKeyPair::generate().unwrap();
        let message = b"same message";

        // Only one of the two members signed.
        let agg_pk = BlsPublicKey::aggregate(&[kp1.public_key(), kp2.public_key()]).unwrap();
        assert!(agg_pk.verify(message, &kp1.sign(message)).is_err());
    }

    #[test]
    fn test_bls_aggregate_empty_fails() {
        assert!(BlsSignature::aggregate(&[]).is_err());
        assert!(BlsPublicKey::aggregate(&[]).is_err());
    }

    #[test]
    fn test_bls_slice_length_checked() {
        assert!(matches!(
            BlsPublicKey::from_slice(&[1u8; 47]),
            Err(CryptoError::InvalidKeyLength { expected: 48, actual: 47 })
        ));
        assert!(matches!(
            BlsSignature::from_slice(&[1u8; 95]),
            Err(CryptoError::InvalidKeyLength { expected: 96, actual: 95 })
        ));
    }

    #[test]
    fn test_bls_serialization_roundtrip() {
        let keypair = BlsKeyPair::generate().unwrap();
        let message = b"test message";
        let signature = keypair.sign(message);

        let pk_restored = BlsPublicKey::from_slice(&keypair.public_key().to_bytes()).unwrap();
        assert_eq!(keypair.public_key(), pk_restored);

        let sig_restored = BlsSignature::from_slice(&signature.to_bytes()).unwrap();
        assert_eq!(signature, sig_restored);

        assert!(pk_restored.verify(message, &sig_restored).is_ok());
    }

    #[test]
    fn test_bls_from_seed_is_deterministic() {
        let a = BlsKeyPair::from_seed(&[9u8; 32]).unwrap();
        let b = BlsKeyPair::from_seed(&[9u8; 32]).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"m"), b.sign(b"m"));
    }
}
