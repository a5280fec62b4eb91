//! Signing capability bound to the wallet's default key.
//!
//! Every operation re-reads the default key from the wallet, so a
//! `Wallet::set_default` call takes effect on the very next signature —
//! there is no cached key material here.

use crate::error::{AntError, AntResult};
use crate::statestore::ByteStore;
use crate::wallet::Wallet;
use alloy_primitives::{Address, B256, PrimitiveSignature, PublicKey};
use alloy_signer::{Signer as AlloySigner, SignerSync};
use alloy_sol_types::{Eip712Domain, SolStruct};

pub struct Signer<'a, S: ByteStore> {
    wallet: &'a Wallet<S>,
}

impl<'a, S: ByteStore> Signer<'a, S> {
    pub fn new(wallet: &'a Wallet<S>) -> Self {
        Self { wallet }
    }

    fn default_signer(&self) -> AntResult<alloy_signer_local::PrivateKeySigner> {
        self.wallet.get_default()?.signer()
    }

    pub fn ethereum_address(&self) -> AntResult<Address> {
        Ok(self.default_signer()?.address())
    }

    /// The default key's public key. Derived by signing and then recovering
    /// a fixed probe hash, rather than reaching into signer internals for a
    /// key-material accessor.
    pub fn public_key(&self) -> AntResult<PublicKey> {
        let signer = self.default_signer()?;
        let probe = B256::ZERO;
        let signature = signer
            .sign_hash_sync(&probe)
            .map_err(|e| AntError::InvalidSignature(e.to_string()))?;
        signature
            .recover_from_prehash(&probe)
            .map_err(|e| AntError::InvalidSignature(e.to_string()))
    }

    /// EIP-191 `personal_sign`: 65-byte `r||s||v` signature over the
    /// `"\x19Ethereum Signed Message:\n" + len + data` envelope.
    pub fn sign(&self, data: &[u8]) -> AntResult<[u8; 65]> {
        let signer = self.default_signer()?;
        let signature = signer
            .sign_message_sync(data)
            .map_err(|e| AntError::InvalidSignature(e.to_string()))?;
        Ok(signature.as_bytes())
    }

    /// Recovers the signer's public key from an EIP-191 signature + original
    /// data.
    pub fn recover(&self, signature: &[u8], data: &[u8]) -> AntResult<PublicKey> {
        let sig = parse_signature(signature)?;
        sig.recover_from_msg(data)
            .map_err(|e| AntError::InvalidSignature(e.to_string()))
    }

    /// EIP-712 typed-data signature (same 65-byte layout as `sign`).
    pub fn sign_typed_data<T: SolStruct>(
        &self,
        domain: &Eip712Domain,
        value: &T,
    ) -> AntResult<[u8; 65]> {
        let signer = self.default_signer()?;
        let hash = value.eip712_signing_hash(domain);
        let signature = signer
            .sign_hash_sync(&hash)
            .map_err(|e| AntError::InvalidSignature(e.to_string()))?;
        Ok(signature.as_bytes())
    }

    /// Recovers the signer's public key from an EIP-712 signature + the same
    /// domain/value pair that produced it.
    pub fn recover_typed<T: SolStruct>(
        &self,
        signature: &[u8],
        domain: &Eip712Domain,
        value: &T,
    ) -> AntResult<PublicKey> {
        let sig = parse_signature(signature)?;
        let hash = value.eip712_signing_hash(domain);
        sig.recover_from_prehash(&hash)
            .map_err(|e| AntError::InvalidSignature(e.to_string()))
    }

    /// Raw transaction signing primitive; the transaction facade (§4.4A)
    /// owns request construction, nonce/gas filling, and submission.
    pub fn sign_hash(&self, hash: &B256) -> AntResult<[u8; 65]> {
        let signer = self.default_signer()?;
        let signature = signer
            .sign_hash_sync(hash)
            .map_err(|e| AntError::InvalidSignature(e.to_string()))?;
        Ok(signature.as_bytes())
    }
}

fn parse_signature(bytes: &[u8]) -> AntResult<PrimitiveSignature> {
    if bytes.len() != 65 {
        return Err(AntError::InvalidSignature(format!(
            "expected 65-byte signature, got {}",
            bytes.len()
        )));
    }
    PrimitiveSignature::try_from(bytes).map_err(|e| AntError::InvalidSignature(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statestore::MemoryByteStore;
    use crate::statestore::StateStore;

    fn signer_fixture() -> (Wallet<MemoryByteStore>, Address) {
        let wallet = Wallet::new(StateStore::new(MemoryByteStore::new()));
        let addr = wallet.new_address().unwrap();
        (wallet, addr)
    }

    #[test]
    fn sign_then_recover_round_trips() {
        let (wallet, addr) = signer_fixture();
        let signer = Signer::new(&wallet);
        let message = b"hello ant";
        let signature = signer.sign(message).unwrap();
        assert_eq!(signature.len(), 65);
        let recovered = signer.recover(&signature, message).unwrap();
        assert_eq!(recovered.address(), addr);
        assert_eq!(signer.public_key().unwrap(), recovered);
    }

    #[test]
    fn recover_rejects_wrong_length_signature() {
        let (wallet, _addr) = signer_fixture();
        let signer = Signer::new(&wallet);
        let err = signer.recover(&[0u8; 10], b"data").unwrap_err();
        assert!(matches!(err, AntError::InvalidSignature(_)));
    }

    #[test]
    fn signer_follows_default_changes() {
        let (wallet, first) = signer_fixture();
        let second = wallet.new_address().unwrap();
        let signer = Signer::new(&wallet);
        assert_eq!(signer.ethereum_address().unwrap(), first);
        wallet.set_default(&second).unwrap();
        assert_eq!(signer.ethereum_address().unwrap(), second);
    }
}
