//! EIP-712 signing of `PriceUpdate` attestations for `BondOracle`.
//!
//! Ported from `signature_utils.py`'s manual domain-separator and
//! struct-hash computation to `alloy`'s `sol!`-derived typed-data
//! signing, which computes the identical hash from the same struct
//! definition the contract uses:
//!
//! ```solidity
//! struct PriceUpdate {
//!     string secid;
//!     uint160 price;
//!     uint256 nonce;
//!     uint256 deadline;
//! }
//! ```

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use alloy::sol;
use alloy::sol_types::{eip712_domain, SolStruct, SolValue};

use crate::error::{OracleError, Result};
use crate::types::SignedAttestation;

sol! {
    #[derive(Debug)]
    struct PriceUpdate {
        string secid;
        uint160 price;
        uint256 nonce;
        uint256 deadline;
    }
}

/// Signs `PriceUpdate` attestations on behalf of the Provider's configured
/// key, against the domain `BondOracle` expects.
pub struct Signer {
    key: PrivateKeySigner,
    chain_id: u64,
    verifying_contract: Address,
}

impl Signer {
    pub fn new(private_key_hex: &str, chain_id: u64, verifying_contract: Address) -> Result<Self> {
        let key = private_key_hex
            .parse::<PrivateKeySigner>()
            .map_err(|e| OracleError::Config(format!("invalid ETH private key: {e}")))?;
        Ok(Signer {
            key,
            chain_id,
            verifying_contract,
        })
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }

    /// Signs a `(secid, price, nonce, deadline)` tuple, returning the
    /// `0x`-prefixed hex of `abi.encode(bytes32 r, bytes32 s, uint8 v)`
    /// that `updatePriceFeedWithSignature` expects as its `signature` arg.
    pub async fn sign_price_update(
        &self,
        secid: &str,
        price: U256,
        nonce: u64,
        deadline: u64,
    ) -> Result<SignedAttestation> {
        let domain = eip712_domain! {
            name: "BondOracle",
            version: "1",
            chain_id: self.chain_id,
            verifying_contract: self.verifying_contract,
        };
        let update = PriceUpdate {
            secid: secid.to_string(),
            price,
            nonce: U256::from(nonce),
            deadline: U256::from(deadline),
        };

        let signature = self
            .key
            .sign_typed_data(&update, &domain)
            .await
            .map_err(|e| OracleError::Config(format!("signing failed: {e}")))?;

        let v: u8 = signature.recid().to_byte() + 27;
        let r = B256::from(signature.r());
        let s = B256::from(signature.s());
        let encoded = (r, s, v).abi_encode();

        Ok(SignedAttestation {
            secid: secid.to_string(),
            price_uint: price,
            nonce,
            deadline,
            signature: format!("0x{}", alloy::primitives::hex::encode(encoded)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> Signer {
        Signer::new(
            "e908f86dbb4d55ac876378565aafeabc187f6690f046459397b17d9b9a19688e",
            1,
            Address::ZERO,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn signature_is_deterministic_for_same_inputs() {
        let signer = test_signer();
        let a = signer
            .sign_price_update("SU26207RMFS9", U256::from(99_875u64), 1, 9_999_999_999)
            .await
            .unwrap();
        let b = signer
            .sign_price_update("SU26207RMFS9", U256::from(99_875u64), 1, 9_999_999_999)
            .await
            .unwrap();
        assert_eq!(a.signature, b.signature);
    }

    #[tokio::test]
    async fn different_nonce_changes_signature() {
        let signer = test_signer();
        let a = signer
            .sign_price_update("SU26207RMFS9", U256::from(99_875u64), 1, 9_999_999_999)
            .await
            .unwrap();
        let b = signer
            .sign_price_update("SU26207RMFS9", U256::from(99_875u64), 2, 9_999_999_999)
            .await
            .unwrap();
        assert_ne!(a.signature, b.signature);
    }

    #[tokio::test]
    async fn recovers_to_signer_address() {
        let signer = test_signer();
        let attestation = signer
            .sign_price_update("SU26207RMFS9", U256::from(99_875u64), 1, 9_999_999_999)
            .await
            .unwrap();
        assert!(attestation.signature.starts_with("0x"));
        assert_eq!(attestation.signature.len(), 2 + 96 * 2);

        let encoded = alloy::primitives::hex::decode(&attestation.signature[2..]).unwrap();
        let (r, s, v) = <(alloy::primitives::B256, alloy::primitives::B256, u8)>::abi_decode(&encoded)
            .unwrap();

        let domain = eip712_domain! {
            name: "BondOracle",
            version: "1",
            chain_id: 1u64,
            verifying_contract: Address::ZERO,
        };
        let update = PriceUpdate {
            secid: "SU26207RMFS9".to_string(),
            price: U256::from(99_875u64),
            nonce: U256::from(1u64),
            deadline: U256::from(9_999_999_999u64),
        };
        let digest = update.eip712_signing_hash(&domain);

        let recovery_signature = alloy::primitives::Signature::new(
            U256::from_be_bytes(r.0),
            U256::from_be_bytes(s.0),
            v - 27 != 0,
        );
        let recovered = recovery_signature.recover_address_from_prehash(&digest).unwrap();
        assert_eq!(recovered, signer.address());
    }
}
