//! Wallet key handling
//!
//! SECURITY: This is the ONLY place where the trading key is parsed.
//! - The Ethereum key lives in alloy's PrivateKeySigner, the Solana key in
//!   a solana-sdk Keypair; both handle the crypto
//! - Keys are never serialized and never logged
//! - Only addresses/pubkeys and signing operations are exposed

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use crate::error::{Error, Result};

/// Ethereum signing wallet derived from the shared trading key.
pub struct EvmWallet {
    address: Address,
    wallet: EthereumWallet,
}

impl EvmWallet {
    /// Parse a hex-encoded private key (with or without 0x prefix).
    pub fn from_key(key: &SecretString) -> Result<Self> {
        let key_hex = key.expose_secret();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("invalid Ethereum private key: {e}")))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        Ok(Self { address, wallet })
    }

    /// Public address (safe to share).
    pub fn address(&self) -> Address {
        self.address
    }

    /// Wallet filler for alloy providers. Only exposes signing operations,
    /// not the raw key.
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

/// Solana signing wallet derived from the shared trading key.
pub struct SolanaWallet {
    keypair: Keypair,
}

impl SolanaWallet {
    /// Parse a base58-encoded 64-byte keypair.
    pub fn from_key(key: &SecretString) -> Result<Self> {
        let bytes = bs58::decode(key.expose_secret().trim())
            .into_vec()
            .map_err(|e| Error::Wallet(format!("invalid Solana private key encoding: {e}")))?;

        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| Error::Wallet(format!("invalid Solana private key: {e}")))?;

        Ok(Self { keypair })
    }

    /// Public key (safe to share).
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// The signing keypair, for transaction construction.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for SolanaWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaWallet")
            .field("pubkey", &self.keypair.pubkey())
            .field("keypair", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known test private key (DO NOT use in production!)
    const TEST_ETH_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn evm_wallet_derives_address() {
        let key = SecretString::from(TEST_ETH_KEY.to_string());
        let wallet = EvmWallet::from_key(&key).unwrap();
        assert_eq!(
            format!("{:?}", wallet.address()).to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn evm_wallet_rejects_garbage() {
        let key = SecretString::from("not-a-key".to_string());
        assert!(matches!(EvmWallet::from_key(&key), Err(Error::Wallet(_))));
    }

    #[test]
    fn evm_debug_redacts_key() {
        let key = SecretString::from(TEST_ETH_KEY.to_string());
        let wallet = EvmWallet::from_key(&key).unwrap();
        let debug_str = format!("{:?}", wallet);
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn solana_wallet_round_trips_base58() {
        let keypair = Keypair::new();
        let expected = keypair.pubkey();
        let key = SecretString::from(keypair.to_base58_string());

        let wallet = SolanaWallet::from_key(&key).unwrap();
        assert_eq!(wallet.pubkey(), expected);
    }

    #[test]
    fn solana_wallet_rejects_garbage() {
        let key = SecretString::from("0I l".to_string());
        assert!(matches!(SolanaWallet::from_key(&key), Err(Error::Wallet(_))));
    }

    #[test]
    fn solana_debug_redacts_key() {
        let keypair = Keypair::new();
        let key = SecretString::from(keypair.to_base58_string());
        let wallet = SolanaWallet::from_key(&key).unwrap();
        let debug_str = format!("{:?}", wallet);
        assert!(debug_str.contains("[REDACTED]"));
    }
}
