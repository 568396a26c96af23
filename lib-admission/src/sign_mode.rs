//! Signing-Mode Resolution
//!
//! A signature commits to a canonical byte payload derived from the
//! transaction, the chain id, and the signer's account state. The
//! resolver turns a declared sign mode into that payload; the pipeline
//! itself never interprets modes.

use serde::Serialize;
use sha2::{Digest, Sha256};

use lib_keys::SignMode;

use crate::transaction::Tx;

/// Signer-specific inputs to the signing payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerData {
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
}

/// Resolves a sign mode to the canonical payload a signature is
/// verified against
pub trait SignModeHandler: Send + Sync {
    fn sign_bytes(
        &self,
        mode: SignMode,
        signer: &SignerData,
        tx: &dyn Tx,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Canonical signing document for `SignMode::Direct`.
///
/// Committing to the body hash rather than the raw body keeps the
/// payload fixed-size; committing to account number and sequence makes
/// every payload unique per signer per transaction slot, which is what
/// makes sequence numbers an effective replay guard.
#[derive(Serialize)]
struct SignDoc<'a> {
    body_hash: [u8; 32],
    chain_id: &'a str,
    account_number: u64,
    sequence: u64,
}

/// Built-in resolver for `SignMode::Direct`
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSignModeHandler;

impl SignModeHandler for DirectSignModeHandler {
    fn sign_bytes(
        &self,
        mode: SignMode,
        signer: &SignerData,
        tx: &dyn Tx,
    ) -> anyhow::Result<Vec<u8>> {
        match mode {
            SignMode::Direct => {
                let sig_tx = tx
                    .as_sig_tx()
                    .ok_or_else(|| anyhow::anyhow!("transaction is not signature-verifiable"))?;
                let digest = Sha256::digest(sig_tx.body_bytes());
                let mut body_hash = [0u8; 32];
                body_hash.copy_from_slice(&digest);

                let doc = SignDoc {
                    body_hash,
                    chain_id: &signer.chain_id,
                    account_number: signer.account_number,
                    sequence: signer.sequence,
                };
                Ok(bincode::serialize(&doc)?)
            }
            other => anyhow::bail!("sign mode {:?} is not supported by the direct handler", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTx;

    fn signer_data(sequence: u64) -> SignerData {
        SignerData {
            chain_id: "testchain".to_string(),
            account_number: 3,
            sequence,
        }
    }

    #[test]
    fn test_direct_payload_is_deterministic() {
        let tx = MockTx::new();
        let handler = DirectSignModeHandler;

        let a = handler
            .sign_bytes(SignMode::Direct, &signer_data(5), &tx)
            .unwrap();
        let b = handler
            .sign_bytes(SignMode::Direct, &signer_data(5), &tx)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_direct_payload_commits_to_sequence() {
        let tx = MockTx::new();
        let handler = DirectSignModeHandler;

        let at_five = handler
            .sign_bytes(SignMode::Direct, &signer_data(5), &tx)
            .unwrap();
        let at_six = handler
            .sign_bytes(SignMode::Direct, &signer_data(6), &tx)
            .unwrap();
        assert_ne!(at_five, at_six);
    }

    #[test]
    fn test_direct_payload_commits_to_body() {
        let handler = DirectSignModeHandler;

        let mut tx = MockTx::new();
        tx.body = b"transfer 10 to alice".to_vec();
        let a = handler
            .sign_bytes(SignMode::Direct, &signer_data(0), &tx)
            .unwrap();

        tx.body = b"transfer 10 to mallory".to_vec();
        let b = handler
            .sign_bytes(SignMode::Direct, &signer_data(0), &tx)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_textual_mode_unsupported() {
        let tx = MockTx::new();
        let result = DirectSignModeHandler.sign_bytes(SignMode::Textual, &signer_data(0), &tx);
        assert!(result.is_err());
    }
}
