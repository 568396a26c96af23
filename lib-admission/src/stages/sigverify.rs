//! Signature Stages
//!
//! Key resolution, cost bounding, pricing, verification, and the
//! replay-counter advance, in that order. Resolution must precede
//! every verification stage; the count limit bounds the pricing
//! stage's work; pricing runs before verification so an exhausted
//! budget is caught before the expensive cryptographic checks.

use std::sync::Arc;

use tracing::debug;

use lib_keys::{MultisigPublicKey, PublicKey, SignatureData};
use lib_types::Address;

use crate::context::TxContext;
use crate::errors::{AdmissionResult, RejectReason};
use crate::gas::SigGasConsumer;
use crate::keeper::{Account, AccountKeeper};
use crate::params::AdmissionParams;
use crate::sign_mode::{SignModeHandler, SignerData};
use crate::stage::{Next, Stage};
use crate::transaction::{SigVerifiableTx, SignatureEntry, Tx};

fn sig_view(tx: &dyn Tx) -> Result<&dyn SigVerifiableTx, RejectReason> {
    tx.as_sig_tx()
        .ok_or(RejectReason::MissingCapability("signatures"))
}

fn signer_account(
    keeper: &dyn AccountKeeper,
    signer: &Address,
) -> Result<Account, RejectReason> {
    keeper
        .get_account(signer)
        .ok_or(RejectReason::AccountNotFound(*signer))
}

/// Signers and their signature entries, with the position alignment
/// checked once up front
fn aligned_signatures(
    sig_tx: &dyn SigVerifiableTx,
) -> Result<Vec<(Address, SignatureEntry)>, RejectReason> {
    let signers = sig_tx.signers();
    let signatures = sig_tx.signatures();
    if signers.len() != signatures.len() {
        return Err(RejectReason::SignerCountMismatch {
            signers: signers.len(),
            signatures: signatures.len(),
        });
    }
    Ok(signers.into_iter().zip(signatures).collect())
}

// =============================================================================
// STAGE 9: PUBLIC KEY RESOLUTION
// =============================================================================

/// Registers transaction-declared keys on accounts that have none yet.
///
/// Must run before any signature-verification stage; a declared key
/// that does not hash to its signer's address is rejected here, so the
/// later stages can trust every registered key.
pub struct SetPubKey {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl SetPubKey {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl Stage for SetPubKey {
    fn name(&self) -> &'static str {
        "set-pubkey"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let sig_tx = sig_view(tx)?;
        let signers = sig_tx.signers();
        let pub_keys = sig_tx.pub_keys();

        for (index, signer) in signers.iter().enumerate() {
            let mut account = signer_account(self.account_keeper.as_ref(), signer)?;
            if account.pub_key.is_some() {
                continue;
            }
            let declared = pub_keys
                .get(index)
                .cloned()
                .flatten()
                .ok_or(RejectReason::MissingPubKey { signer: *signer })?;
            let derived = declared.address();
            if derived != *signer {
                return Err(RejectReason::PubKeyAddressMismatch {
                    signer: *signer,
                    derived,
                }
                .into());
            }
            debug!(target: "admission", signer = %signer, "registering public key");
            account.pub_key = Some(declared);
            self.account_keeper.set_account(account);
        }
        next.run(tx, ctx)
    }
}

// =============================================================================
// STAGE 10: SIGNATURE COUNT LIMIT
// =============================================================================

/// Bounds the total number of simple keys the pricing and verification
/// stages may be asked to process, counting multisig constituents
/// recursively.
#[derive(Debug, Clone)]
pub struct SigCountLimit {
    params: AdmissionParams,
}

impl SigCountLimit {
    pub fn new(params: AdmissionParams) -> Self {
        Self { params }
    }
}

impl Stage for SigCountLimit {
    fn name(&self) -> &'static str {
        "sig-count-limit"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let sig_tx = sig_view(tx)?;
        let mut total = 0usize;
        for key in sig_tx.pub_keys().into_iter().flatten() {
            let count = key
                .count_keys(self.params.max_multisig_depth)
                .map_err(|err| RejectReason::MultisigTooDeep { max: err.max })?;
            total = total.saturating_add(count);
            if total > self.params.max_signatures {
                return Err(RejectReason::TooManySignatures {
                    count: total,
                    max: self.params.max_signatures,
                }
                .into());
            }
        }
        next.run(tx, ctx)
    }
}

// =============================================================================
// STAGE 11: SIGNATURE GAS
// =============================================================================

/// Prices each signer's verification work through the configured gas
/// policy, using the key that stage 12 will actually verify against.
pub struct SigGasConsume {
    account_keeper: Arc<dyn AccountKeeper>,
    consumer: Arc<dyn SigGasConsumer>,
    params: AdmissionParams,
}

impl SigGasConsume {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        consumer: Arc<dyn SigGasConsumer>,
        params: AdmissionParams,
    ) -> Self {
        Self {
            account_keeper,
            consumer,
            params,
        }
    }
}

impl Stage for SigGasConsume {
    fn name(&self) -> &'static str {
        "sig-gas"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let sig_tx = sig_view(tx)?;
        for (signer, entry) in aligned_signatures(sig_tx)? {
            let account = signer_account(self.account_keeper.as_ref(), &signer)?;
            let key = account
                .pub_key
                .or_else(|| entry.pub_key.clone())
                .ok_or(RejectReason::MissingPubKey { signer })?;
            self.consumer
                .consume(ctx.gas_meter_mut(), &key, &entry.data, &self.params)?;
        }
        next.run(tx, ctx)
    }
}

// =============================================================================
// STAGE 12: SIGNATURE VERIFICATION
// =============================================================================

/// Verifies every signer's signature over the canonical payload and the
/// exact expected sequence number.
pub struct SigVerify {
    account_keeper: Arc<dyn AccountKeeper>,
    sign_mode_handler: Arc<dyn SignModeHandler>,
}

impl SigVerify {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        sign_mode_handler: Arc<dyn SignModeHandler>,
    ) -> Self {
        Self {
            account_keeper,
            sign_mode_handler,
        }
    }
}

impl Stage for SigVerify {
    fn name(&self) -> &'static str {
        "sig-verify"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let sig_tx = sig_view(tx)?;
        for (signer, entry) in aligned_signatures(sig_tx)? {
            let account = signer_account(self.account_keeper.as_ref(), &signer)?;

            // Replay protection: the declared sequence must equal the
            // stored one exactly, not merely not-precede it.
            if entry.sequence != account.sequence {
                return Err(RejectReason::WrongSequence {
                    signer,
                    expected: account.sequence,
                    got: entry.sequence,
                }
                .into());
            }

            let key = account
                .pub_key
                .clone()
                .ok_or(RejectReason::MissingPubKey { signer })?;

            // Unsigned drafts are admissible for gas estimation only.
            if ctx.is_simulate() && entry.data.is_empty() {
                continue;
            }

            let signer_data = SignerData {
                chain_id: ctx.chain_id().to_string(),
                account_number: account.account_number,
                sequence: account.sequence,
            };
            verify_signature_data(
                &key,
                &signer_data,
                &entry.data,
                self.sign_mode_handler.as_ref(),
                tx,
                signer,
            )?;
        }
        next.run(tx, ctx)
    }
}

/// Verify one signature payload against one key, recursing through
/// multisig structure.
fn verify_signature_data(
    key: &PublicKey,
    signer_data: &SignerData,
    data: &SignatureData,
    handler: &dyn SignModeHandler,
    tx: &dyn Tx,
    signer: Address,
) -> AdmissionResult<()> {
    match (key, data) {
        (PublicKey::Ed25519(_), SignatureData::Single { mode, signature }) => {
            let payload = handler
                .sign_bytes(*mode, signer_data, tx)
                .map_err(|err| RejectReason::UnresolvableSignMode {
                    mode: *mode,
                    reason: err.to_string(),
                })?;
            key.verify(&payload, signature)
                .map_err(|err| RejectReason::SignatureInvalid {
                    signer,
                    reason: err.to_string(),
                })?;
            Ok(())
        }
        (
            PublicKey::Multisig(MultisigPublicKey {
                threshold,
                public_keys,
            }),
            SignatureData::Multi { signatures },
        ) => {
            if signatures.len() != public_keys.len() {
                return Err(RejectReason::SignatureShapeMismatch { signer }.into());
            }
            let mut provided = 0usize;
            for (sub_key, slot) in public_keys.iter().zip(signatures) {
                if let Some(sub_data) = slot {
                    verify_signature_data(sub_key, signer_data, sub_data, handler, tx, signer)?;
                    provided += 1;
                }
            }
            if provided < *threshold as usize {
                return Err(RejectReason::MultisigThresholdUnmet {
                    signer,
                    provided,
                    threshold: *threshold,
                }
                .into());
            }
            Ok(())
        }
        _ => Err(RejectReason::SignatureShapeMismatch { signer }.into()),
    }
}

// =============================================================================
// STAGE 13: SEQUENCE INCREMENT
// =============================================================================

/// Advances every signer's stored sequence by exactly one.
///
/// Reached only after verification succeeded for all signers, so the
/// increments are all-or-nothing with respect to the chain outcome.
pub struct IncrementSequence {
    account_keeper: Arc<dyn AccountKeeper>,
}

impl IncrementSequence {
    pub fn new(account_keeper: Arc<dyn AccountKeeper>) -> Self {
        Self { account_keeper }
    }
}

impl Stage for IncrementSequence {
    fn name(&self) -> &'static str {
        "increment-sequence"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let sig_tx = sig_view(tx)?;
        for signer in sig_tx.signers() {
            let mut account = signer_account(self.account_keeper.as_ref(), &signer)?;
            account.sequence += 1;
            self.account_keeper.set_account(account);
        }
        next.run(tx, ctx)
    }
}
