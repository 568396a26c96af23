//! Fee Stages
//!
//! The floor check is mempool policy and is skipped for simulations;
//! the deduction is consensus behavior and is not. Deduction resolves
//! the payer once and caches it on the context for later stages.

use std::sync::Arc;

use tracing::debug;

use crate::context::TxContext;
use crate::errors::{AdmissionResult, RejectReason};
use crate::keeper::{AccountKeeper, BankKeeper, FeegrantKeeper};
use crate::params::AdmissionParams;
use crate::stage::{Next, Stage};
use crate::transaction::Tx;

use lib_types::Address;

/// Stage 3: reject fees below the configured minimum
#[derive(Debug, Clone)]
pub struct MempoolFeeFloor {
    params: AdmissionParams,
}

impl MempoolFeeFloor {
    pub fn new(params: AdmissionParams) -> Self {
        Self { params }
    }
}

impl Stage for MempoolFeeFloor {
    fn name(&self) -> &'static str {
        "mempool-fee-floor"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        // Simulations estimate gas for unsigned drafts; holding them to
        // the mempool floor would make estimation circular.
        if ctx.is_simulate() {
            return next.run(tx, ctx);
        }
        let fee_tx = tx
            .as_fee_tx()
            .ok_or(RejectReason::MissingCapability("fee"))?;
        if fee_tx.fee() < self.params.min_fee {
            debug!(target: "admission", got = %fee_tx.fee(), min = %self.params.min_fee, "fee below floor");
            return Err(RejectReason::FeeBelowFloor {
                got: fee_tx.fee(),
                min: self.params.min_fee,
            }
            .into());
        }
        next.run(tx, ctx)
    }
}

/// Stage 8: resolve the fee payer and move the fee
pub struct DeductFee {
    account_keeper: Arc<dyn AccountKeeper>,
    bank_keeper: Arc<dyn BankKeeper>,
    feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
}

impl DeductFee {
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        bank_keeper: Arc<dyn BankKeeper>,
        feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    ) -> Self {
        Self {
            account_keeper,
            bank_keeper,
            feegrant_keeper,
        }
    }

    /// Explicit payer field, else the first signer
    fn resolve_payer(&self, tx: &dyn Tx) -> Result<Address, RejectReason> {
        let fee_tx = tx
            .as_fee_tx()
            .ok_or(RejectReason::MissingCapability("fee"))?;
        if let Some(payer) = fee_tx.fee_payer() {
            return Ok(payer);
        }
        let sig_tx = tx
            .as_sig_tx()
            .ok_or(RejectReason::MissingCapability("signatures"))?;
        sig_tx
            .signers()
            .first()
            .copied()
            .ok_or(RejectReason::NoSigners)
    }
}

impl Stage for DeductFee {
    fn name(&self) -> &'static str {
        "deduct-fee"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let fee_tx = tx
            .as_fee_tx()
            .ok_or(RejectReason::MissingCapability("fee"))?;
        let fee = fee_tx.fee();
        let payer = self.resolve_payer(tx)?;

        // A granter distinct from the payer must be authorized before
        // its account is charged in the payer's stead.
        let charged = match fee_tx.fee_granter() {
            Some(granter) if granter != payer => {
                let keeper = self
                    .feegrant_keeper
                    .as_ref()
                    .ok_or(RejectReason::FeeGrantsDisabled)?;
                keeper
                    .use_granted_fees(&granter, &payer, fee, tx)
                    .map_err(|err| RejectReason::FeeGrant {
                        granter,
                        grantee: payer,
                        reason: err.to_string(),
                    })?;
                granter
            }
            _ => payer,
        };

        if self.account_keeper.get_account(&charged).is_none() {
            return Err(RejectReason::AccountNotFound(charged).into());
        }

        if fee > 0 {
            self.bank_keeper
                .send_coins_from_account_to_module(&charged, fee)
                .map_err(|err| RejectReason::FeePayment {
                    payer: charged,
                    reason: err.to_string(),
                })?;
        }

        ctx.set_fee_payer(charged);
        next.run(tx, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AdmissionError;
    use crate::stage::AdmissionPipeline;
    use crate::testing::{MemoryAccountKeeper, MemoryBankKeeper, MemoryFeegrantKeeper, MockTx};
    use lib_types::Amount;

    fn floor_chain(min_fee: Amount) -> AdmissionPipeline {
        let mut params = AdmissionParams::default();
        params.min_fee = min_fee;
        AdmissionPipeline::new(vec![Arc::new(MempoolFeeFloor::new(params))])
    }

    #[test]
    fn test_fee_floor_rejects_low_fee() {
        let chain = floor_chain(1_000);
        let mut tx = MockTx::new();
        tx.fee = 999;
        let mut ctx = TxContext::new("testchain", 1, 0);

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Rejected(RejectReason::FeeBelowFloor {
                got: 999,
                min: 1_000
            })
        );
    }

    #[test]
    fn test_fee_floor_skipped_in_simulation() {
        let chain = floor_chain(1_000);
        let mut tx = MockTx::new();
        tx.fee = 0;
        let mut ctx = TxContext::new_simulate("testchain", 1, 0);
        chain.run(&tx, &mut ctx).unwrap();
    }

    #[test]
    fn test_fee_floor_exact_fee_passes() {
        let chain = floor_chain(1_000);
        let mut tx = MockTx::new();
        tx.fee = 1_000;
        let mut ctx = TxContext::new("testchain", 1, 0);
        chain.run(&tx, &mut ctx).unwrap();
    }

    fn deduct_chain(
        accounts: Arc<MemoryAccountKeeper>,
        bank: Arc<MemoryBankKeeper>,
        feegrant: Option<Arc<MemoryFeegrantKeeper>>,
    ) -> AdmissionPipeline {
        AdmissionPipeline::new(vec![Arc::new(DeductFee::new(
            accounts,
            bank,
            feegrant.map(|keeper| keeper as Arc<dyn FeegrantKeeper>),
        ))])
    }

    #[test]
    fn test_deducts_from_first_signer() {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let signer = Address::new([1u8; 32]);
        accounts.add_account(crate::keeper::Account::new(signer, 1));
        bank.set_balance(signer, 10_000);

        let chain = deduct_chain(accounts, bank.clone(), None);
        let mut tx = MockTx::new().with_signer_address(signer);
        tx.fee = 2_000;
        let mut ctx = TxContext::new("testchain", 1, 0);

        chain.run(&tx, &mut ctx).unwrap();
        assert_eq!(bank.balance_of(&signer), 8_000);
        assert_eq!(bank.collected(), 2_000);
        assert_eq!(ctx.fee_payer(), Some(signer));
    }

    #[test]
    fn test_insufficient_balance_rejected() {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let signer = Address::new([1u8; 32]);
        accounts.add_account(crate::keeper::Account::new(signer, 1));
        bank.set_balance(signer, 100);

        let chain = deduct_chain(accounts, bank, None);
        let mut tx = MockTx::new().with_signer_address(signer);
        tx.fee = 2_000;
        let mut ctx = TxContext::new("testchain", 1, 0);

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::Rejected(RejectReason::FeePayment { .. })
        ));
    }

    #[test]
    fn test_missing_account_rejected() {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let signer = Address::new([1u8; 32]);

        let chain = deduct_chain(accounts, bank, None);
        let mut tx = MockTx::new().with_signer_address(signer);
        tx.fee = 2_000;
        let mut ctx = TxContext::new("testchain", 1, 0);

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Rejected(RejectReason::AccountNotFound(signer))
        );
    }

    #[test]
    fn test_granter_charged_instead_of_payer() {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let feegrant = Arc::new(MemoryFeegrantKeeper::new());

        let signer = Address::new([1u8; 32]);
        let granter = Address::new([2u8; 32]);
        accounts.add_account(crate::keeper::Account::new(signer, 1));
        accounts.add_account(crate::keeper::Account::new(granter, 2));
        bank.set_balance(granter, 10_000);
        feegrant.grant(granter, signer, 5_000);

        let chain = deduct_chain(accounts, bank.clone(), Some(feegrant));
        let mut tx = MockTx::new().with_signer_address(signer);
        tx.fee = 2_000;
        tx.fee_granter = Some(granter);
        let mut ctx = TxContext::new("testchain", 1, 0);

        chain.run(&tx, &mut ctx).unwrap();
        assert_eq!(bank.balance_of(&granter), 8_000);
        assert_eq!(ctx.fee_payer(), Some(granter));
    }

    #[test]
    fn test_granter_without_grant_rejected() {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let feegrant = Arc::new(MemoryFeegrantKeeper::new());

        let signer = Address::new([1u8; 32]);
        let granter = Address::new([2u8; 32]);
        accounts.add_account(crate::keeper::Account::new(signer, 1));
        accounts.add_account(crate::keeper::Account::new(granter, 2));
        bank.set_balance(granter, 10_000);

        let chain = deduct_chain(accounts, bank, Some(feegrant));
        let mut tx = MockTx::new().with_signer_address(signer);
        tx.fee = 2_000;
        tx.fee_granter = Some(granter);
        let mut ctx = TxContext::new("testchain", 1, 0);

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::Rejected(RejectReason::FeeGrant { .. })
        ));
    }

    #[test]
    fn test_granter_without_feegrant_keeper_rejected() {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let signer = Address::new([1u8; 32]);
        let granter = Address::new([2u8; 32]);
        accounts.add_account(crate::keeper::Account::new(signer, 1));

        let chain = deduct_chain(accounts, bank, None);
        let mut tx = MockTx::new().with_signer_address(signer);
        tx.fee = 2_000;
        tx.fee_granter = Some(granter);
        let mut ctx = TxContext::new("testchain", 1, 0);

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Rejected(RejectReason::FeeGrantsDisabled)
        );
    }

    #[test]
    fn test_zero_fee_resolves_payer_without_transfer() {
        let accounts = Arc::new(MemoryAccountKeeper::new());
        let bank = Arc::new(MemoryBankKeeper::new());
        let signer = Address::new([1u8; 32]);
        accounts.add_account(crate::keeper::Account::new(signer, 1));

        let chain = deduct_chain(accounts, bank.clone(), None);
        let mut tx = MockTx::new().with_signer_address(signer);
        tx.fee = 0;
        let mut ctx = TxContext::new("testchain", 1, 0);

        chain.run(&tx, &mut ctx).unwrap();
        assert_eq!(bank.collected(), 0);
        assert_eq!(ctx.fee_payer(), Some(signer));
    }
}
