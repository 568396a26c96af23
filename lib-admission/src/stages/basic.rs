//! Basic Validity Stages
//!
//! Cheap structural checks that run before any state is touched:
//! extension rejection, the transaction's own self-check, expiry, memo
//! length, and the size-proportional gas charge.

use tracing::debug;

use crate::context::TxContext;
use crate::errors::{AdmissionResult, RejectReason};
use crate::params::AdmissionParams;
use crate::stage::{Next, Stage};
use crate::transaction::Tx;

/// Stage 2: reject transactions carrying unrecognized protocol
/// extension options
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectExtensions;

impl Stage for RejectExtensions {
    fn name(&self) -> &'static str {
        "reject-extensions"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        if let Some(option) = tx.extension_options().first() {
            debug!(target: "admission", type_url = %option.type_url, "rejecting unknown extension");
            return Err(RejectReason::UnknownExtension {
                type_url: option.type_url.clone(),
            }
            .into());
        }
        next.run(tx, ctx)
    }
}

/// Stage 4: invoke the transaction's self-consistency check
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateBasic;

impl Stage for ValidateBasic {
    fn name(&self) -> &'static str {
        "validate-basic"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        tx.validate_basic()
            .map_err(|err| RejectReason::InvalidBasic(err.to_string()))?;
        next.run(tx, ctx)
    }
}

/// Stage 5: reject transactions past their declared expiry height
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutHeight;

impl Stage for TimeoutHeight {
    fn name(&self) -> &'static str {
        "timeout-height"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let timeout_height = tx.timeout_height();
        if timeout_height > 0 && ctx.block_height() > timeout_height {
            return Err(RejectReason::Expired {
                timeout_height,
                current: ctx.block_height(),
            }
            .into());
        }
        next.run(tx, ctx)
    }
}

/// Stage 6: enforce the memo length cap, scaled by signer count
#[derive(Debug, Clone)]
pub struct ValidateMemo {
    params: AdmissionParams,
}

impl ValidateMemo {
    pub fn new(params: AdmissionParams) -> Self {
        Self { params }
    }
}

impl Stage for ValidateMemo {
    fn name(&self) -> &'static str {
        "validate-memo"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let len = tx
            .as_memo_tx()
            .map(|memo_tx| memo_tx.memo().chars().count())
            .unwrap_or(0);
        if len > 0 {
            let signer_count = tx
                .as_sig_tx()
                .map(|sig_tx| sig_tx.signers().len())
                .unwrap_or(0)
                .max(1);
            let max = self
                .params
                .max_memo_chars_per_signer
                .saturating_mul(signer_count);
            if len > max {
                return Err(RejectReason::MemoTooLong { len, max }.into());
            }
        }
        next.run(tx, ctx)
    }
}

/// Stage 7: charge gas proportional to the serialized transaction size
#[derive(Debug, Clone)]
pub struct ConsumeTxSizeGas {
    params: AdmissionParams,
}

impl ConsumeTxSizeGas {
    pub fn new(params: AdmissionParams) -> Self {
        Self { params }
    }
}

impl Stage for ConsumeTxSizeGas {
    fn name(&self) -> &'static str {
        "tx-size-gas"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        let cost = self
            .params
            .tx_size_cost_per_byte
            .saturating_mul(ctx.tx_size());
        ctx.gas_meter_mut().consume(cost, "transaction size")?;
        next.run(tx, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AdmissionError;
    use crate::stage::AdmissionPipeline;
    use crate::testing::MockTx;
    use crate::transaction::ExtensionOption;
    use std::sync::Arc;

    fn single_stage(stage: impl Stage + 'static) -> AdmissionPipeline {
        AdmissionPipeline::new(vec![Arc::new(stage)])
    }

    #[test]
    fn test_extension_option_rejected() {
        let chain = single_stage(RejectExtensions);
        let mut tx = MockTx::new();
        tx.extension_options.push(ExtensionOption {
            type_url: "/custom.ext.v1.Unknown".to_string(),
        });
        let mut ctx = TxContext::new("testchain", 1, 0);

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::Rejected(RejectReason::UnknownExtension { .. })
        ));
    }

    #[test]
    fn test_no_extensions_pass() {
        let chain = single_stage(RejectExtensions);
        let tx = MockTx::new();
        let mut ctx = TxContext::new("testchain", 1, 0);
        chain.run(&tx, &mut ctx).unwrap();
    }

    #[test]
    fn test_validate_basic_failure_is_rejection() {
        let chain = single_stage(ValidateBasic);
        let mut tx = MockTx::new();
        tx.basic_error = Some("fee is negative".to_string());
        let mut ctx = TxContext::new("testchain", 1, 0);

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Rejected(RejectReason::InvalidBasic("fee is negative".to_string()))
        );
    }

    #[test]
    fn test_timeout_height_zero_never_expires() {
        let chain = single_stage(TimeoutHeight);
        let tx = MockTx::new();
        let mut ctx = TxContext::new("testchain", u64::MAX, 0);
        chain.run(&tx, &mut ctx).unwrap();
    }

    #[test]
    fn test_timeout_height_expiry() {
        let chain = single_stage(TimeoutHeight);
        let mut tx = MockTx::new();
        tx.timeout_height = 100;

        // at the declared height the transaction is still valid
        let mut ctx = TxContext::new("testchain", 100, 0);
        chain.run(&tx, &mut ctx).unwrap();

        let mut ctx = TxContext::new("testchain", 101, 0);
        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Rejected(RejectReason::Expired {
                timeout_height: 100,
                current: 101
            })
        );
    }

    #[test]
    fn test_memo_cap_scales_with_signer_count() {
        let mut params = AdmissionParams::default();
        params.max_memo_chars_per_signer = 10;
        let chain = single_stage(ValidateMemo::new(params));

        let mut tx = MockTx::new().with_signers(2);
        tx.memo = "x".repeat(15);
        let mut ctx = TxContext::new("testchain", 1, 0);
        // 15 <= 10 * 2
        chain.run(&tx, &mut ctx).unwrap();

        tx.memo = "x".repeat(21);
        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::Rejected(RejectReason::MemoTooLong { len: 21, max: 20 })
        );
    }

    #[test]
    fn test_empty_memo_always_passes() {
        let mut params = AdmissionParams::default();
        params.max_memo_chars_per_signer = 0;
        let chain = single_stage(ValidateMemo::new(params));
        let tx = MockTx::new();
        let mut ctx = TxContext::new("testchain", 1, 0);
        chain.run(&tx, &mut ctx).unwrap();
    }

    #[test]
    fn test_tx_size_gas_charge() {
        let chain = single_stage(ConsumeTxSizeGas::new(AdmissionParams::default()));
        let tx = MockTx::new();
        let mut ctx = TxContext::new("testchain", 1, 80);
        chain.run(&tx, &mut ctx).unwrap();
        // 80 bytes at 100 gas per byte
        assert_eq!(ctx.gas_meter().consumed(), 8_000);
    }

    #[test]
    fn test_tx_size_gas_exhaustion() {
        let chain = single_stage(ConsumeTxSizeGas::new(AdmissionParams::default()));
        let tx = MockTx::new();
        let mut ctx = TxContext::new("testchain", 1, 80);
        ctx.set_gas_meter(crate::gas::GasMeter::new(7_999));

        let err = chain.run(&tx, &mut ctx).unwrap_err();
        assert!(err.is_out_of_gas());
    }
}
