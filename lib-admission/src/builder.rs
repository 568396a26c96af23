//! Pipeline Builder
//!
//! Assembles the mandatory stages in their fixed order (documented in
//! [`crate::stages`]) from the configured collaborators. Each missing
//! required collaborator is a distinct configuration error and no
//! partial pipeline is ever returned.

use std::sync::Arc;

use crate::errors::ConfigError;
use crate::gas::{DefaultSigGasConsumer, SigGasConsumer};
use crate::keeper::{AccountKeeper, BankKeeper, FeegrantKeeper};
use crate::params::AdmissionParams;
use crate::sign_mode::SignModeHandler;
use crate::stage::{AdmissionPipeline, Stage};
use crate::stages::{
    ConsumeTxSizeGas, DeductFee, IncrementSequence, MempoolFeeFloor, RejectExtensions,
    SetPubKey, SetUpContext, SigCountLimit, SigGasConsume, SigVerify, TimeoutHeight, Trace,
    ValidateBasic, ValidateMemo,
};

/// Collaborators and policy for building an admission pipeline.
///
/// `account_keeper`, `bank_keeper`, and `sign_mode_handler` are
/// required. `feegrant_keeper` is optional: without it, transactions
/// declaring a fee granter are rejected. `sig_gas_consumer` defaults to
/// [`DefaultSigGasConsumer`] when unset.
#[derive(Default)]
pub struct PipelineOptions {
    pub account_keeper: Option<Arc<dyn AccountKeeper>>,
    pub bank_keeper: Option<Arc<dyn BankKeeper>>,
    pub feegrant_keeper: Option<Arc<dyn FeegrantKeeper>>,
    pub sign_mode_handler: Option<Arc<dyn SignModeHandler>>,
    pub sig_gas_consumer: Option<Arc<dyn SigGasConsumer>>,
    pub params: AdmissionParams,
    /// Interleave a diagnostic [`Trace`] stage after every mandatory
    /// stage. Debugging aid, off by default.
    pub trace: bool,
}

impl PipelineOptions {
    /// Compose the admission pipeline.
    ///
    /// The stage order is part of the public contract; callers may
    /// swap stage implementations through these options but never
    /// reorder the mandatory chain.
    pub fn build(self) -> Result<AdmissionPipeline, ConfigError> {
        let account_keeper = self
            .account_keeper
            .ok_or(ConfigError::MissingAccountKeeper)?;
        let bank_keeper = self.bank_keeper.ok_or(ConfigError::MissingBankKeeper)?;
        let sign_mode_handler = self
            .sign_mode_handler
            .ok_or(ConfigError::MissingSignModeHandler)?;
        let sig_gas_consumer = self
            .sig_gas_consumer
            .unwrap_or_else(|| Arc::new(DefaultSigGasConsumer));
        let params = self.params;

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(SetUpContext),
            Arc::new(RejectExtensions),
            Arc::new(MempoolFeeFloor::new(params.clone())),
            Arc::new(ValidateBasic),
            Arc::new(TimeoutHeight),
            Arc::new(ValidateMemo::new(params.clone())),
            Arc::new(ConsumeTxSizeGas::new(params.clone())),
            Arc::new(DeductFee::new(
                account_keeper.clone(),
                bank_keeper,
                self.feegrant_keeper,
            )),
            Arc::new(SetPubKey::new(account_keeper.clone())),
            Arc::new(SigCountLimit::new(params.clone())),
            Arc::new(SigGasConsume::new(
                account_keeper.clone(),
                sig_gas_consumer,
                params,
            )),
            Arc::new(SigVerify::new(account_keeper.clone(), sign_mode_handler)),
            Arc::new(IncrementSequence::new(account_keeper)),
        ];

        let stages = if self.trace {
            interleave_trace(stages)
        } else {
            stages
        };
        Ok(AdmissionPipeline::new(stages))
    }
}

/// Insert a tagged trace stage after every mandatory stage
fn interleave_trace(stages: Vec<Arc<dyn Stage>>) -> Vec<Arc<dyn Stage>> {
    let mut traced: Vec<Arc<dyn Stage>> = Vec::with_capacity(stages.len() * 2);
    for (index, stage) in stages.into_iter().enumerate() {
        traced.push(stage);
        traced.push(Arc::new(Trace::new(format!("admission.{}", index + 1))));
    }
    traced
}
