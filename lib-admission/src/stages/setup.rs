//! Context Setup Stage
//!
//! Must run first: it installs the gas meter every downstream metered
//! stage draws from, and it is the recovery point that keeps a fault in
//! any inner stage from unwinding into the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::context::TxContext;
use crate::errors::{AdmissionError, AdmissionResult};
use crate::gas::GasMeter;
use crate::stage::{Next, Stage};
use crate::transaction::Tx;

/// Stage 1: initialize the gas meter and contain inner faults
#[derive(Debug, Clone, Copy, Default)]
pub struct SetUpContext;

impl Stage for SetUpContext {
    fn name(&self) -> &'static str {
        "setup"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        // A transaction without a fee view declares no budget; an
        // unlimited meter keeps this stage infallible while leaving
        // fee-dependent stages to reject on the missing capability.
        let meter = match tx.as_fee_tx() {
            Some(fee_tx) => GasMeter::new(fee_tx.gas_limit()),
            None => GasMeter::unlimited(),
        };
        ctx.set_gas_meter(meter);

        match panic::catch_unwind(AssertUnwindSafe(|| next.run(tx, ctx))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(target: "admission", %message, "recovered fault in admission chain");
                Err(AdmissionError::Internal(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
