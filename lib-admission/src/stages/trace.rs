//! Diagnostic Trace Stage
//!
//! Observability only: logs the declared public keys, the signature
//! public keys, and the signer addresses under a caller-supplied tag.
//! Never alters the outcome, never fails the chain, and degrades
//! silently when the transaction is not signature-verifiable.

use tracing::debug;

use crate::context::TxContext;
use crate::errors::AdmissionResult;
use crate::stage::{Next, Stage};
use crate::transaction::Tx;

const TARGET: &str = "admission::trace";

/// Optional stage logging signer material for debugging
#[derive(Debug, Clone)]
pub struct Trace {
    tag: String,
}

impl Trace {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    fn log(&self, tx: &dyn Tx) {
        let Some(sig_tx) = tx.as_sig_tx() else {
            debug!(target: TARGET, tag = %self.tag, "transaction is not signature-verifiable");
            return;
        };

        // The memo doubles as a correlation label when present.
        let label = tx.as_memo_tx().map(|memo_tx| memo_tx.memo()).unwrap_or("");

        for key in sig_tx.pub_keys() {
            match key {
                Some(key) => {
                    debug!(target: TARGET, tag = %self.tag, label, key = ?key, "declared public key")
                }
                None => {
                    debug!(target: TARGET, tag = %self.tag, label, "declared public key absent")
                }
            }
        }
        for entry in sig_tx.signatures() {
            match entry.pub_key {
                Some(key) => debug!(
                    target: TARGET, tag = %self.tag, label, key = ?key, sequence = entry.sequence,
                    "signature public key"
                ),
                None => debug!(
                    target: TARGET, tag = %self.tag, label, sequence = entry.sequence,
                    "signature public key absent"
                ),
            }
        }
        for signer in sig_tx.signers() {
            debug!(target: TARGET, tag = %self.tag, label, signer = %signer, "signer");
        }
    }
}

impl Stage for Trace {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()> {
        self.log(tx);
        next.run(tx, ctx)
    }
}
