//! Stage Contract and Chain Executor
//!
//! A stage is one link in the admission chain: it may reject outright
//! (the chain halts, nothing later runs), or mutate the context and
//! delegate to the remainder of the chain, optionally post-processing
//! on the way back up. The chain is an ordered slice of stages walked
//! by threading a continuation; there is no inheritance hierarchy and
//! no dynamic re-ordering at run time.

use std::sync::Arc;

use crate::context::TxContext;
use crate::errors::AdmissionResult;
use crate::transaction::Tx;

/// One link in the admission chain
pub trait Stage: Send + Sync {
    /// Stable name, used by tracing and ordering assertions
    fn name(&self) -> &'static str;

    /// Process `tx`, calling `next` to run the remainder of the chain
    fn handle(&self, tx: &dyn Tx, ctx: &mut TxContext, next: Next<'_>) -> AdmissionResult<()>;
}

/// Continuation over the remainder of the chain.
///
/// `run` consumes the continuation: a stage delegates at most once,
/// which is what makes "first failure wins" a structural guarantee
/// rather than a convention.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Stage>]) -> Self {
        Self { stages }
    }

    /// Execute the remaining stages in order
    pub fn run(self, tx: &dyn Tx, ctx: &mut TxContext) -> AdmissionResult<()> {
        match self.stages.split_first() {
            None => Ok(()),
            Some((stage, rest)) => stage.handle(tx, ctx, Next::new(rest)),
        }
    }
}

/// The composed admission handler produced by the builder
pub struct AdmissionPipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl std::fmt::Debug for AdmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl AdmissionPipeline {
    pub(crate) fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Validate one transaction.
    ///
    /// Returns the first failing stage's error verbatim; on any error
    /// the caller must discard the context rather than commit its
    /// mutations.
    pub fn run(&self, tx: &dyn Tx, ctx: &mut TxContext) -> AdmissionResult<()> {
        Next::new(&self.stages).run(tx, ctx)
    }

    /// Names of the composed stages, in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}
