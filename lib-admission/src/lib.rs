//! Transaction Admission Pipeline
//!
//! An ordered chain of validation stages every transaction passes
//! through before it is admitted to the mempool or included in a
//! block. The chain encodes the consensus-critical invariants — fee
//! sufficiency, signature correctness, sequence-number replay
//! protection, gas accounting — so every node applies them
//! identically.
//!
//! # Architecture
//!
//! The pipeline is built once from [`builder::PipelineOptions`] and
//! invoked per transaction with a fresh [`context::TxContext`]. Stages
//! execute strictly in order within one invocation; the first failure
//! short-circuits the chain and the caller discards the context.
//!
//! # Modules
//!
//! - `errors`: configuration, rejection, and gas error taxonomy
//! - `context`: per-transaction execution context
//! - `gas`: gas meter and the pluggable signature gas policy
//! - `transaction`: capability views over an opaque transaction
//! - `keeper`: external account, bank, and fee-grant collaborators
//! - `sign_mode`: signing-payload resolution
//! - `stage`: the stage contract and chain executor
//! - `stages`: the mandatory stages plus the optional trace stage
//! - `builder`: pipeline assembly in the fixed documented order
//! - `params`: limits and costs applied by the stages
//! - `testing`: in-memory collaborators and a buildable transaction

pub mod builder;
pub mod context;
pub mod errors;
pub mod gas;
pub mod keeper;
pub mod params;
pub mod sign_mode;
pub mod stage;
pub mod stages;
pub mod testing;
pub mod transaction;

pub use builder::PipelineOptions;
pub use context::TxContext;
pub use errors::{AdmissionError, AdmissionResult, ConfigError, RejectReason};
pub use gas::{DefaultSigGasConsumer, GasMeter, OutOfGas, SigGasConsumer};
pub use keeper::{Account, AccountKeeper, BankKeeper, FeegrantKeeper};
pub use params::AdmissionParams;
pub use sign_mode::{DirectSignModeHandler, SignModeHandler, SignerData};
pub use stage::{AdmissionPipeline, Next, Stage};
pub use transaction::{ExtensionOption, FeeTx, MemoTx, SigVerifiableTx, SignatureEntry, Tx};
