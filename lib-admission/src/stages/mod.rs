//! Mandatory Admission Stages
//!
//! The chain order is a hard invariant of the public contract; callers
//! may substitute individual stage implementations but not reorder the
//! mandatory stages. The builder composes them as:
//!
//! 1. `SetUpContext` — gas meter init, panic containment (outermost)
//! 2. `RejectExtensions` — no unrecognized protocol extensions
//! 3. `MempoolFeeFloor` — declared fee meets the floor (skipped in
//!    simulation)
//! 4. `ValidateBasic` — transaction self-consistency check
//! 5. `TimeoutHeight` — transaction not expired
//! 6. `ValidateMemo` — memo length cap scaled by signer count
//! 7. `ConsumeTxSizeGas` — gas proportional to serialized size
//! 8. `DeductFee` — resolve payer, redeem grant, move the fee
//! 9. `SetPubKey` — register declared keys, check address consistency
//! 10. `SigCountLimit` — bound total constituent key count
//! 11. `SigGasConsume` — price verification via the gas policy
//! 12. `SigVerify` — sequence equality plus cryptographic verification
//! 13. `IncrementSequence` — advance every signer's replay counter
//!
//! `Trace` is the optional diagnostic stage the builder interleaves
//! when tracing is enabled; it never affects the outcome.

mod basic;
mod fee;
mod setup;
mod sigverify;
mod trace;

pub use basic::{ConsumeTxSizeGas, RejectExtensions, TimeoutHeight, ValidateBasic, ValidateMemo};
pub use fee::{DeductFee, MempoolFeeFloor};
pub use setup::SetUpContext;
pub use sigverify::{IncrementSequence, SetPubKey, SigCountLimit, SigGasConsume, SigVerify};
pub use trace::Trace;
