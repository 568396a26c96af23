//! Execution Context
//!
//! Per-transaction carrier of gas budget and values computed by earlier
//! stages for later ones. A context is created fresh for every
//! validation attempt and discarded after the pipeline returns; on any
//! error the caller must throw the whole context away rather than
//! reuse its partial mutations.

use lib_types::{Address, BlockHeight};

use crate::gas::GasMeter;

/// Mutable state threaded through one pipeline invocation
#[derive(Debug, Clone)]
pub struct TxContext {
    chain_id: String,
    block_height: BlockHeight,
    /// Serialized size of the transaction under validation, in bytes
    tx_size: u64,
    /// Dry-run flag: relaxes signature presence, not fee or gas rules
    simulate: bool,
    gas_meter: GasMeter,
    /// Fee payer resolved by the fee-deduction stage, cached for
    /// anything downstream that needs it
    fee_payer: Option<Address>,
}

impl TxContext {
    /// Create a context for a real validation attempt.
    ///
    /// The meter starts unlimited; the context-setup stage installs the
    /// transaction's declared budget before any metered stage runs.
    pub fn new(chain_id: impl Into<String>, block_height: BlockHeight, tx_size: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            block_height,
            tx_size,
            simulate: false,
            gas_meter: GasMeter::unlimited(),
            fee_payer: None,
        }
    }

    /// Create a context for a simulation (gas estimation) attempt
    pub fn new_simulate(
        chain_id: impl Into<String>,
        block_height: BlockHeight,
        tx_size: u64,
    ) -> Self {
        let mut ctx = Self::new(chain_id, block_height, tx_size);
        ctx.simulate = true;
        ctx
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn block_height(&self) -> BlockHeight {
        self.block_height
    }

    pub fn tx_size(&self) -> u64 {
        self.tx_size
    }

    pub fn is_simulate(&self) -> bool {
        self.simulate
    }

    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas_meter
    }

    pub fn gas_meter_mut(&mut self) -> &mut GasMeter {
        &mut self.gas_meter
    }

    pub fn set_gas_meter(&mut self, meter: GasMeter) {
        self.gas_meter = meter;
    }

    pub fn fee_payer(&self) -> Option<Address> {
        self.fee_payer
    }

    pub fn set_fee_payer(&mut self, payer: Address) {
        self.fee_payer = Some(payer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context() {
        let ctx = TxContext::new("testchain", 42, 180);
        assert_eq!(ctx.chain_id(), "testchain");
        assert_eq!(ctx.block_height(), 42);
        assert_eq!(ctx.tx_size(), 180);
        assert!(!ctx.is_simulate());
        assert_eq!(ctx.fee_payer(), None);
    }

    #[test]
    fn test_simulate_context() {
        let ctx = TxContext::new_simulate("testchain", 42, 180);
        assert!(ctx.is_simulate());
    }

    #[test]
    fn test_fee_payer_cache() {
        let mut ctx = TxContext::new("testchain", 1, 0);
        let payer = Address::new([7u8; 32]);
        ctx.set_fee_payer(payer);
        assert_eq!(ctx.fee_payer(), Some(payer));
    }
}
