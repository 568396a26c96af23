//! External Collaborators
//!
//! The pipeline reads and mutates accounts, moves fees, and redeems fee
//! grants exclusively through these interfaces. Storage, locking, and
//! ledger semantics are the collaborator's concern; the pipeline
//! assumes read-your-writes consistency within one invocation.

use serde::{Deserialize, Serialize};

use lib_keys::PublicKey;
use lib_types::{Address, Amount};

use crate::transaction::Tx;

/// On-chain account state the pipeline cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Stable account identifier, part of every signing payload
    pub account_number: u64,
    /// Strictly increasing per-transaction counter, the replay guard
    pub sequence: u64,
    /// Registered public key; absent until first registered by the
    /// key-resolution stage
    pub pub_key: Option<PublicKey>,
}

impl Account {
    pub fn new(address: Address, account_number: u64) -> Self {
        Self {
            address,
            account_number,
            sequence: 0,
            pub_key: None,
        }
    }
}

/// Account storage collaborator
pub trait AccountKeeper: Send + Sync {
    fn get_account(&self, address: &Address) -> Option<Account>;

    fn set_account(&self, account: Account);
}

/// Balance-transfer collaborator; moves the fee out of the payer's
/// account into the fee-collector module
pub trait BankKeeper: Send + Sync {
    fn send_coins_from_account_to_module(
        &self,
        from: &Address,
        amount: Amount,
    ) -> anyhow::Result<()>;
}

/// Fee-grant collaborator; authorizes spending `granter`'s allowance on
/// behalf of `grantee`. Failure is a hard rejection, never retried.
pub trait FeegrantKeeper: Send + Sync {
    fn use_granted_fees(
        &self,
        granter: &Address,
        grantee: &Address,
        amount: Amount,
        tx: &dyn Tx,
    ) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_at_sequence_zero() {
        let account = Account::new(Address::new([1u8; 32]), 9);
        assert_eq!(account.sequence, 0);
        assert_eq!(account.account_number, 9);
        assert!(account.pub_key.is_none());
    }
}
