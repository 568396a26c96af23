//! In-Memory Test Collaborators
//!
//! Deterministic, dependency-free stand-ins for the external
//! collaborators plus a buildable transaction, so the pipeline can be
//! exercised end to end without a real chain behind it. Not storage:
//! these hold state in a mutex-guarded map and nothing else.

use std::collections::HashMap;
use std::sync::Mutex;

use ed25519_dalek::{Signer, SigningKey};

use lib_keys::{PublicKey, SignMode, SignatureData};
use lib_types::{Address, Amount, BlockHeight, Gas};

use crate::keeper::{Account, AccountKeeper, BankKeeper, FeegrantKeeper};
use crate::sign_mode::{DirectSignModeHandler, SignModeHandler, SignerData};
use crate::transaction::{
    ExtensionOption, FeeTx, MemoTx, SigVerifiableTx, SignatureEntry, Tx,
};

/// Deterministic keypair for tests: signing key, public key, and the
/// address the public key resolves to
pub fn test_keypair(seed: u8) -> (SigningKey, PublicKey, Address) {
    let signing = SigningKey::from_bytes(&[seed; 32]);
    let pub_key = PublicKey::Ed25519(signing.verifying_key().to_bytes());
    let address = pub_key.address();
    (signing, pub_key, address)
}

/// Sign raw bytes with a test key
pub fn raw_sign(key: &SigningKey, payload: &[u8]) -> Vec<u8> {
    key.sign(payload).to_bytes().to_vec()
}

// =============================================================================
// IN-MEMORY KEEPERS
// =============================================================================

/// Account store backed by a map
#[derive(Default)]
pub struct MemoryAccountKeeper {
    accounts: Mutex<HashMap<Address, Account>>,
}

impl MemoryAccountKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, account: Account) {
        self.accounts
            .lock()
            .expect("account map poisoned")
            .insert(account.address, account);
    }
}

impl AccountKeeper for MemoryAccountKeeper {
    fn get_account(&self, address: &Address) -> Option<Account> {
        self.accounts
            .lock()
            .expect("account map poisoned")
            .get(address)
            .cloned()
    }

    fn set_account(&self, account: Account) {
        self.add_account(account);
    }
}

/// Bank backed by a balance map plus a fee-collector tally
#[derive(Default)]
pub struct MemoryBankKeeper {
    balances: Mutex<HashMap<Address, Amount>>,
    collected: Mutex<Amount>,
}

impl MemoryBankKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, address: Address, amount: Amount) {
        self.balances
            .lock()
            .expect("balance map poisoned")
            .insert(address, amount);
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.balances
            .lock()
            .expect("balance map poisoned")
            .get(address)
            .copied()
            .unwrap_or(0)
    }

    /// Total fees moved to the module account
    pub fn collected(&self) -> Amount {
        *self.collected.lock().expect("collector poisoned")
    }
}

impl BankKeeper for MemoryBankKeeper {
    fn send_coins_from_account_to_module(
        &self,
        from: &Address,
        amount: Amount,
    ) -> anyhow::Result<()> {
        let mut balances = self.balances.lock().expect("balance map poisoned");
        let balance = balances.get(from).copied().unwrap_or(0);
        if balance < amount {
            anyhow::bail!("insufficient funds: balance {balance}, need {amount}");
        }
        balances.insert(*from, balance - amount);
        *self.collected.lock().expect("collector poisoned") += amount;
        Ok(())
    }
}

/// Fee-grant table keyed by (granter, grantee) with a spendable
/// allowance per grant
#[derive(Default)]
pub struct MemoryFeegrantKeeper {
    grants: Mutex<HashMap<(Address, Address), Amount>>,
}

impl MemoryFeegrantKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, granter: Address, grantee: Address, allowance: Amount) {
        self.grants
            .lock()
            .expect("grant table poisoned")
            .insert((granter, grantee), allowance);
    }
}

impl FeegrantKeeper for MemoryFeegrantKeeper {
    fn use_granted_fees(
        &self,
        granter: &Address,
        grantee: &Address,
        amount: Amount,
        _tx: &dyn Tx,
    ) -> anyhow::Result<()> {
        let mut grants = self.grants.lock().expect("grant table poisoned");
        let key = (*granter, *grantee);
        let allowance = grants
            .get(&key)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no fee grant from {granter} to {grantee}"))?;
        if allowance < amount {
            anyhow::bail!("fee grant exhausted: allowance {allowance}, need {amount}");
        }
        grants.insert(key, allowance - amount);
        Ok(())
    }
}

// =============================================================================
// MOCK TRANSACTION
// =============================================================================

/// Buildable transaction supporting all three capability views, with
/// flags to withhold a view for capability tests
pub struct MockTx {
    pub memo: String,
    pub timeout_height: BlockHeight,
    pub extension_options: Vec<ExtensionOption>,
    pub fee: Amount,
    pub gas_limit: Gas,
    pub fee_payer: Option<Address>,
    pub fee_granter: Option<Address>,
    pub signers: Vec<Address>,
    pub pub_keys: Vec<Option<PublicKey>>,
    pub signatures: Vec<SignatureEntry>,
    /// Signature-free body the signing payload commits to
    pub body: Vec<u8>,
    /// Forced self-check failure message
    pub basic_error: Option<String>,
    /// Panic inside `validate_basic`, for fault-containment tests
    pub panic_on_validate: bool,
    pub with_memo_view: bool,
    pub with_fee_view: bool,
    pub with_sig_view: bool,
}

impl MockTx {
    /// A well-formed transaction with no signers yet: default fee above
    /// the default floor, a 200k gas budget, and an empty memo
    pub fn new() -> Self {
        Self {
            memo: String::new(),
            timeout_height: 0,
            extension_options: Vec::new(),
            fee: 2_000,
            gas_limit: 200_000,
            fee_payer: None,
            fee_granter: None,
            signers: Vec::new(),
            pub_keys: Vec::new(),
            signatures: Vec::new(),
            body: b"mock transaction body".to_vec(),
            basic_error: None,
            panic_on_validate: false,
            with_memo_view: true,
            with_fee_view: true,
            with_sig_view: true,
        }
    }

    /// Append `count` placeholder signers (no keys, no signatures)
    pub fn with_signers(mut self, count: usize) -> Self {
        for index in 0..count {
            self.signers.push(Address::new([0x10 + index as u8; 32]));
            self.pub_keys.push(None);
        }
        self
    }

    /// Append one placeholder signer with a known address
    pub fn with_signer_address(mut self, address: Address) -> Self {
        self.signers.push(address);
        self.pub_keys.push(None);
        self
    }

    /// Append a real signer: declares the key, signs the direct payload
    /// for (`chain_id`, `account_number`, `sequence`), and records the
    /// signature entry
    pub fn sign_direct(
        &mut self,
        chain_id: &str,
        account_number: u64,
        sequence: u64,
        key: &SigningKey,
    ) {
        let pub_key = PublicKey::Ed25519(key.verifying_key().to_bytes());
        self.signers.push(pub_key.address());
        self.pub_keys.push(Some(pub_key.clone()));

        let signer_data = SignerData {
            chain_id: chain_id.to_string(),
            account_number,
            sequence,
        };
        let payload = DirectSignModeHandler
            .sign_bytes(SignMode::Direct, &signer_data, self)
            .expect("direct payload");
        self.signatures.push(SignatureEntry {
            pub_key: Some(pub_key),
            data: SignatureData::direct(raw_sign(key, &payload)),
            sequence,
        });
    }
}

impl Default for MockTx {
    fn default() -> Self {
        Self::new()
    }
}

impl Tx for MockTx {
    fn validate_basic(&self) -> anyhow::Result<()> {
        if self.panic_on_validate {
            panic!("forced validation panic");
        }
        if let Some(message) = &self.basic_error {
            anyhow::bail!("{message}");
        }
        Ok(())
    }

    fn timeout_height(&self) -> BlockHeight {
        self.timeout_height
    }

    fn extension_options(&self) -> &[ExtensionOption] {
        &self.extension_options
    }

    fn as_memo_tx(&self) -> Option<&dyn MemoTx> {
        self.with_memo_view.then_some(self as &dyn MemoTx)
    }

    fn as_sig_tx(&self) -> Option<&dyn SigVerifiableTx> {
        self.with_sig_view.then_some(self as &dyn SigVerifiableTx)
    }

    fn as_fee_tx(&self) -> Option<&dyn FeeTx> {
        self.with_fee_view.then_some(self as &dyn FeeTx)
    }
}

impl MemoTx for MockTx {
    fn memo(&self) -> &str {
        &self.memo
    }
}

impl FeeTx for MockTx {
    fn fee(&self) -> Amount {
        self.fee
    }

    fn gas_limit(&self) -> Gas {
        self.gas_limit
    }

    fn fee_payer(&self) -> Option<Address> {
        self.fee_payer
    }

    fn fee_granter(&self) -> Option<Address> {
        self.fee_granter
    }
}

impl SigVerifiableTx for MockTx {
    fn signers(&self) -> Vec<Address> {
        self.signers.clone()
    }

    fn pub_keys(&self) -> Vec<Option<PublicKey>> {
        self.pub_keys.clone()
    }

    fn signatures(&self) -> Vec<SignatureEntry> {
        self.signatures.clone()
    }

    fn body_bytes(&self) -> Vec<u8> {
        self.body.clone()
    }
}
