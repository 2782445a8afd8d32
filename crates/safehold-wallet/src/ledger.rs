//! Local transaction ledger
//!
//! The multisig contract cannot enumerate its proposals, so the client keeps
//! every contract address and proposal id it has seen. Entries are only ever
//! added by callers that have confirmed the id exists on chain; the ledger
//! itself does no validation.

use crate::error::WalletError;
use crate::schema::{multisig_txs_key, MULTISIG_CONTRACTS_KEY};
use crate::store::{get_json, set_json, KvStore};
use safehold_core::{Address, TxId};
use std::sync::Arc;

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn KvStore>,
}

impl Ledger {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Known multisig contracts, in the order they were added
    pub fn list_contracts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(get_json(self.store.as_ref(), MULTISIG_CONTRACTS_KEY)?.unwrap_or_default())
    }

    /// Add a contract. Returns `false` if it was already known.
    pub fn remember_contract(&self, contract: Address) -> Result<bool, WalletError> {
        let mut contracts = self.list_contracts()?;
        if contracts.contains(&contract) {
            return Ok(false);
        }
        contracts.push(contract);
        set_json(self.store.as_ref(), MULTISIG_CONTRACTS_KEY, &contracts)?;
        log::debug!("Ledger: tracking contract {}", contract);
        Ok(true)
    }

    /// Drop a contract and every id recorded for it.
    pub fn forget_contract(&self, contract: &Address) -> Result<bool, WalletError> {
        let mut contracts = self.list_contracts()?;
        let before = contracts.len();
        contracts.retain(|c| c != contract);
        let removed = contracts.len() != before;

        if removed {
            set_json(self.store.as_ref(), MULTISIG_CONTRACTS_KEY, &contracts)?;
        }
        self.store.remove(&multisig_txs_key(contract))?;
        Ok(removed)
    }

    /// Proposal ids for a contract in insertion order
    pub fn list_transactions(&self, contract: &Address) -> Result<Vec<TxId>, WalletError> {
        Ok(get_json(self.store.as_ref(), &multisig_txs_key(contract))?.unwrap_or_default())
    }

    /// Add a proposal id, also remembering its contract. Returns `false` if
    /// the id was already recorded.
    pub fn remember_transaction(&self, contract: Address, id: TxId) -> Result<bool, WalletError> {
        self.remember_contract(contract)?;

        let mut ids = self.list_transactions(&contract)?;
        if ids.contains(&id) {
            return Ok(false);
        }
        ids.push(id);
        set_json(self.store.as_ref(), &multisig_txs_key(&contract), &ids)?;
        log::debug!("Ledger: recorded {} for {}", id, contract);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn id(byte: u8) -> TxId {
        TxId::from_bytes([byte; 32])
    }

    fn ledger() -> (Arc<dyn KvStore>, Ledger) {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        (store.clone(), Ledger::new(store))
    }

    #[test]
    fn test_empty() {
        let (_, ledger) = ledger();
        assert!(ledger.list_contracts().unwrap().is_empty());
        assert!(ledger.list_transactions(&addr(1)).unwrap().is_empty());
    }

    #[test]
    fn test_contracts_deduplicated() {
        let (_, ledger) = ledger();
        assert!(ledger.remember_contract(addr(1)).unwrap());
        assert!(ledger.remember_contract(addr(2)).unwrap());
        assert!(!ledger.remember_contract(addr(1)).unwrap());
        assert_eq!(ledger.list_contracts().unwrap(), vec![addr(1), addr(2)]);
    }

    #[test]
    fn test_transactions_keep_insertion_order() {
        let (_, ledger) = ledger();
        for b in [3, 1, 2] {
            assert!(ledger.remember_transaction(addr(9), id(b)).unwrap());
        }
        assert!(!ledger.remember_transaction(addr(9), id(1)).unwrap());

        assert_eq!(
            ledger.list_transactions(&addr(9)).unwrap(),
            vec![id(3), id(1), id(2)]
        );
        // Contract picked up implicitly
        assert_eq!(ledger.list_contracts().unwrap(), vec![addr(9)]);
    }

    #[test]
    fn test_transactions_scoped_per_contract() {
        let (_, ledger) = ledger();
        ledger.remember_transaction(addr(1), id(1)).unwrap();
        ledger.remember_transaction(addr(2), id(2)).unwrap();
        assert_eq!(ledger.list_transactions(&addr(1)).unwrap(), vec![id(1)]);
        assert_eq!(ledger.list_transactions(&addr(2)).unwrap(), vec![id(2)]);
    }

    #[test]
    fn test_forget_contract() {
        let (store, ledger) = ledger();
        ledger.remember_transaction(addr(1), id(1)).unwrap();
        ledger.remember_contract(addr(2)).unwrap();

        assert!(ledger.forget_contract(&addr(1)).unwrap());
        assert!(!ledger.forget_contract(&addr(1)).unwrap());
        assert_eq!(ledger.list_contracts().unwrap(), vec![addr(2)]);
        assert!(ledger.list_transactions(&addr(1)).unwrap().is_empty());
        assert!(store.get(&multisig_txs_key(&addr(1))).unwrap().is_none());
    }

    #[test]
    fn test_stored_layout() {
        let (store, ledger) = ledger();
        let contract: Address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap();
        ledger.remember_transaction(contract, id(0xab)).unwrap();

        let raw = store
            .get("multisigTxs:0x5fbdb2315678afecb367f032d93f642f64180aa3")
            .unwrap()
            .unwrap();
        let ids: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(ids, vec![format!("0x{}", "ab".repeat(32))]);
    }
}
