use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    account::{AccountId, AccountNumber, ClientAccount},
    definition::{AccountDefinition, DefinitionId},
    transaction::{Transaction, TransactionId},
};

use super::{CommitReceipt, DefinitionStore, LedgerStore, StoreError, WriteBatch};

#[derive(Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, ClientAccount>,
    numbers: HashMap<AccountNumber, AccountId>,
    transactions: Vec<Transaction>,
    definitions: BTreeMap<DefinitionId, AccountDefinition>,
    last_account_id: AccountId,
    last_transaction_id: TransactionId,
    last_definition_id: DefinitionId,
}

impl LedgerState {
    fn check_definition_unique(&self, definition: &AccountDefinition) -> Result<(), StoreError> {
        for other in self.definitions.values().filter(|d| d.id != definition.id) {
            if other.code == definition.code {
                return Err(StoreError::DuplicateDefinition {
                    field: "code",
                    value: definition.code.clone(),
                });
            }
            if other.name == definition.name {
                return Err(StoreError::DuplicateDefinition {
                    field: "name",
                    value: definition.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Store keeping everything behind a single lock, so a commit is trivially
/// atomic with respect to every other read and write.
#[derive(Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<LedgerState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn account_by_id(&self, id: AccountId) -> Result<Option<ClientAccount>, StoreError> {
        Ok(self.state.lock().accounts.get(&id).cloned())
    }

    fn account_by_number(
        &self,
        number: &AccountNumber,
    ) -> Result<Option<ClientAccount>, StoreError> {
        let state = self.state.lock();
        Ok(state
            .numbers
            .get(number)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    fn accounts_for_client(&self, client_id: &str) -> Result<Vec<ClientAccount>, StoreError> {
        Ok(self
            .state
            .lock()
            .accounts
            .values()
            .filter(|acc| acc.client_id == client_id)
            .cloned()
            .collect())
    }

    fn all_accounts(&self) -> Result<Vec<ClientAccount>, StoreError> {
        Ok(self.state.lock().accounts.values().cloned().collect())
    }

    fn insert_account(&self, mut account: ClientAccount) -> Result<ClientAccount, StoreError> {
        let mut state = self.state.lock();
        if state.numbers.contains_key(&account.number) {
            return Err(StoreError::DuplicateAccountNumber(account.number));
        }
        state.last_account_id += 1;
        account.id = state.last_account_id;
        account.version = 0;
        state.numbers.insert(account.number.clone(), account.id);
        state.accounts.insert(account.id, account.clone());
        debug!(account = account.id, number = %account.number, "account inserted");
        Ok(account)
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        let mut state = self.state.lock();

        // validate everything before touching anything
        for write in &batch.accounts {
            let stored = state
                .accounts
                .get(&write.account.id)
                .ok_or(StoreError::UnknownAccount(write.account.id))?;
            if stored.version != write.expected_version {
                return Err(StoreError::VersionConflict {
                    account: stored.id,
                    expected: write.expected_version,
                    actual: stored.version,
                });
            }
            if stored.number != write.account.number {
                return Err(StoreError::AccountNumberChanged(stored.id));
            }
        }

        let mut receipt = CommitReceipt::default();
        for write in batch.accounts {
            let mut account = write.account;
            account.version = write.expected_version + 1;
            state.accounts.insert(account.id, account.clone());
            receipt.accounts.push(account);
        }
        for tx in batch.transactions {
            state.last_transaction_id += 1;
            let tx = tx.into_persisted(state.last_transaction_id);
            state.transactions.push(tx.clone());
            receipt.transactions.push(tx);
        }
        Ok(receipt)
    }

    fn transaction_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .state
            .lock()
            .transactions
            .iter()
            .find(|tx| tx.id == id)
            .cloned())
    }

    fn transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock();
        // ids grow with commit order, reverse keeps ties on timestamp stable
        let mut txs: Vec<Transaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(txs)
    }
}

impl DefinitionStore for InMemoryLedgerStore {
    fn definition_by_id(&self, id: DefinitionId) -> Result<Option<AccountDefinition>, StoreError> {
        Ok(self.state.lock().definitions.get(&id).cloned())
    }

    fn definition_by_code(&self, code: &str) -> Result<Option<AccountDefinition>, StoreError> {
        Ok(self
            .state
            .lock()
            .definitions
            .values()
            .find(|d| d.code == code)
            .cloned())
    }

    fn definition_by_name(&self, name: &str) -> Result<Option<AccountDefinition>, StoreError> {
        Ok(self
            .state
            .lock()
            .definitions
            .values()
            .find(|d| d.name == name)
            .cloned())
    }

    fn insert_definition(
        &self,
        mut definition: AccountDefinition,
    ) -> Result<AccountDefinition, StoreError> {
        let mut state = self.state.lock();
        definition.id = 0;
        state.check_definition_unique(&definition)?;
        state.last_definition_id += 1;
        definition.id = state.last_definition_id;
        state.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }

    fn save_definition(
        &self,
        definition: AccountDefinition,
        expected_version: u64,
    ) -> Result<AccountDefinition, StoreError> {
        let mut state = self.state.lock();
        let stored = state
            .definitions
            .get(&definition.id)
            .ok_or(StoreError::UnknownDefinition(definition.id))?;
        if stored.version != expected_version {
            return Err(StoreError::DefinitionVersionConflict {
                definition: definition.id,
                expected: expected_version,
                actual: stored.version,
            });
        }
        state.check_definition_unique(&definition)?;
        state.definitions.insert(definition.id, definition.clone());
        Ok(definition)
    }
}
