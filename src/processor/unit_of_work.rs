use std::collections::BTreeMap;

use crate::{
    account::{AccountId, BalanceEvent, ClientAccount},
    command::AccountRef,
    store::{AccountWrite, CommitReceipt, LedgerStore, StoreError, WriteBatch},
    transaction::NewTransaction,
};

use super::TransactionProcessError;

struct StagedAccount {
    expected_version: u64,
    account: ClientAccount,
    dirty: bool,
}

/// Atomic scope of one logical operation.
///
/// Accounts are read from the store once and then served from the staged
/// copy, so later steps see the effect of earlier ones. Nothing reaches the
/// store until [`UnitOfWork::commit`]; dropping the unit discards every
/// staged change.
pub struct UnitOfWork<'s, S: ?Sized> {
    store: &'s S,
    accounts: BTreeMap<AccountId, StagedAccount>,
    transactions: Vec<NewTransaction>,
}

impl<'s, S> UnitOfWork<'s, S>
where
    S: LedgerStore + ?Sized,
{
    pub fn begin(store: &'s S) -> Self {
        Self {
            store,
            accounts: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    /// Current state of an account inside this scope.
    pub fn account(&mut self, account: &AccountRef) -> Result<ClientAccount, TransactionProcessError> {
        let staged = match account {
            AccountRef::Id(id) => self.accounts.get(id),
            AccountRef::Number(number) => self
                .accounts
                .values()
                .find(|staged| &staged.account.number == number),
        };
        if let Some(staged) = staged {
            return Ok(staged.account.clone());
        }

        let loaded = match account {
            AccountRef::Id(id) => self.store.account_by_id(*id)?,
            AccountRef::Number(number) => self.store.account_by_number(number)?,
        }
        .ok_or_else(|| TransactionProcessError::AccountNotFound(account.clone()))?;

        self.accounts.insert(
            loaded.id,
            StagedAccount {
                expected_version: loaded.version,
                account: loaded.clone(),
                dirty: false,
            },
        );
        Ok(loaded)
    }

    /// Applies an approved balance event to the staged account.
    pub fn apply(&mut self, event: &BalanceEvent) -> Result<(), TransactionProcessError> {
        let staged = self
            .accounts
            .get_mut(&event.account_id)
            .ok_or(StoreError::UnknownAccount(event.account_id))?;
        staged.account.apply(event);
        staged.dirty = true;
        Ok(())
    }

    /// Stages a ledger row and returns its position in the commit receipt.
    pub fn save_transaction(&mut self, transaction: NewTransaction) -> usize {
        self.transactions.push(transaction);
        self.transactions.len() - 1
    }

    pub fn commit(self) -> Result<CommitReceipt, StoreError> {
        let accounts = self
            .accounts
            .into_values()
            .filter(|staged| staged.dirty)
            .map(|staged| AccountWrite {
                account: staged.account,
                expected_version: staged.expected_version,
            })
            .collect();
        self.store.commit(WriteBatch {
            accounts,
            transactions: self.transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::{
        account::{AccountNumber, BalanceEventKind},
        store::in_memory_store::InMemoryLedgerStore,
        transaction::TransactionKind,
    };

    use super::*;

    fn seeded_store() -> InMemoryLedgerStore {
        let store = InMemoryLedgerStore::new();
        store
            .insert_account(
                ClientAccount::open(1, "c", AccountNumber::parse("0000000001").unwrap(), Utc::now())
                    .with_opening_balance(Decimal::new(100, 0)),
            )
            .unwrap();
        store
    }

    #[test]
    fn staged_changes_are_visible_inside_scope_only() {
        let store = seeded_store();
        let mut uow = UnitOfWork::begin(&store);

        let acc = uow.account(&AccountRef::Id(1)).unwrap();
        uow.apply(&BalanceEvent {
            account_id: acc.id,
            amount: Decimal::new(40, 0),
            kind: BalanceEventKind::Debited,
        })
        .unwrap();

        let by_number = uow
            .account(&AccountRef::Number(AccountNumber::parse("0000000001").unwrap()))
            .unwrap();
        assert_eq!(by_number.available(), Decimal::new(60, 0));
        assert_eq!(
            store.account_by_id(1).unwrap().unwrap().available(),
            Decimal::new(100, 0)
        );

        drop(uow);
        assert_eq!(
            store.account_by_id(1).unwrap().unwrap().available(),
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn commit_writes_accounts_and_rows_together() {
        let store = seeded_store();
        let mut uow = UnitOfWork::begin(&store);
        let acc = uow.account(&AccountRef::Id(1)).unwrap();
        uow.apply(&acc.handle_credit(Decimal::ONE).unwrap()).unwrap();
        let idx = uow.save_transaction(
            NewTransaction::new(1, TransactionKind::Deposit, Decimal::ONE, None, Utc::now())
                .processed(),
        );
        let receipt = uow.commit().unwrap();

        assert_eq!(idx, 0);
        assert_eq!(receipt.accounts[0].version, 1);
        assert_eq!(receipt.accounts[0].available(), Decimal::new(101, 0));
        assert_eq!(receipt.transactions[0].id, 1);
    }

    #[test]
    fn unknown_account_is_not_found() {
        let store = seeded_store();
        let mut uow = UnitOfWork::begin(&store);
        let err = uow.account(&AccountRef::Id(99)).unwrap_err();
        assert!(matches!(
            err,
            TransactionProcessError::AccountNotFound(AccountRef::Id(99))
        ));
    }
}
