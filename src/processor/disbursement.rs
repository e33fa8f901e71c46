use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    account::AccountId,
    command::{AccountRef, SingleLegCommand, TransactionCommand},
    guard,
    store::LedgerStore,
    transaction::Transaction,
};

use super::{
    TransactionProcessError,
    ledger_processor::{LegDescriptions, LedgerProcessor, receipt_leg},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisbursementRequest {
    pub client_account_id: AccountId,
    pub origination_account_id: AccountId,
    pub amount: Decimal,
    pub description: Option<String>,
}

/// Ledger rows of a settled disbursement. `transfer_leg` is the outbound
/// row of the client-to-origination transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisbursementReceipt {
    pub withdrawal_leg: Transaction,
    pub deposit_leg: Transaction,
    pub transfer_leg: Transaction,
}

impl<S> LedgerProcessor<S>
where
    S: LedgerStore + ?Sized,
{
    /// Pays out a loan: withdraws from the pool account, deposits to the
    /// client, then transfers from the client to the origination account.
    /// All three legs commit together or not at all.
    pub fn disburse(
        &self,
        request: &DisbursementRequest,
    ) -> Result<DisbursementReceipt, TransactionProcessError> {
        TransactionCommand::check_amount(request.amount)?;
        TransactionCommand::check_description(
            request.description.as_deref(),
            self.config().description_max_len,
        )?;

        let pool = AccountRef::Id(self.config().pool_account_id);
        let client = AccountRef::Id(request.client_account_id);
        let origination = AccountRef::Id(request.origination_account_id);

        let ((withdrawal, deposit, transfer), receipt) =
            self.run_atomic("DESEMBOLSO", |uow, now| {
                for account in [&pool, &client, &origination] {
                    guard::require_active(&uow.account(account)?)?;
                }

                let withdrawal = self.stage_withdrawal(
                    uow,
                    &SingleLegCommand {
                        account: pool.clone(),
                        amount: request.amount,
                        description: Some(format!(
                            "Disbursement to client account {}",
                            request.client_account_id
                        )),
                    },
                    now,
                )?;
                let deposit = self.stage_deposit(
                    uow,
                    &SingleLegCommand {
                        account: client.clone(),
                        amount: request.amount,
                        description: request.description.clone(),
                    },
                    now,
                )?;
                let (transfer, _) = self.stage_transfer(
                    uow,
                    request.client_account_id,
                    request.origination_account_id,
                    request.amount,
                    &LegDescriptions::for_loan_origination(
                        request.client_account_id,
                        request.origination_account_id,
                    ),
                    now,
                )?;
                Ok((withdrawal, deposit, transfer))
            })?;

        let receipt = DisbursementReceipt {
            withdrawal_leg: receipt_leg(&receipt, withdrawal)?,
            deposit_leg: receipt_leg(&receipt, deposit)?,
            transfer_leg: receipt_leg(&receipt, transfer)?,
        };
        info!(
            client = request.client_account_id,
            origination = request.origination_account_id,
            amount = %request.amount,
            withdrawal_tx = receipt.withdrawal_leg.id,
            deposit_tx = receipt.deposit_leg.id,
            transfer_tx = receipt.transfer_leg.id,
            "disbursement settled"
        );
        Ok(receipt)
    }
}
