/// Validation logic for transactions separated from type definitions
use crate::blockchain::State;
use crate::transaction::types::{AsDelta, Amount, Transaction};
use thiserror::Error;

/// Why a transaction was refused by the validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionRejection {
    #[error("transaction creates or destroys tokens (delta sum {sum})")]
    NotConserved { sum: i128 },

    #[error("account {account} would be overdrawn (balance {balance}, change {delta})")]
    Overdraft {
        account: String,
        balance: Amount,
        delta: Amount,
    },

    #[error("balance of account {account} would overflow")]
    BalanceOverflow { account: String },
}

/// Checks a delta against `state`. Genesis credits never pass through here.
///
/// Rule 1: the delta must sum to exactly zero.
/// Rule 2: no touched account may end up negative.
pub fn validate_transaction<D>(tx: &D, state: &State) -> Result<(), TransactionRejection>
where
    D: AsDelta + ?Sized,
{
    let sum = tx.delta_sum();
    if sum != 0 {
        return Err(TransactionRejection::NotConserved { sum });
    }

    for (account, change) in tx.delta() {
        let balance = state.balance(account);
        let resulting = balance as i128 + *change as i128;
        if resulting < 0 {
            return Err(TransactionRejection::Overdraft {
                account: account.clone(),
                balance,
                delta: *change,
            });
        }
        if resulting > Amount::MAX as i128 {
            return Err(TransactionRejection::BalanceOverflow {
                account: account.clone(),
            });
        }
    }
    Ok(())
}

pub fn is_valid_transaction<D>(tx: &D, state: &State) -> bool
where
    D: AsDelta + ?Sized,
{
    validate_transaction(tx, state).is_ok()
}

impl Transaction {
    /// Validate this transaction against the current account state
    pub fn validate(&self, state: &State) -> Result<(), TransactionRejection> {
        validate_transaction(self, state)
    }

    pub fn is_valid(&self, state: &State) -> bool {
        is_valid_transaction(self, state)
    }
}
