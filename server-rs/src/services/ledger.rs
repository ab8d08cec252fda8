//! Balance debit/credit on a user row.
//!
//! Both primitives run inside the caller's transaction and read the balance
//! under a row lock, so two concurrent debits against the same user are
//! serialized by the store and can never both pass the balance check.

use uuid::Uuid;

use crate::store::{RosterTx, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub previous_balance: i64,
    pub new_balance: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance: have {balance}, need {amount}")]
    InsufficientBalance { balance: i64, amount: i64 },

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("invalid ledger amount {0}")]
    InvalidAmount(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Balance after taking `amount`, if the balance covers it.
pub fn debited_balance(balance: i64, amount: i64) -> Result<i64, LedgerError> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    if balance < amount {
        return Err(LedgerError::InsufficientBalance { balance, amount });
    }
    Ok(balance - amount)
}

pub fn credited_balance(balance: i64, amount: i64) -> Result<i64, LedgerError> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    balance
        .checked_add(amount)
        .ok_or(LedgerError::InvalidAmount(amount))
}

pub async fn debit(
    tx: &mut dyn RosterTx,
    user_id: Uuid,
    amount: i64,
) -> Result<LedgerReceipt, LedgerError> {
    let user = tx
        .lock_user(user_id)
        .await?
        .ok_or(LedgerError::UserNotFound(user_id))?;

    let new_balance = debited_balance(user.balance_cents, amount)?;
    tx.set_user_balance(user_id, new_balance).await?;

    tracing::debug!(%user_id, amount, new_balance, "ledger debit");
    Ok(LedgerReceipt {
        previous_balance: user.balance_cents,
        new_balance,
    })
}

pub async fn credit(
    tx: &mut dyn RosterTx,
    user_id: Uuid,
    amount: i64,
) -> Result<LedgerReceipt, LedgerError> {
    let user = tx
        .lock_user(user_id)
        .await?
        .ok_or(LedgerError::UserNotFound(user_id))?;

    let new_balance = credited_balance(user.balance_cents, amount)?;
    tx.set_user_balance(user_id, new_balance).await?;

    tracing::debug!(%user_id, amount, new_balance, "ledger credit");
    Ok(LedgerReceipt {
        previous_balance: user.balance_cents,
        new_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserAccount;
    use crate::store::{MemoryRosterStore, RosterStore};

    #[test]
    fn debit_requires_covering_balance() {
        assert_eq!(debited_balance(1000, 500).unwrap(), 500);
        assert_eq!(debited_balance(500, 500).unwrap(), 0);
        assert!(matches!(
            debited_balance(499, 500),
            Err(LedgerError::InsufficientBalance {
                balance: 499,
                amount: 500
            })
        ));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(matches!(
            debited_balance(1000, -1),
            Err(LedgerError::InvalidAmount(-1))
        ));
        assert!(matches!(
            credited_balance(1000, -1),
            Err(LedgerError::InvalidAmount(-1))
        ));
    }

    #[test]
    fn credit_reverses_debit() {
        let after_debit = debited_balance(1000, 450).unwrap();
        assert_eq!(credited_balance(after_debit, 450).unwrap(), 1000);
    }

    #[tokio::test]
    async fn debit_and_credit_persist_on_commit() {
        let store = MemoryRosterStore::new();
        let user_id = Uuid::new_v4();
        store
            .seed_user(UserAccount {
                id: user_id,
                display_name: "Lucia".into(),
                balance_cents: 1000,
                is_admin: false,
            })
            .await;

        let mut tx = store.begin().await.unwrap();
        let receipt = debit(tx.as_mut(), user_id, 300).await.unwrap();
        assert_eq!(receipt.new_balance, 700);
        let receipt = credit(tx.as_mut(), user_id, 100).await.unwrap();
        assert_eq!(receipt.previous_balance, 700);
        assert_eq!(receipt.new_balance, 800);
        tx.commit().await.unwrap();

        assert_eq!(store.user(user_id).await.unwrap().balance_cents, 800);
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_balance_untouched() {
        let store = MemoryRosterStore::new();
        let user_id = Uuid::new_v4();
        store
            .seed_user(UserAccount {
                id: user_id,
                display_name: "Marc".into(),
                balance_cents: 1000,
                is_admin: false,
            })
            .await;

        {
            let mut tx = store.begin().await.unwrap();
            debit(tx.as_mut(), user_id, 1000).await.unwrap();
        }

        assert_eq!(store.user(user_id).await.unwrap().balance_cents, 1000);
    }

    #[tokio::test]
    async fn missing_user_is_reported() {
        let store = MemoryRosterStore::new();
        let mut tx = store.begin().await.unwrap();
        let missing = Uuid::new_v4();
        assert!(matches!(
            credit(tx.as_mut(), missing, 100).await,
            Err(LedgerError::UserNotFound(id)) if id == missing
        ));
    }
}
