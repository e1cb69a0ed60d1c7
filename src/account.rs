//! Customer account operations.
//!
//! `AccountService` is the hosting side of the transfer workflow and the
//! single writer of the displayed balance. The workflow and the PIN gate
//! never touch the balance themselves; completed operations are applied
//! here, against the store.

use chrono::{Months, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use crate::Amount;
use crate::model::{
    Card, CardId, CardKind, CardStatus, GoalId, NewCard, NewGoal, NewNotification, NewTransaction,
    NoteId, Notification, SavingsGoal, Transaction, TxKind, TxStatus, UserId,
};
use crate::pin::PinGate;
use crate::store::{DataStore, StoreError};
use crate::transfer::CompletedTransfer;

/// Where a withdrawal is paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawDestination {
    Bank,
    Card,
    External,
}

impl WithdrawDestination {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawDestination::Bank => "bank account",
            WithdrawDestination::Card => "card",
            WithdrawDestination::External => "external wallet",
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Amount,
        requested: Amount,
    },

    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("transaction PIN verification required")]
    PinRequired,

    #[error("PIN must be exactly 4 digits")]
    PinFormat,

    #[error("PINs do not match")]
    PinConfirmationMismatch,

    #[error("current PIN is incorrect")]
    PinIncorrect,

    #[error("new PIN must be different from the current PIN")]
    PinUnchanged,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operations on one customer's account. Mutations go through the store;
/// nothing is cached here.
pub struct AccountService<S> {
    store: S,
    user: UserId,
}

impl<S: DataStore> AccountService<S> {
    pub fn new(store: S, user: UserId) -> Self {
        Self { store, user }
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn balance(&self) -> Result<Amount, AccountError> {
        Ok(self.store.profile(self.user)?.balance)
    }

    pub fn transactions(&self) -> Result<Vec<Transaction>, AccountError> {
        Ok(self.store.transactions(self.user)?)
    }

    /// Apply a completed transfer handed up by the workflow: persist the
    /// debit, decrement the balance, raise a notification.
    ///
    /// Sufficiency was enforced against the balance snapshot when the
    /// workflow validated the draft; it is not re-checked here.
    pub fn record_transfer(
        &mut self,
        completed: CompletedTransfer,
    ) -> Result<Transaction, AccountError> {
        let profile = self.store.profile(self.user)?;
        let tx = self.store.insert_transaction(
            self.user,
            NewTransaction {
                date: Utc::now(),
                kind: TxKind::Debit,
                amount: completed.amount,
                status: TxStatus::Completed,
                description: format!("Transfer to {}", completed.recipient_name),
                recipient: Some(completed.recipient_name.clone()),
            },
        )?;
        self.store
            .update_balance(self.user, profile.balance - completed.amount)?;
        self.store.insert_notification(
            self.user,
            NewNotification {
                title: "Transfer sent".to_string(),
                message: format!(
                    "{} sent to {}",
                    completed.amount, completed.recipient_name
                ),
            },
        )?;
        info!(
            user = self.user,
            tx = tx.id,
            amount = %completed.amount,
            "transfer applied"
        );
        Ok(tx)
    }

    /// Withdraw from the balance. PIN-protected: the caller passes a gate it
    /// already drove to its verified state, and the gate is consumed so one
    /// verification authorizes exactly one withdrawal.
    pub fn withdraw(
        &mut self,
        amount: Amount,
        destination: WithdrawDestination,
        gate: PinGate,
    ) -> Result<Transaction, AccountError> {
        if !gate.is_verified() {
            warn!(user = self.user, "withdrawal without PIN verification skipped");
            return Err(AccountError::PinRequired);
        }
        if !amount.is_positive() {
            return Err(AccountError::NonPositiveAmount);
        }
        let profile = self.store.profile(self.user)?;
        if profile.balance < amount {
            info!(
                user = self.user,
                available = %profile.balance,
                requested = %amount,
                "withdrawal skipped"
            );
            return Err(AccountError::InsufficientFunds {
                available: profile.balance,
                requested: amount,
            });
        }

        let tx = self.store.insert_transaction(
            self.user,
            NewTransaction {
                date: Utc::now(),
                kind: TxKind::Debit,
                amount,
                status: TxStatus::Pending,
                description: format!("Withdrawal to {}", destination.as_str()),
                recipient: None,
            },
        )?;
        self.store
            .update_balance(self.user, profile.balance - amount)?;
        self.store.insert_notification(
            self.user,
            NewNotification {
                title: "Withdrawal processing".to_string(),
                message: format!("{} will be sent to your {}", amount, destination.as_str()),
            },
        )?;
        info!(user = self.user, tx = tx.id, amount = %amount, "withdrawal applied");
        Ok(tx)
    }

    /// Create or change the transaction PIN. Creating requires no current
    /// PIN; changing requires the current one and a genuinely new value.
    /// Either way the new PIN must be exactly 4 digits and confirmed.
    pub fn set_transaction_pin(
        &mut self,
        current: Option<&str>,
        new_pin: &str,
        confirmation: &str,
    ) -> Result<(), AccountError> {
        if new_pin.len() != 4 || !new_pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountError::PinFormat);
        }
        if new_pin != confirmation {
            return Err(AccountError::PinConfirmationMismatch);
        }
        let profile = self.store.profile(self.user)?;
        if let Some(stored) = profile.transaction_pin.as_deref() {
            if current != Some(stored) {
                warn!(user = self.user, "PIN change with wrong current PIN skipped");
                return Err(AccountError::PinIncorrect);
            }
            if new_pin == stored {
                return Err(AccountError::PinUnchanged);
            }
        }
        self.store.set_pin(self.user, Some(new_pin.to_string()))?;
        info!(user = self.user, "transaction PIN updated");
        Ok(())
    }

    /// The stored PIN, for arming a [`PinGate`] in front of a sensitive
    /// action.
    pub fn transaction_pin(&self) -> Result<Option<String>, AccountError> {
        Ok(self.store.profile(self.user)?.transaction_pin)
    }

    pub fn create_goal(&mut self, name: &str, target: Amount) -> Result<SavingsGoal, AccountError> {
        if !target.is_positive() {
            return Err(AccountError::NonPositiveAmount);
        }
        Ok(self.store.insert_goal(
            self.user,
            NewGoal {
                name: name.to_string(),
                target,
            },
        )?)
    }

    pub fn goals(&self) -> Result<Vec<SavingsGoal>, AccountError> {
        Ok(self.store.goals(self.user)?)
    }

    /// Move funds from the main balance into a savings goal. Funding past
    /// the target is allowed.
    pub fn add_to_goal(&mut self, goal: GoalId, amount: Amount) -> Result<(), AccountError> {
        if !amount.is_positive() {
            return Err(AccountError::NonPositiveAmount);
        }
        let profile = self.store.profile(self.user)?;
        if profile.balance < amount {
            return Err(AccountError::InsufficientFunds {
                available: profile.balance,
                requested: amount,
            });
        }
        let current = self
            .store
            .goals(self.user)?
            .into_iter()
            .find(|g| g.id == goal)
            .ok_or(StoreError::RowNotFound {
                kind: "savings goal",
                id: goal,
            })?
            .current;

        self.store
            .update_goal_amount(self.user, goal, current + amount)?;
        self.store
            .update_balance(self.user, profile.balance - amount)?;
        info!(user = self.user, goal, amount = %amount, "goal funded");
        Ok(())
    }

    /// Issue a new card with generated digits and a 4-year expiry.
    pub fn issue_card(&mut self, kind: CardKind) -> Result<Card, AccountError> {
        let last_four = format!("{:04}", rand::thread_rng().gen_range(0..10_000));
        let expires = Utc::now()
            .checked_add_months(Months::new(48))
            .unwrap_or_else(Utc::now)
            .format("%m/%y")
            .to_string();
        let card = self.store.insert_card(
            self.user,
            NewCard {
                kind,
                last_four,
                expires,
            },
        )?;
        info!(user = self.user, card = card.id, kind = card.kind.as_str(), "card issued");
        Ok(card)
    }

    pub fn cards(&self) -> Result<Vec<Card>, AccountError> {
        Ok(self.store.cards(self.user)?)
    }

    pub fn set_card_status(&mut self, card: CardId, status: CardStatus) -> Result<(), AccountError> {
        self.store.set_card_status(self.user, card, status)?;
        info!(user = self.user, card, frozen = (status == CardStatus::Frozen), "card status changed");
        Ok(())
    }

    pub fn notifications(&self) -> Result<Vec<Notification>, AccountError> {
        Ok(self.store.notifications(self.user)?)
    }

    pub fn mark_notification_read(&mut self, note: NoteId) -> Result<(), AccountError> {
        Ok(self.store.mark_notification_read(self.user, note)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewProfile};

    fn service_with_balance(cents: i64) -> AccountService<MemoryStore> {
        let mut store = MemoryStore::new();
        let user = store
            .create_user(
                NewProfile {
                    email: "jane@example.com".to_string(),
                    first_name: "Jane".to_string(),
                    last_name: "Public".to_string(),
                    account_number: "MRD1234567890".to_string(),
                    balance: Amount::from_cents(cents),
                },
                "hunter2",
            )
            .unwrap();
        store.set_pin(user, Some("1234".to_string())).unwrap();
        AccountService::new(store, user)
    }

    fn verified_gate() -> PinGate {
        let mut gate = PinGate::new(Some("1234"));
        gate.input("1234").unwrap();
        gate.submit().unwrap();
        gate
    }

    fn completed(amount_cents: i64) -> CompletedTransfer {
        CompletedTransfer {
            recipient_name: "John Doe".to_string(),
            amount: Amount::from_cents(amount_cents),
            bank_name: "First National".to_string(),
            account_number: "12345675".to_string(),
        }
    }

    #[test]
    fn record_transfer_persists_debit_and_decrements_balance() {
        let mut account = service_with_balance(100_000);
        let tx = account.record_transfer(completed(25_000)).unwrap();

        assert_eq!(tx.kind, TxKind::Debit);
        assert_eq!(tx.status, TxStatus::Completed);
        assert_eq!(tx.description, "Transfer to John Doe");
        assert_eq!(tx.recipient.as_deref(), Some("John Doe"));
        assert_eq!(account.balance().unwrap(), Amount::from_cents(75_000));

        let notes = account.notifications().unwrap();
        assert_eq!(notes[0].title, "Transfer sent");
    }

    #[test]
    fn withdraw_requires_verified_gate() {
        let mut account = service_with_balance(100_000);

        let unverified = PinGate::new(Some("1234"));
        let err = account
            .withdraw(
                Amount::from_cents(10_000),
                WithdrawDestination::Bank,
                unverified,
            )
            .unwrap_err();
        assert!(matches!(err, AccountError::PinRequired));
        assert!(account.transactions().unwrap().is_empty());
        assert_eq!(account.balance().unwrap(), Amount::from_cents(100_000));
    }

    #[test]
    fn withdraw_with_verified_gate_creates_pending_debit() {
        let mut account = service_with_balance(100_000);
        let tx = account
            .withdraw(
                Amount::from_cents(10_000),
                WithdrawDestination::Bank,
                verified_gate(),
            )
            .unwrap();

        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.description, "Withdrawal to bank account");
        assert_eq!(account.balance().unwrap(), Amount::from_cents(90_000));
    }

    #[test]
    fn withdraw_insufficient_funds_is_refused() {
        let mut account = service_with_balance(5_000);
        let err = account
            .withdraw(
                Amount::from_cents(10_000),
                WithdrawDestination::Card,
                verified_gate(),
            )
            .unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
        assert_eq!(account.balance().unwrap(), Amount::from_cents(5_000));
    }

    #[test]
    fn withdraw_rejects_non_positive_amounts() {
        let mut account = service_with_balance(5_000);
        for cents in [0, -100] {
            let err = account
                .withdraw(
                    Amount::from_cents(cents),
                    WithdrawDestination::Bank,
                    verified_gate(),
                )
                .unwrap_err();
            assert!(matches!(err, AccountError::NonPositiveAmount));
        }
    }

    #[test]
    fn pin_setup_validates_format_and_confirmation() {
        let mut account = service_with_balance(100_000);
        account.store.set_pin(account.user, None).unwrap();

        assert!(matches!(
            account.set_transaction_pin(None, "12", "12"),
            Err(AccountError::PinFormat)
        ));
        assert!(matches!(
            account.set_transaction_pin(None, "12ab", "12ab"),
            Err(AccountError::PinFormat)
        ));
        assert!(matches!(
            account.set_transaction_pin(None, "1234", "4321"),
            Err(AccountError::PinConfirmationMismatch)
        ));

        account.set_transaction_pin(None, "1234", "1234").unwrap();
        assert_eq!(account.transaction_pin().unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn pin_change_requires_the_current_pin_and_a_new_value() {
        let mut account = service_with_balance(100_000);

        assert!(matches!(
            account.set_transaction_pin(Some("0000"), "5678", "5678"),
            Err(AccountError::PinIncorrect)
        ));
        assert!(matches!(
            account.set_transaction_pin(None, "5678", "5678"),
            Err(AccountError::PinIncorrect)
        ));
        assert!(matches!(
            account.set_transaction_pin(Some("1234"), "1234", "1234"),
            Err(AccountError::PinUnchanged)
        ));

        account.set_transaction_pin(Some("1234"), "5678", "5678").unwrap();
        assert_eq!(account.transaction_pin().unwrap().as_deref(), Some("5678"));
    }

    #[test]
    fn goal_funding_moves_balance_into_goal() {
        let mut account = service_with_balance(100_000);
        let goal = account
            .create_goal("Vacation Fund", Amount::from_cents(500_000))
            .unwrap();

        account.add_to_goal(goal.id, Amount::from_cents(30_000)).unwrap();
        assert_eq!(account.balance().unwrap(), Amount::from_cents(70_000));
        assert_eq!(
            account.goals().unwrap()[0].current,
            Amount::from_cents(30_000)
        );

        // Funding may overshoot the target but not the balance.
        let err = account
            .add_to_goal(goal.id, Amount::from_cents(80_000))
            .unwrap_err();
        assert!(matches!(err, AccountError::InsufficientFunds { .. }));
    }

    #[test]
    fn unknown_goal_is_an_error() {
        let mut account = service_with_balance(100_000);
        let err = account.add_to_goal(999, Amount::from_cents(1)).unwrap_err();
        assert!(matches!(
            err,
            AccountError::Store(StoreError::RowNotFound {
                kind: "savings goal",
                ..
            })
        ));
    }

    #[test]
    fn issued_card_has_four_digits_and_expiry() {
        let mut account = service_with_balance(100_000);
        let card = account.issue_card(CardKind::Virtual).unwrap();

        assert_eq!(card.last_four.len(), 4);
        assert!(card.last_four.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(card.expires.len(), 5);
        assert_eq!(&card.expires[2..3], "/");
        assert_eq!(card.status, CardStatus::Active);
    }

    #[test]
    fn card_freeze_round_trip() {
        let mut account = service_with_balance(100_000);
        let card = account.issue_card(CardKind::Physical).unwrap();

        account.set_card_status(card.id, CardStatus::Frozen).unwrap();
        assert_eq!(account.cards().unwrap()[0].status, CardStatus::Frozen);
        account.set_card_status(card.id, CardStatus::Active).unwrap();
        assert_eq!(account.cards().unwrap()[0].status, CardStatus::Active);
    }

    #[test]
    fn notification_read_flag() {
        let mut account = service_with_balance(100_000);
        account.record_transfer(completed(1_000)).unwrap();

        let note_id = account.notifications().unwrap()[0].id;
        account.mark_notification_read(note_id).unwrap();
        assert!(account.notifications().unwrap()[0].read);
    }
}
