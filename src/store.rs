//! The hosted-backend boundary.
//!
//! All durable state (profiles, credentials, transactions, cards, savings
//! goals, notifications) is owned by the managed backend. [`DataStore`]
//! marks that boundary; [`MemoryStore`] is the in-crate stand-in used by the
//! batch driver and the tests.

use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;

use crate::Amount;
use crate::model::{
    Card, CardId, CardStatus, GoalId, NewCard, NewGoal, NewNotification, NewTransaction, NoteId,
    Notification, Profile, SavingsGoal, Transaction, TxId, UserId,
};

/// Errors crossing the backend boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("profile for user {0} not found")]
    ProfileNotFound(UserId),

    #[error("{kind} {id} not found")]
    RowNotFound { kind: &'static str, id: u64 },

    /// Transient failure; callers with a retry policy may try again.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Profile fields supplied at signup; the store assigns the user id.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub account_number: String,
    pub balance: Amount,
}

/// The operations the application needs from the hosted backend. Row
/// storage, auth credentials, and id assignment all live on the other side
/// of this trait.
pub trait DataStore {
    /// Create the profile and its credential in one step, returning the
    /// assigned user id.
    fn create_user(&mut self, profile: NewProfile, password: &str) -> Result<UserId, StoreError>;
    fn profile(&self, user: UserId) -> Result<Profile, StoreError>;
    fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError>;
    fn update_balance(&mut self, user: UserId, balance: Amount) -> Result<(), StoreError>;
    fn set_pin(&mut self, user: UserId, pin: Option<String>) -> Result<(), StoreError>;
    /// Check a credential pair, returning the user id on a match.
    fn verify_credential(&self, email: &str, password: &str)
    -> Result<Option<UserId>, StoreError>;

    fn insert_transaction(
        &mut self,
        user: UserId,
        tx: NewTransaction,
    ) -> Result<Transaction, StoreError>;
    /// Transactions for a user, newest first.
    fn transactions(&self, user: UserId) -> Result<Vec<Transaction>, StoreError>;

    fn insert_card(&mut self, user: UserId, card: NewCard) -> Result<Card, StoreError>;
    fn cards(&self, user: UserId) -> Result<Vec<Card>, StoreError>;
    fn set_card_status(
        &mut self,
        user: UserId,
        card: CardId,
        status: CardStatus,
    ) -> Result<(), StoreError>;

    fn insert_goal(&mut self, user: UserId, goal: NewGoal) -> Result<SavingsGoal, StoreError>;
    fn goals(&self, user: UserId) -> Result<Vec<SavingsGoal>, StoreError>;
    fn update_goal_amount(
        &mut self,
        user: UserId,
        goal: GoalId,
        current: Amount,
    ) -> Result<(), StoreError>;

    fn insert_notification(
        &mut self,
        user: UserId,
        note: NewNotification,
    ) -> Result<Notification, StoreError>;
    /// Notifications for a user, newest first.
    fn notifications(&self, user: UserId) -> Result<Vec<Notification>, StoreError>;
    fn mark_notification_read(&mut self, user: UserId, note: NoteId) -> Result<(), StoreError>;
}

/// In-memory stand-in for the hosted backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: HashMap<UserId, Profile>,
    /// email -> (user, password)
    credentials: HashMap<String, (UserId, String)>,
    transactions: HashMap<UserId, Vec<Transaction>>,
    cards: HashMap<UserId, Vec<Card>>,
    goals: HashMap<UserId, Vec<SavingsGoal>>,
    notifications: HashMap<UserId, Vec<Notification>>,
    next_user: UserId,
    next_row: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_row_id(&mut self) -> u64 {
        self.next_row += 1;
        self.next_row
    }

    fn profile_mut(&mut self, user: UserId) -> Result<&mut Profile, StoreError> {
        self.profiles
            .get_mut(&user)
            .ok_or(StoreError::ProfileNotFound(user))
    }
}

impl DataStore for MemoryStore {
    fn create_user(&mut self, profile: NewProfile, password: &str) -> Result<UserId, StoreError> {
        self.next_user += 1;
        let user = self.next_user;
        self.credentials
            .insert(profile.email.clone(), (user, password.to_string()));
        self.profiles.insert(
            user,
            Profile {
                user_id: user,
                email: profile.email,
                first_name: profile.first_name,
                last_name: profile.last_name,
                account_number: profile.account_number,
                balance: profile.balance,
                transaction_pin: None,
            },
        );
        Ok(user)
    }

    fn profile(&self, user: UserId) -> Result<Profile, StoreError> {
        self.profiles
            .get(&user)
            .cloned()
            .ok_or(StoreError::ProfileNotFound(user))
    }

    fn profile_by_email(&self, email: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self
            .profiles
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    fn update_balance(&mut self, user: UserId, balance: Amount) -> Result<(), StoreError> {
        self.profile_mut(user)?.balance = balance;
        Ok(())
    }

    fn set_pin(&mut self, user: UserId, pin: Option<String>) -> Result<(), StoreError> {
        self.profile_mut(user)?.transaction_pin = pin;
        Ok(())
    }

    fn verify_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserId>, StoreError> {
        Ok(match self.credentials.get(email) {
            Some((user, stored)) if stored == password => Some(*user),
            _ => None,
        })
    }

    fn insert_transaction(
        &mut self,
        user: UserId,
        tx: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        let row = Transaction {
            id: self.next_row_id() as TxId,
            date: tx.date,
            kind: tx.kind,
            amount: tx.amount,
            status: tx.status,
            description: tx.description,
            recipient: tx.recipient,
        };
        self.transactions.entry(user).or_default().insert(0, row.clone());
        Ok(row)
    }

    fn transactions(&self, user: UserId) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.transactions.get(&user).cloned().unwrap_or_default())
    }

    fn insert_card(&mut self, user: UserId, card: NewCard) -> Result<Card, StoreError> {
        let row = Card {
            id: self.next_row_id() as CardId,
            kind: card.kind,
            last_four: card.last_four,
            expires: card.expires,
            status: CardStatus::Active,
        };
        self.cards.entry(user).or_default().insert(0, row.clone());
        Ok(row)
    }

    fn cards(&self, user: UserId) -> Result<Vec<Card>, StoreError> {
        Ok(self.cards.get(&user).cloned().unwrap_or_default())
    }

    fn set_card_status(
        &mut self,
        user: UserId,
        card: CardId,
        status: CardStatus,
    ) -> Result<(), StoreError> {
        let row = self
            .cards
            .get_mut(&user)
            .and_then(|cards| cards.iter_mut().find(|c| c.id == card))
            .ok_or(StoreError::RowNotFound {
                kind: "card",
                id: card,
            })?;
        row.status = status;
        Ok(())
    }

    fn insert_goal(&mut self, user: UserId, goal: NewGoal) -> Result<SavingsGoal, StoreError> {
        let row = SavingsGoal {
            id: self.next_row_id() as GoalId,
            name: goal.name,
            current: Amount::ZERO,
            target: goal.target,
        };
        self.goals.entry(user).or_default().insert(0, row.clone());
        Ok(row)
    }

    fn goals(&self, user: UserId) -> Result<Vec<SavingsGoal>, StoreError> {
        Ok(self.goals.get(&user).cloned().unwrap_or_default())
    }

    fn update_goal_amount(
        &mut self,
        user: UserId,
        goal: GoalId,
        current: Amount,
    ) -> Result<(), StoreError> {
        let row = self
            .goals
            .get_mut(&user)
            .and_then(|goals| goals.iter_mut().find(|g| g.id == goal))
            .ok_or(StoreError::RowNotFound {
                kind: "savings goal",
                id: goal,
            })?;
        row.current = current;
        Ok(())
    }

    fn insert_notification(
        &mut self,
        user: UserId,
        note: NewNotification,
    ) -> Result<Notification, StoreError> {
        let row = Notification {
            id: self.next_row_id() as NoteId,
            title: note.title,
            message: note.message,
            created_at: Utc::now(),
            read: false,
        };
        self.notifications
            .entry(user)
            .or_default()
            .insert(0, row.clone());
        Ok(row)
    }

    fn notifications(&self, user: UserId) -> Result<Vec<Notification>, StoreError> {
        Ok(self.notifications.get(&user).cloned().unwrap_or_default())
    }

    fn mark_notification_read(&mut self, user: UserId, note: NoteId) -> Result<(), StoreError> {
        let row = self
            .notifications
            .get_mut(&user)
            .and_then(|notes| notes.iter_mut().find(|n| n.id == note))
            .ok_or(StoreError::RowNotFound {
                kind: "notification",
                id: note,
            })?;
        row.read = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardKind, TxKind, TxStatus};

    fn new_profile(email: &str) -> NewProfile {
        NewProfile {
            email: email.to_string(),
            first_name: "Jane".to_string(),
            last_name: "Public".to_string(),
            account_number: "MRD1234567890".to_string(),
            balance: Amount::from_cents(500_000),
        }
    }

    #[test]
    fn create_user_assigns_sequential_ids() {
        let mut store = MemoryStore::new();
        let a = store.create_user(new_profile("a@example.com"), "pw").unwrap();
        let b = store.create_user(new_profile("b@example.com"), "pw").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.profile(a).unwrap().email, "a@example.com");
        assert_eq!(store.profile(b).unwrap().email, "b@example.com");
    }

    #[test]
    fn missing_profile_is_an_error() {
        let store = MemoryStore::new();
        assert_eq!(store.profile(42), Err(StoreError::ProfileNotFound(42)));
    }

    #[test]
    fn credential_check() {
        let mut store = MemoryStore::new();
        let user = store
            .create_user(new_profile("a@example.com"), "hunter2")
            .unwrap();
        assert_eq!(
            store.verify_credential("a@example.com", "hunter2").unwrap(),
            Some(user)
        );
        assert_eq!(
            store.verify_credential("a@example.com", "wrong").unwrap(),
            None
        );
        assert_eq!(
            store.verify_credential("nobody@example.com", "hunter2").unwrap(),
            None
        );
    }

    #[test]
    fn balance_and_pin_updates_stick() {
        let mut store = MemoryStore::new();
        let user = store.create_user(new_profile("a@example.com"), "pw").unwrap();
        store.update_balance(user, Amount::from_cents(123)).unwrap();
        store.set_pin(user, Some("1234".to_string())).unwrap();

        let profile = store.profile(user).unwrap();
        assert_eq!(profile.balance, Amount::from_cents(123));
        assert_eq!(profile.transaction_pin.as_deref(), Some("1234"));
    }

    #[test]
    fn transactions_are_newest_first() {
        let mut store = MemoryStore::new();
        let user = store.create_user(new_profile("a@example.com"), "pw").unwrap();
        for description in ["first", "second"] {
            store
                .insert_transaction(
                    user,
                    NewTransaction {
                        date: Utc::now(),
                        kind: TxKind::Debit,
                        amount: Amount::from_cents(100),
                        status: TxStatus::Completed,
                        description: description.to_string(),
                        recipient: None,
                    },
                )
                .unwrap();
        }
        let txs = store.transactions(user).unwrap();
        assert_eq!(txs[0].description, "second");
        assert_eq!(txs[1].description, "first");
    }

    #[test]
    fn card_status_round_trip() {
        let mut store = MemoryStore::new();
        let user = store.create_user(new_profile("a@example.com"), "pw").unwrap();
        let card = store
            .insert_card(
                user,
                NewCard {
                    kind: CardKind::Virtual,
                    last_four: "4532".to_string(),
                    expires: "12/28".to_string(),
                },
            )
            .unwrap();
        assert_eq!(card.status, CardStatus::Active);

        store.set_card_status(user, card.id, CardStatus::Frozen).unwrap();
        assert_eq!(store.cards(user).unwrap()[0].status, CardStatus::Frozen);

        let err = store.set_card_status(user, 999, CardStatus::Active).unwrap_err();
        assert!(matches!(err, StoreError::RowNotFound { kind: "card", .. }));
    }

    #[test]
    fn goal_funding_updates_current() {
        let mut store = MemoryStore::new();
        let user = store.create_user(new_profile("a@example.com"), "pw").unwrap();
        let goal = store
            .insert_goal(
                user,
                NewGoal {
                    name: "Vacation Fund".to_string(),
                    target: Amount::from_cents(500_000),
                },
            )
            .unwrap();
        assert_eq!(goal.current, Amount::ZERO);

        store
            .update_goal_amount(user, goal.id, Amount::from_cents(25_000))
            .unwrap();
        assert_eq!(store.goals(user).unwrap()[0].current, Amount::from_cents(25_000));
    }

    #[test]
    fn notification_mark_read() {
        let mut store = MemoryStore::new();
        let user = store.create_user(new_profile("a@example.com"), "pw").unwrap();
        let note = store
            .insert_notification(
                user,
                NewNotification {
                    title: "Transfer sent".to_string(),
                    message: "250.00 sent".to_string(),
                },
            )
            .unwrap();
        assert!(!note.read);

        store.mark_notification_read(user, note.id).unwrap();
        assert!(store.notifications(user).unwrap()[0].read);
    }
}
