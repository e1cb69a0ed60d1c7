//! Domain records mirroring the hosted backend's row shapes.

use chrono::{DateTime, Utc};

use crate::Amount;

/// User identifier, assigned by the store.
pub type UserId = u64;

/// Transaction identifier, assigned by the store.
pub type TxId = u64;

/// Card identifier, assigned by the store.
pub type CardId = u64;

/// Savings goal identifier, assigned by the store.
pub type GoalId = u64;

/// Notification identifier, assigned by the store.
pub type NoteId = u64;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Credit,
    Debit,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Credit => "credit",
            TxKind::Debit => "debit",
        }
    }
}

/// Settlement status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        }
    }
}

/// A ledger entry on a customer account.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TxId,
    pub date: DateTime<Utc>,
    pub kind: TxKind,
    pub amount: Amount,
    pub status: TxStatus,
    pub description: String,
    pub recipient: Option<String>,
}

/// Insert payload for a transaction; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: DateTime<Utc>,
    pub kind: TxKind,
    pub amount: Amount,
    pub status: TxStatus,
    pub description: String,
    pub recipient: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Virtual,
    Physical,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Virtual => "Virtual",
            CardKind::Physical => "Physical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStatus {
    Active,
    Frozen,
}

/// A payment card attached to the account.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub kind: CardKind,
    pub last_four: String,
    /// Expiry in `MM/YY` form, as printed on the card.
    pub expires: String,
    pub status: CardStatus,
}

/// Insert payload for a card; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub kind: CardKind,
    pub last_four: String,
    pub expires: String,
}

/// A named savings target funded from the main balance.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsGoal {
    pub id: GoalId,
    pub name: String,
    pub current: Amount,
    pub target: Amount,
}

/// Insert payload for a savings goal; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub name: String,
    pub target: Amount,
}

/// An in-app notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NoteId,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

/// Insert payload for a notification; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
}

/// The customer profile row, owned by the hosted backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub account_number: String,
    pub balance: Amount,
    /// 4-digit transaction PIN, unset until the customer configures one.
    pub transaction_pin: Option<String>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
