//! The editable transfer request and its field-level validation.

use thiserror::Error;

use crate::Amount;
use crate::routing::is_valid_routing;

const ROUTING_LEN: usize = 9;
const ACCOUNT_MIN_LEN: usize = 8;
const ACCOUNT_MAX_LEN: usize = 17;
const MEMO_MAX_LEN: usize = 100;

/// Destination account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
        }
    }
}

/// Requested settlement speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferSpeed {
    #[default]
    Standard,
    Expedited,
}

impl TransferSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferSpeed::Standard => "standard",
            TransferSpeed::Expedited => "expedited",
        }
    }

    /// Settlement estimate shown on the confirmation summary.
    pub fn eta(&self) -> &'static str {
        match self {
            TransferSpeed::Standard => "1-3 business days",
            TransferSpeed::Expedited => "within 24 hours",
        }
    }
}

/// The form field a validation error is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Bank,
    RoutingNumber,
    AccountNumber,
    Recipient,
    Amount,
}

/// A field-level validation error. Non-blocking for other fields; corrected
/// by re-input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field:?}: {message}")]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

impl FieldError {
    pub fn new(field: Field, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// The editable transfer request. Mutable until verification begins.
#[derive(Debug, Clone, Default)]
pub struct TransferDraft {
    pub bank_name: String,
    pub routing_number: String,
    pub account_number: String,
    pub account_type: AccountType,
    pub recipient_name: String,
    /// Raw user entry; parsed to an [`Amount`] during validation.
    pub amount: String,
    pub memo: String,
    pub speed: TransferSpeed,
}

impl TransferDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the routing number, keeping only digits and capping at 9.
    pub fn set_routing_number(&mut self, input: &str) {
        self.routing_number = digits_only(input, ROUTING_LEN);
    }

    /// Replace the account number, keeping only digits and capping at 17.
    pub fn set_account_number(&mut self, input: &str) {
        self.account_number = digits_only(input, ACCOUNT_MAX_LEN);
    }

    /// Replace the memo, truncated to 100 characters.
    pub fn set_memo(&mut self, input: &str) {
        self.memo = input.chars().take(MEMO_MAX_LEN).collect();
    }

    /// Validate every field against the balance snapshot, collecting all
    /// failures rather than stopping at the first. On success returns the
    /// parsed amount.
    pub fn validate(&self, balance: Amount) -> Result<Amount, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.bank_name.is_empty() {
            errors.push(FieldError::new(Field::Bank, "Please select a bank"));
        }
        if self.routing_number.len() != ROUTING_LEN {
            errors.push(FieldError::new(
                Field::RoutingNumber,
                "Enter a valid 9-digit routing number",
            ));
        } else if !is_valid_routing(&self.routing_number) {
            errors.push(FieldError::new(Field::RoutingNumber, "Invalid routing number"));
        }
        if self.account_number.len() < ACCOUNT_MIN_LEN {
            errors.push(FieldError::new(
                Field::AccountNumber,
                "Enter a valid account number",
            ));
        }
        if self.recipient_name.trim().is_empty() {
            errors.push(FieldError::new(Field::Recipient, "Enter recipient name"));
        }

        let mut parsed = None;
        match self.amount.parse::<Amount>() {
            Ok(amount) if !amount.is_positive() => {
                errors.push(FieldError::new(Field::Amount, "Enter a valid amount"));
            }
            Ok(amount) if amount > balance => {
                errors.push(FieldError::new(Field::Amount, "Insufficient funds"));
            }
            Ok(amount) => parsed = Some(amount),
            Err(_) => errors.push(FieldError::new(Field::Amount, "Enter a valid amount")),
        }

        match (parsed, errors.is_empty()) {
            (Some(amount), true) => Ok(amount),
            _ => Err(errors),
        }
    }
}

fn digits_only(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(max_len)
        .collect()
}

/// Initials-only rendering of a recipient name: first letter of the first
/// and last whitespace-separated tokens ("Jane Q. Public" becomes "J. P.").
/// A single-token name repeats its initial.
pub fn masked_recipient(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => {
            let a = first.chars().next().unwrap_or('?');
            let b = last.chars().next().unwrap_or('?');
            format!("{a}. {b}.")
        }
        _ => String::new(),
    }
}

/// `****` plus the last 4 digits of an account number.
pub fn masked_account(account_number: &str) -> String {
    let tail_start = account_number.len().saturating_sub(4);
    format!("****{}", &account_number[tail_start..])
}
