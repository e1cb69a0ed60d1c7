//! The transfer authorization workflow.
//!
//! A four-stage state machine driven by the hosting page: the customer edits
//! a draft, verifies the destination account, reviews a masked summary and
//! explicitly authorizes, then the submission is processed. No path skips
//! verification or authorization, and `Complete` is the only terminal stage.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::Amount;

pub mod draft;
pub use draft::{AccountType, Field, FieldError, TransferDraft, TransferSpeed};

mod verify;
pub use verify::{AccountVerifier, DigitOracle, VerificationOutcome, Verdict};

mod error;
pub use error::WorkflowError;

use draft::{masked_account, masked_recipient};

/// Stage of the workflow. Transitions:
/// `Form ⇄ Verifying → {rejected → Form, verified/uncertain → Confirmation}`;
/// `Confirmation ⇄ Form`; `Confirmation → Processing → Complete`;
/// `Complete → Form` (reset only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Form,
    Verifying,
    Confirmation,
    Processing,
    Complete,
}

/// Simulated latency for the verification and processing calls. A real
/// integration replaces these waits with network calls and must define its
/// own timeout and retry semantics.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    pub verify_delay: Duration,
    pub processing_delay: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            verify_delay: Duration::from_secs(2),
            processing_delay: Duration::from_secs(3),
        }
    }
}

impl WorkflowConfig {
    /// Zero delays, for tests and batch processing.
    pub fn immediate() -> Self {
        Self {
            verify_delay: Duration::ZERO,
            processing_delay: Duration::ZERO,
        }
    }
}

/// The record handed to the hosting page on success. The caller is
/// responsible for persisting a transaction and adjusting the displayed
/// balance; the workflow itself mutates neither.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTransfer {
    pub recipient_name: String,
    pub amount: Amount,
    pub bank_name: String,
    pub account_number: String,
}

/// Read-only summary shown on the confirmation step. Never carries the full
/// recipient name or account number.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationSummary {
    pub amount: Amount,
    pub recipient: String,
    pub bank_name: String,
    pub account: String,
    pub speed: TransferSpeed,
    pub eta: &'static str,
}

/// The transfer workflow state machine. Owns the draft, the verification
/// outcome, the authorization acknowledgment, and the balance snapshot taken
/// when the workflow was created. At most one instance is active per hosted
/// form; the balance is never re-checked against concurrent mutations.
pub struct TransferWorkflow<V = DigitOracle> {
    draft: TransferDraft,
    stage: Stage,
    outcome: VerificationOutcome,
    masked_recipient: String,
    authorized: bool,
    balance: Amount,
    verifier: V,
    config: WorkflowConfig,
}

impl TransferWorkflow<DigitOracle> {
    /// Workflow with the placeholder oracle and default delays.
    pub fn new(balance: Amount) -> Self {
        Self::with_verifier(balance, DigitOracle, WorkflowConfig::default())
    }
}

impl<V: AccountVerifier> TransferWorkflow<V> {
    pub fn with_verifier(balance: Amount, verifier: V, config: WorkflowConfig) -> Self {
        Self {
            draft: TransferDraft::new(),
            stage: Stage::Form,
            outcome: VerificationOutcome::NotStarted,
            masked_recipient: String::new(),
            authorized: false,
            balance,
            verifier,
            config,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn outcome(&self) -> VerificationOutcome {
        self.outcome
    }

    pub fn draft(&self) -> &TransferDraft {
        &self.draft
    }

    /// The balance snapshot this run is validated against.
    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    // Draft edits. Only available on the form; edits to the destination
    // identity (bank, routing, account, recipient) invalidate any previous
    // verification result and force re-verification.

    pub fn set_bank(&mut self, name: &str) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.bank_name = name.to_string();
        self.invalidate_verification();
        Ok(())
    }

    pub fn set_routing_number(&mut self, input: &str) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.set_routing_number(input);
        self.invalidate_verification();
        Ok(())
    }

    pub fn set_account_number(&mut self, input: &str) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.set_account_number(input);
        self.invalidate_verification();
        Ok(())
    }

    pub fn set_recipient(&mut self, name: &str) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.recipient_name = name.to_string();
        self.invalidate_verification();
        Ok(())
    }

    pub fn set_amount(&mut self, input: &str) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.amount = input.to_string();
        Ok(())
    }

    pub fn set_memo(&mut self, input: &str) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.set_memo(input);
        Ok(())
    }

    pub fn set_account_type(&mut self, account_type: AccountType) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.account_type = account_type;
        Ok(())
    }

    pub fn set_speed(&mut self, speed: TransferSpeed) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        self.draft.speed = speed;
        Ok(())
    }

    /// Validate the draft locally, then run the verification call.
    ///
    /// Any field failure returns before the verifier is consulted. A
    /// `Rejected` outcome re-enables the form with the draft intact;
    /// `Verified` and `Uncertain` unlock [`proceed`](Self::proceed).
    pub async fn verify(&mut self) -> Result<VerificationOutcome, WorkflowError> {
        self.ensure_form()?;
        self.draft
            .validate(self.balance)
            .map_err(WorkflowError::Validation)?;

        self.stage = Stage::Verifying;
        self.outcome = VerificationOutcome::InProgress;
        sleep(self.config.verify_delay).await;

        let verdict = self.verifier.classify(&self.draft.account_number);
        self.stage = Stage::Form;
        self.outcome = match verdict {
            Verdict::Rejected => {
                self.masked_recipient.clear();
                warn!(bank = %self.draft.bank_name, "account verification failed");
                VerificationOutcome::Rejected
            }
            Verdict::Uncertain => {
                self.masked_recipient = masked_recipient(&self.draft.recipient_name);
                warn!(recipient = %self.masked_recipient, "account could not be fully verified");
                VerificationOutcome::Uncertain
            }
            Verdict::Verified => {
                self.masked_recipient = masked_recipient(&self.draft.recipient_name);
                info!(recipient = %self.masked_recipient, "account details verified");
                VerificationOutcome::Verified
            }
        };
        Ok(self.outcome)
    }

    /// Move from the form to the confirmation step. Requires a verified or
    /// uncertain outcome.
    pub fn proceed(&mut self) -> Result<(), WorkflowError> {
        self.ensure_form()?;
        if !self.outcome.allows_confirmation() {
            return Err(WorkflowError::NotVerified);
        }
        self.stage = Stage::Confirmation;
        self.authorized = false;
        Ok(())
    }

    /// The masked summary shown on the confirmation step.
    pub fn summary(&self) -> Result<ConfirmationSummary, WorkflowError> {
        if self.stage != Stage::Confirmation {
            return Err(WorkflowError::InvalidStage(self.stage));
        }
        // The draft passed validation before confirmation was reachable.
        let amount = self
            .draft
            .amount
            .parse::<Amount>()
            .map_err(|_| WorkflowError::NotVerified)?;
        Ok(ConfirmationSummary {
            amount,
            recipient: self.masked_recipient.clone(),
            bank_name: self.draft.bank_name.clone(),
            account: masked_account(&self.draft.account_number),
            speed: self.draft.speed,
            eta: self.draft.speed.eta(),
        })
    }

    /// Set or clear the authorization acknowledgment on the confirmation
    /// step.
    pub fn set_authorized(&mut self, authorized: bool) -> Result<(), WorkflowError> {
        if self.stage != Stage::Confirmation {
            return Err(WorkflowError::InvalidStage(self.stage));
        }
        self.authorized = authorized;
        Ok(())
    }

    /// Return from the confirmation step to the form. The draft survives;
    /// the verification result and the acknowledgment do not.
    pub fn go_back(&mut self) -> Result<(), WorkflowError> {
        if self.stage != Stage::Confirmation {
            return Err(WorkflowError::InvalidStage(self.stage));
        }
        self.stage = Stage::Form;
        self.authorized = false;
        self.invalidate_verification();
        Ok(())
    }

    /// Submit the authorized transfer. Processing is non-interruptible; on
    /// completion the workflow reaches `Complete` and the completed record
    /// is returned exactly once.
    pub async fn confirm(&mut self) -> Result<CompletedTransfer, WorkflowError> {
        if self.stage != Stage::Confirmation {
            return Err(WorkflowError::InvalidStage(self.stage));
        }
        if !self.authorized {
            return Err(WorkflowError::NotAuthorized);
        }
        // The amount stays editable after verification without invalidating
        // it, so re-parse here. Sufficiency against the balance snapshot is
        // deliberately not re-checked.
        let amount = match self.draft.amount.parse::<Amount>() {
            Ok(amount) if amount.is_positive() => amount,
            _ => {
                return Err(WorkflowError::Validation(vec![FieldError::new(
                    Field::Amount,
                    "Enter a valid amount",
                )]));
            }
        };

        self.stage = Stage::Processing;
        sleep(self.config.processing_delay).await;
        self.stage = Stage::Complete;

        info!(
            amount = %amount,
            bank = %self.draft.bank_name,
            recipient = %self.masked_recipient,
            "transfer processed"
        );
        Ok(CompletedTransfer {
            recipient_name: self.draft.recipient_name.clone(),
            amount,
            bank_name: self.draft.bank_name.clone(),
            account_number: self.draft.account_number.clone(),
        })
    }

    /// Start over with an empty draft and a fresh balance snapshot. The only
    /// exit from `Complete`, but available from any stage the customer can
    /// abandon.
    pub fn reset(&mut self, balance: Amount) {
        self.draft = TransferDraft::new();
        self.stage = Stage::Form;
        self.authorized = false;
        self.balance = balance;
        self.invalidate_verification();
    }

    fn ensure_form(&self) -> Result<(), WorkflowError> {
        if self.stage == Stage::Form {
            Ok(())
        } else {
            Err(WorkflowError::InvalidStage(self.stage))
        }
    }

    fn invalidate_verification(&mut self) {
        self.outcome = VerificationOutcome::NotStarted;
        self.masked_recipient.clear();
    }
}
