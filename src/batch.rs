//! CSV input of transfer instructions for the batch driver.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::transfer::{AccountType, TransferSpeed};

/// Errors that can occur when parsing instruction rows.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized account type '{value}'")]
    UnrecognizedAccountType { line: usize, value: String },

    #[error("line {line}: unrecognized transfer speed '{value}'")]
    UnrecognizedSpeed { line: usize, value: String },
}

#[derive(Debug, Deserialize)]
struct InstructionRow {
    bank: String,
    routing: String,
    account: String,
    account_type: Option<String>,
    recipient: String,
    amount: String,
    memo: Option<String>,
    speed: Option<String>,
}

/// One transfer to drive through the workflow. Field values are raw form
/// input; the workflow's own validation decides whether they pass.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub bank: String,
    pub routing: String,
    pub account: String,
    pub account_type: AccountType,
    pub recipient: String,
    pub amount: String,
    pub memo: String,
    pub speed: TransferSpeed,
}

/// Read transfer instructions from a csv file
pub fn read_instructions(
    path: impl AsRef<Path>,
) -> impl Iterator<Item = Result<Instruction, BatchError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .expect("failed to open csv file");

    reader
        .into_deserialize::<InstructionRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| BatchError::Parse { line, source })?;

            let account_type = match row.account_type.as_deref() {
                None | Some("") | Some("checking") => AccountType::Checking,
                Some("savings") => AccountType::Savings,
                Some(other) => {
                    return Err(BatchError::UnrecognizedAccountType {
                        line,
                        value: other.to_string(),
                    });
                }
            };
            let speed = match row.speed.as_deref() {
                None | Some("") | Some("standard") => TransferSpeed::Standard,
                Some("expedited") => TransferSpeed::Expedited,
                Some(other) => {
                    return Err(BatchError::UnrecognizedSpeed {
                        line,
                        value: other.to_string(),
                    });
                }
            };

            Ok(Instruction {
                bank: row.bank,
                routing: row.routing,
                account: row.account,
                account_type,
                recipient: row.recipient,
                amount: row.amount,
                memo: row.memo.unwrap_or_default(),
                speed,
            })
        })
}
