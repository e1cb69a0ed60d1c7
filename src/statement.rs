//! Bank-statement export.
//!
//! Renders a date-range filtered statement as CSV: a metadata preamble, a
//! blank separator, then one row per transaction with signed amounts
//! (debits negative). The statement never carries the full account number.

use std::io;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::Amount;
use crate::model::{Transaction, TxKind};
use crate::transfer::draft::masked_account;

/// Brand line printed at the top of every statement.
pub const BANK_NAME: &str = "Meridian Bank";

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("failed to write statement: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush statement: {0}")]
    Flush(#[from] io::Error),
}

/// Inclusive date range, in calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl StatementPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let day = ts.date_naive();
        self.start <= day && day <= self.end
    }
}

/// Credit/debit totals over the statement rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementSummary {
    pub credits: Amount,
    pub debits: Amount,
    pub rows: usize,
}

impl StatementSummary {
    pub fn net(&self) -> Amount {
        self.credits - self.debits
    }
}

#[derive(Debug, Serialize)]
struct StatementRow<'a> {
    date: String,
    description: &'a str,
    r#type: &'static str,
    amount: String,
    status: &'static str,
    recipient: &'a str,
}

/// Write the statement for `period` to `writer`, returning the totals over
/// the rows that made it in. Transactions outside the period are skipped.
pub fn write_csv<W: io::Write>(
    writer: W,
    account_holder: &str,
    account_number: &str,
    period: &StatementPeriod,
    transactions: &[Transaction],
) -> Result<StatementSummary, StatementError> {
    // Headers are written by hand below; serialize must not add its own.
    let mut w = csv::WriterBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_writer(writer);

    w.write_record([format!("{BANK_NAME} - Transaction Statement")])?;
    w.write_record([format!("Account Holder: {account_holder}")])?;
    w.write_record([format!("Account Number: {}", masked_account(account_number))])?;
    w.write_record([format!("Statement Period: {} to {}", period.start, period.end)])?;
    w.write_record([format!("Generated: {}", Utc::now().date_naive())])?;
    w.write_record([""])?;
    w.write_record(["Date", "Description", "Type", "Amount", "Status", "Recipient"])?;

    let mut summary = StatementSummary::default();
    for tx in transactions {
        if !period.contains(tx.date) {
            continue;
        }
        let signed = match tx.kind {
            TxKind::Credit => {
                summary.credits += tx.amount;
                tx.amount
            }
            TxKind::Debit => {
                summary.debits += tx.amount;
                Amount::ZERO - tx.amount
            }
        };
        summary.rows += 1;
        w.serialize(StatementRow {
            date: tx.date.date_naive().to_string(),
            description: &tx.description,
            r#type: tx.kind.as_str(),
            amount: signed.to_string(),
            status: tx.status.as_str(),
            recipient: tx.recipient.as_deref().unwrap_or(""),
        })?;
    }

    w.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TxStatus;
    use chrono::TimeZone;

    fn tx(id: u64, day: u32, kind: TxKind, cents: i64, description: &str) -> Transaction {
        Transaction {
            id,
            date: Utc.with_ymd_and_hms(2026, 7, day, 12, 0, 0).unwrap(),
            kind,
            amount: Amount::from_cents(cents),
            status: TxStatus::Completed,
            description: description.to_string(),
            recipient: None,
        }
    }

    fn period(start_day: u32, end_day: u32) -> StatementPeriod {
        StatementPeriod::new(
            NaiveDate::from_ymd_opt(2026, 7, start_day).unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, end_day).unwrap(),
        )
    }

    fn render(period: &StatementPeriod, txs: &[Transaction]) -> (String, StatementSummary) {
        let mut out = Vec::new();
        let summary =
            write_csv(&mut out, "Jane Public", "MRD1234567890", period, txs).unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn preamble_masks_account_number() {
        let (text, _) = render(&period(1, 31), &[]);
        assert!(text.contains("Meridian Bank - Transaction Statement"));
        assert!(text.contains("Account Holder: Jane Public"));
        assert!(text.contains("Account Number: ****7890"));
        assert!(!text.contains("MRD1234567890"));
        assert!(text.contains("Statement Period: 2026-07-01 to 2026-07-31"));
    }

    #[test]
    fn rows_outside_period_are_excluded() {
        let txs = vec![
            tx(1, 5, TxKind::Credit, 10_000, "Salary"),
            tx(2, 20, TxKind::Debit, 2_500, "Groceries"),
        ];
        let (text, summary) = render(&period(1, 10), &txs);
        assert!(text.contains("Salary"));
        assert!(!text.contains("Groceries"));
        assert_eq!(summary.rows, 1);
    }

    #[test]
    fn period_bounds_are_inclusive() {
        let txs = vec![
            tx(1, 1, TxKind::Credit, 100, "start day"),
            tx(2, 31, TxKind::Debit, 50, "end day"),
        ];
        let (_, summary) = render(&period(1, 31), &txs);
        assert_eq!(summary.rows, 2);
    }

    #[test]
    fn debits_are_signed_negative() {
        let txs = vec![tx(1, 5, TxKind::Debit, 2_500, "Groceries")];
        let (text, _) = render(&period(1, 31), &txs);
        assert!(text.contains("-25.00"));
    }

    #[test]
    fn summary_nets_credits_minus_debits() {
        let txs = vec![
            tx(1, 5, TxKind::Credit, 500_000, "Salary"),
            tx(2, 6, TxKind::Debit, 15_000, "Transfer to John Doe"),
            tx(3, 7, TxKind::Debit, 8_550, "Groceries"),
        ];
        let (_, summary) = render(&period(1, 31), &txs);
        assert_eq!(summary.credits, Amount::from_cents(500_000));
        assert_eq!(summary.debits, Amount::from_cents(23_550));
        assert_eq!(summary.net(), Amount::from_cents(476_450));
        assert_eq!(summary.rows, 3);
    }

    #[test]
    fn header_row_present() {
        let (text, _) = render(&period(1, 31), &[]);
        assert!(text.contains("Date,Description,Type,Amount,Status,Recipient"));
    }
}
