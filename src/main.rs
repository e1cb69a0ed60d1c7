use std::env;

use chrono::{Duration, Utc};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use teller::account::AccountService;
use teller::auth::{AuthService, NewUser};
use teller::batch::{Instruction, read_instructions};
use teller::statement::{self, StatementPeriod};
use teller::store::{DataStore, MemoryStore};
use teller::transfer::{DigitOracle, TransferWorkflow, WorkflowConfig, WorkflowError};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let path = env::args().nth(1).expect("usage: teller <transfers.csv>");

    if !path.ends_with(".csv") {
        warn!(path, "input file seems to not be a csv file");
    }

    let mut auth = AuthService::new(MemoryStore::new());
    let session = auth
        .sign_up(NewUser {
            email: "avery.quinn@example.com".to_string(),
            password: "demo-password".to_string(),
            first_name: "Avery".to_string(),
            last_name: "Quinn".to_string(),
        })
        .expect("failed to create demo account");
    let mut account = AccountService::new(auth.into_store(), session.user_id);

    let (tx_sender, tx_receiver) = tokio::sync::mpsc::channel(16);

    tokio::spawn(async move {
        for result in read_instructions(&path) {
            match result {
                Ok(instruction) => {
                    tx_sender.send(instruction).await.unwrap();
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    let mut stream = ReceiverStream::new(tx_receiver);
    while let Some(instruction) = stream.next().await {
        run_transfer(&mut account, instruction).await;
    }

    let profile = account
        .store()
        .profile(account.user())
        .expect("demo profile exists");
    let transactions = account.transactions().expect("transactions available");
    let today = Utc::now().date_naive();
    let period = StatementPeriod::new(today - Duration::days(30), today);

    let stdout = std::io::stdout();
    statement::write_csv(
        stdout.lock(),
        &profile.full_name(),
        &profile.account_number,
        &period,
        &transactions,
    )
    .expect("failed to write statement");
}

/// Drive one instruction through the full workflow against the current
/// balance. Failures are logged and the instruction is skipped; the batch
/// continues.
async fn run_transfer(account: &mut AccountService<MemoryStore>, instruction: Instruction) {
    let balance = match account.balance() {
        Ok(balance) => balance,
        Err(e) => {
            warn!("{e}");
            return;
        }
    };

    let mut workflow =
        TransferWorkflow::with_verifier(balance, DigitOracle, WorkflowConfig::immediate());
    let recipient = instruction.recipient.clone();

    let filled: Result<(), WorkflowError> = (|| {
        workflow.set_bank(&instruction.bank)?;
        workflow.set_routing_number(&instruction.routing)?;
        workflow.set_account_number(&instruction.account)?;
        workflow.set_account_type(instruction.account_type)?;
        workflow.set_recipient(&instruction.recipient)?;
        workflow.set_amount(&instruction.amount)?;
        workflow.set_memo(&instruction.memo)?;
        workflow.set_speed(instruction.speed)
    })();
    if let Err(e) = filled {
        warn!(recipient = %recipient, "transfer skipped: {e}");
        return;
    }

    match workflow.verify().await {
        Ok(outcome) if outcome.allows_confirmation() => {}
        Ok(_) => {
            warn!(recipient = %recipient, "transfer skipped: verification rejected");
            return;
        }
        Err(e) => {
            warn!(recipient = %recipient, "transfer skipped: {e}");
            return;
        }
    }

    let completed = async {
        workflow.proceed()?;
        workflow.set_authorized(true)?;
        workflow.confirm().await
    }
    .await;
    let completed = match completed {
        Ok(completed) => completed,
        Err(e) => {
            warn!(recipient = %recipient, "transfer skipped: {e}");
            return;
        }
    };

    match account.record_transfer(completed) {
        Ok(tx) => info!(tx = tx.id, "transfer recorded"),
        Err(e) => warn!(recipient = %recipient, "{e}"),
    }
}
