//! Authentication and session management.
//!
//! One module exposing `sign_up` / `sign_in` / `sign_out`, a watchable
//! current session, a sliding-window signup rate limiter, and profile
//! fetches under an explicit retry policy. Credentials live behind the
//! [`DataStore`] boundary; this module never stores them itself.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::Amount;
use crate::model::{NewTransaction, Profile, TxKind, TxStatus, UserId};
use crate::store::{DataStore, NewProfile, StoreError};

/// Balance credited to every new account, mirrored by a welcome-bonus
/// transaction.
pub const OPENING_BALANCE: Amount = Amount::from_cents(5_000_000);

const ACCOUNT_PREFIX: &str = "MRD";

/// Signup form fields.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("too many signup attempts, try again later")]
    RateLimited,

    #[error("profile unavailable after {attempts} attempts: {source}")]
    ProfileUnavailable { attempts: u32, source: StoreError },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sliding-window limiter on account creation. Checked against an explicit
/// instant so the policy is testable without waiting out the window.
#[derive(Debug)]
pub struct SignupRateLimiter {
    max_per_window: usize,
    window: Duration,
    recent: VecDeque<Instant>,
}

impl Default for SignupRateLimiter {
    /// At most 3 signups per sliding 60-second window.
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}

impl SignupRateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            recent: VecDeque::new(),
        }
    }

    /// Record an attempt at `now` if the window has capacity; returns
    /// whether the attempt is allowed.
    pub fn check(&mut self, now: Instant) -> bool {
        while let Some(front) = self.recent.front() {
            if now.duration_since(*front) >= self.window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
        if self.recent.len() < self.max_per_window {
            self.recent.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Retry policy for transient backend failures: a fixed number of attempts
/// with a fixed pause between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no pause. For tests.
    pub fn immediate() -> Self {
        Self {
            backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// The authentication service. Owns the session state; everything durable
/// is behind the store.
pub struct AuthService<S> {
    store: S,
    limiter: SignupRateLimiter,
    retry: RetryPolicy,
    session_tx: watch::Sender<Option<Session>>,
}

impl<S: DataStore> AuthService<S> {
    pub fn new(store: S) -> Self {
        Self::with_policies(store, SignupRateLimiter::default(), RetryPolicy::default())
    }

    pub fn with_policies(store: S, limiter: SignupRateLimiter, retry: RetryPolicy) -> Self {
        let (session_tx, _) = watch::channel(None);
        Self {
            store,
            limiter,
            retry,
            session_tx,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give up the store, e.g. to hand it to an
    /// [`AccountService`](crate::AccountService) after signup.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Create an account, credit the opening balance, and sign the new
    /// customer in.
    pub fn sign_up(&mut self, new_user: NewUser) -> Result<Session, AuthError> {
        if !self.limiter.check(Instant::now()) {
            warn!(email = %new_user.email, "signup rate limit hit");
            return Err(AuthError::RateLimited);
        }
        if self.store.profile_by_email(&new_user.email)?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user_id = self.store.create_user(
            NewProfile {
                email: new_user.email.clone(),
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                account_number: generate_account_number(),
                balance: OPENING_BALANCE,
            },
            &new_user.password,
        )?;
        self.store.insert_transaction(
            user_id,
            NewTransaction {
                date: chrono::Utc::now(),
                kind: TxKind::Credit,
                amount: OPENING_BALANCE,
                status: TxStatus::Completed,
                description: "Welcome bonus".to_string(),
                recipient: None,
            },
        )?;

        info!(user = user_id, "account created");
        let session = Session {
            user_id,
            email: new_user.email,
        };
        self.session_tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        let Some(user_id) = self.store.verify_credential(email, password)? else {
            warn!(email, "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        };
        info!(user = user_id, "signed in");
        let session = Session {
            user_id,
            email: email.to_string(),
        };
        self.session_tx.send_replace(Some(session.clone()));
        Ok(session)
    }

    pub fn sign_out(&mut self) {
        self.session_tx.send_replace(None);
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    /// Observe session changes; receivers see sign-ins and sign-outs as
    /// `Some`/`None` transitions.
    pub fn watch_session(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    /// Fetch the profile, retrying transient backend failures under the
    /// configured policy. Non-transient failures are returned immediately.
    pub async fn fetch_profile(&self, user: UserId) -> Result<Profile, AuthError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.profile(user) {
                Ok(profile) => return Ok(profile),
                Err(source @ StoreError::Unavailable(_)) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(AuthError::ProfileUnavailable { attempts: attempt, source });
                    }
                    warn!(user, attempt, "profile fetch failed, retrying");
                    sleep(self.retry.backoff).await;
                }
                Err(other) => return Err(AuthError::Store(other)),
            }
        }
    }
}

fn generate_account_number() -> String {
    let digits: u64 = rand::thread_rng().gen_range(1_000_000_000..10_000_000_000);
    format!("{ACCOUNT_PREFIX}{digits}")
}
