pub mod account;
pub mod amount;
pub mod auth;
pub mod batch;
pub mod model;
pub mod pin;
pub mod routing;
pub mod statement;
pub mod store;
pub mod transfer;

pub use account::AccountService;
pub use amount::Amount;
pub use auth::AuthService;
pub use pin::PinGate;
pub use store::{DataStore, MemoryStore};
pub use transfer::{CompletedTransfer, TransferWorkflow};
