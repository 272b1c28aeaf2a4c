//! Cycle Chamas Crate
//!
//! The service layer for the chama workflow: membership, contribution
//! cycles, contributions, rotating payouts, and balance views. Money
//! movement is delegated to the [`cycle_ledger::Ledger`] collaborator; this
//! crate owns the bookkeeping that surrounds it.

mod balance;
mod contributions;
mod cycles;
mod error;
mod membership;
mod payouts;
mod rotation;
mod service;

#[cfg(test)]
mod test_support;

pub use balance::ChamaBalance;
pub use error::{ChamaError, ChamaResult};
pub use rotation::next_payout_recipient;
pub use service::ChamaService;

pub use cycle_ledger::PLATFORM_FEE_RATE;
