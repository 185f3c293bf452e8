mod offer_ledger;
mod poll_store;

pub use offer_ledger::{OfferLedger, Transition};
pub use poll_store::PollStore;
