pub mod command_handler;
pub mod offer_handler;
pub mod trade_builder;

pub use command_handler::{crate_request, ChatCommand, CommandInterpreter};
pub use offer_handler::{
    classify_new_offer, classify_state_change, AdmissionPolicy, OfferDecision, OfferOutcome,
};
pub use trade_builder::{OfferSubmission, TradeBuilder};
