mod bridge;
mod messages;
mod provider;

#[cfg(test)]
pub mod mock;

pub use bridge::SessionBridge;
pub use provider::{
    AccountLimitations, DraftOffer, LogOnDetails, SessionError, SessionEvent, SessionProvider,
    SubmitStatus,
};
