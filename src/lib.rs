//! CrateDump
//!
//! Steam trade bot that gives away TF2 supply crates. Users ask for crates
//! over chat with `!trade <series> <amount>` and receive a trade offer; the
//! administrator can move items in and out freely, and gifts are accepted
//! from anyone.

pub mod bot;
pub mod config;
pub mod handlers;
pub mod inventory;
pub mod logging;
pub mod session;
pub mod state;
pub mod types;
pub mod utils;
pub mod webhook;

pub use bot::{Dispatcher, FatalError};
pub use session::{SessionBridge, SessionEvent, SessionProvider};
pub use types::{CrateRequest, InventoryItem, Offer, OfferId, OfferState, SteamId};
