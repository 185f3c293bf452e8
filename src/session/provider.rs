use std::time::Duration;
use thiserror::Error;

use crate::types::{
    InventoryItem, Offer, OfferId, OfferState, PollCursor, Relationship, SteamId,
};

/// Errors returned by calls into the session provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session bridge disconnected")]
    Disconnected,

    #[error("no reply from session bridge within {0:?}")]
    Timeout(Duration),

    /// The platform refused the call; carries its message verbatim
    #[error("{0}")]
    Rejected(String),

    #[error("malformed session bridge message: {0}")]
    Protocol(String),

    #[error("session transport error: {0}")]
    Transport(String),
}

/// Everything the provider needs to log on and start polling offers
#[derive(Debug, Clone)]
pub struct LogOnDetails {
    pub account_name: String,
    pub password: String,
    pub domain: String,
    pub poll_interval: Duration,
    /// Outgoing offers still unanswered after this long get canceled
    pub cancel_after: Duration,
}

/// Account restrictions reported right after logging on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountLimitations {
    pub limited: bool,
    pub community_banned: bool,
    pub locked: bool,
    pub can_invite_friends: bool,
}

/// An outgoing offer that has not been submitted yet
#[derive(Debug, Clone, PartialEq)]
pub struct DraftOffer {
    pub partner: SteamId,
    pub items_to_give: Vec<InventoryItem>,
    pub message: String,
}

impl DraftOffer {
    pub fn new(partner: SteamId) -> Self {
        Self {
            partner,
            items_to_give: Vec::new(),
            message: String::new(),
        }
    }

    pub fn add_my_items(&mut self, items: impl IntoIterator<Item = InventoryItem>) {
        self.items_to_give.extend(items);
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }
}

/// Provider-level result of a successful submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Delivered to the partner
    Sent(OfferId),
    /// Created, but held until confirmed out of band (email/mobile)
    Pending(OfferId),
}

/// Notifications emitted by the session provider
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoggedOn { steam_id: SteamId },
    LogOnFailed { reason: String },
    WebSession,
    WebSessionFailed { reason: String },
    AccountLimitations(AccountLimitations),
    /// Full friend list, delivered once after logging on
    FriendRelationships(Vec<(SteamId, Relationship)>),
    FriendRelationshipChanged { steam_id: SteamId, relationship: Relationship },
    NewItems { count: u32 },
    EmailInfo { address: String, validated: bool },
    Wallet { has_wallet: bool, balance: String },
    ChatMessage { sender: SteamId, text: String },
    OfferCreated(Offer),
    OfferStateChanged { offer: Offer, old_state: OfferState },
    PollCursorUpdated(PollCursor),
    PollFailed { reason: String },
    Disconnected { reason: String },
}

/// The authenticated platform session the bot acts through.
///
/// Authoritative offer and inventory state lives behind this trait; the bot
/// never keeps its own copy of what is in the inventory.
#[allow(async_fn_in_trait)]
pub trait SessionProvider {
    async fn log_on(&self, details: &LogOnDetails) -> Result<(), SessionError>;

    /// Resume offer polling from a cursor saved by a previous run
    async fn import_poll_cursor(&self, cursor: &PollCursor) -> Result<(), SessionError>;

    async fn accept_offer(&self, id: &OfferId) -> Result<(), SessionError>;

    async fn decline_offer(&self, id: &OfferId) -> Result<(), SessionError>;

    fn create_offer(&self, partner: SteamId) -> DraftOffer {
        DraftOffer::new(partner)
    }

    async fn submit_offer(&self, draft: DraftOffer) -> Result<SubmitStatus, SessionError>;

    async fn load_inventory(
        &self,
        app_id: u32,
        context_id: u32,
    ) -> Result<Vec<InventoryItem>, SessionError>;

    /// Items we got out of an accepted offer
    async fn received_items(&self, id: &OfferId) -> Result<Vec<InventoryItem>, SessionError>;

    async fn send_chat(&self, partner: SteamId, text: &str) -> Result<(), SessionError>;

    async fn add_friend(&self, steam_id: SteamId) -> Result<(), SessionError>;
}
