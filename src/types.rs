use serde::{Deserialize, Serialize};
use std::fmt;

/// Low 32 bits of a SteamID64 hold the account id
const INDIVIDUAL_ACCOUNT_MASK: u64 = 0xFFFF_FFFF;
const ACCOUNT_TYPE_SHIFT: u64 = 52;
const UNIVERSE_SHIFT: u64 = 56;

/// A 64-bit Steam identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SteamId(pub u64);

impl SteamId {
    pub fn account_id(&self) -> u32 {
        (self.0 & INDIVIDUAL_ACCOUNT_MASK) as u32
    }

    fn account_type(&self) -> u64 {
        (self.0 >> ACCOUNT_TYPE_SHIFT) & 0xF
    }

    fn universe(&self) -> u64 {
        self.0 >> UNIVERSE_SHIFT
    }

    /// Render as `[U:1:account_id]`, the form Steam uses in its own logs.
    ///
    /// Only individual accounts have a Steam3 letter worth printing; any other
    /// account type falls back to the raw SteamID64.
    pub fn steam3(&self) -> String {
        if self.account_type() == 1 {
            format!("[U:{}:{}]", self.universe(), self.account_id())
        } else {
            self.0.to_string()
        }
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SteamId {
    type Error = std::num::ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse::<u64>().map(SteamId)
    }
}

impl From<SteamId> for String {
    fn from(id: SteamId) -> Self {
        id.0.to_string()
    }
}

/// Platform-assigned trade offer identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub String);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who created the offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDirection {
    /// Sent to us by someone else
    Inbound,
    /// Sent by us
    Outbound,
}

/// Offer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferState {
    Created,
    Accepted,
    Declined,
    Canceled,
    Expired,
    InvalidItems,
    /// We answered an inbound offer with a counter offer
    CounteredBack,
    /// The partner answered our outbound offer with a counter offer
    Countered,
    InEscrow,
    EmailPending,
    Unknown,
}

impl OfferState {
    /// Map the platform's numeric offer state onto our states.
    ///
    /// Code 4 means "the recipient countered", so which side countered depends
    /// on who sent the offer in the first place.
    pub fn from_code(code: u8, direction: OfferDirection) -> Self {
        match code {
            2 => OfferState::Created,
            3 => OfferState::Accepted,
            4 => match direction {
                OfferDirection::Outbound => OfferState::Countered,
                OfferDirection::Inbound => OfferState::CounteredBack,
            },
            5 => OfferState::Expired,
            6 | 10 => OfferState::Canceled,
            7 => OfferState::Declined,
            8 => OfferState::InvalidItems,
            9 => OfferState::EmailPending,
            11 => OfferState::InEscrow,
            _ => OfferState::Unknown,
        }
    }

    /// Terminal states are never left again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OfferState::Accepted
                | OfferState::Declined
                | OfferState::Canceled
                | OfferState::Expired
                | OfferState::InvalidItems
                | OfferState::Countered
                | OfferState::CounteredBack
        )
    }
}

impl fmt::Display for OfferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Descriptive tag attached to an inventory item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTag {
    pub internal_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
}

/// A single tradable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    #[serde(rename = "assetid", alias = "id")]
    pub asset_id: String,
    #[serde(rename = "classid", default)]
    pub class_id: String,
    #[serde(rename = "instanceid", default)]
    pub instance_id: String,
    #[serde(rename = "appid", default)]
    pub app_id: u32,
    #[serde(rename = "contextid", default)]
    pub context_id: String,
    /// `None` when the platform omitted the tag data for this item
    #[serde(default)]
    pub tags: Option<Vec<ItemTag>>,
}

impl InventoryItem {
    /// Check whether this item carries a tag with the given internal name.
    ///
    /// Items without tag data never match any category.
    pub fn has_tag(&self, internal_name: &str) -> bool {
        self.tags
            .as_ref()
            .map(|tags| tags.iter().any(|t| t.internal_name == internal_name))
            .unwrap_or(false)
    }
}

/// A trade offer as seen by the bot
#[derive(Debug, Clone)]
pub struct Offer {
    pub id: OfferId,
    pub partner: SteamId,
    pub direction: OfferDirection,
    pub state: OfferState,
    /// Items leaving our inventory
    pub items_to_give: Vec<InventoryItem>,
    /// Items entering our inventory
    pub items_to_receive: Vec<InventoryItem>,
    pub message: Option<String>,
}

/// Opaque offer polling state owned by the session provider.
///
/// Stored and handed back verbatim; nothing in the bot looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollCursor(pub serde_json::Value);

/// Parsed chat request for crates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateRequest {
    pub series: String,
    pub quantity: u32,
}

/// Friend relationship as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    None,
    Blocked,
    RequestRecipient,
    Friend,
    RequestInitiator,
    Ignored,
    IgnoredFriend,
}

impl Relationship {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Relationship::Blocked,
            2 => Relationship::RequestRecipient,
            3 => Relationship::Friend,
            4 => Relationship::RequestInitiator,
            5 => Relationship::Ignored,
            6 => Relationship::IgnoredFriend,
            _ => Relationship::None,
        }
    }
}
