use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::provider::{AccountLimitations, DraftOffer, SessionEvent};
use crate::types::{
    InventoryItem, Offer, OfferDirection, OfferId, OfferState, PollCursor, Relationship, SteamId,
};

/// Chat entry type for a regular, complete message
const CHAT_ENTRY_MESSAGE: u8 = 1;

/// Frame received from the session bridge
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeFrame {
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Set on replies to our requests
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request sent to the session bridge
#[derive(Debug, Clone, Serialize)]
pub struct RequestFrame<'a> {
    #[serde(rename = "type")]
    pub msg_type: &'a str,
    pub id: Uuid,
    pub data: Value,
}

/// Parse frame data (handles double-JSON encoding)
pub fn parse_message_data<T: for<'de> Deserialize<'de>>(data: &Value) -> Result<T, serde_json::Error> {
    // Some bridges send the payload as a JSON string instead of an object
    if let Some(string_data) = data.as_str() {
        serde_json::from_str(string_data)
    } else {
        T::deserialize(data)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WireOffer {
    id: String,
    partner: SteamId,
    #[serde(default)]
    is_our_offer: bool,
    state: u8,
    #[serde(default)]
    items_to_give: Vec<InventoryItem>,
    #[serde(default)]
    items_to_receive: Vec<InventoryItem>,
    #[serde(default)]
    message: Option<String>,
}

impl From<WireOffer> for Offer {
    fn from(wire: WireOffer) -> Self {
        let direction = if wire.is_our_offer {
            OfferDirection::Outbound
        } else {
            OfferDirection::Inbound
        };
        Offer {
            id: OfferId(wire.id),
            partner: wire.partner,
            direction,
            state: OfferState::from_code(wire.state, direction),
            items_to_give: wire.items_to_give,
            items_to_receive: wire.items_to_receive,
            message: wire.message.filter(|m| !m.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OfferChangedData {
    offer: WireOffer,
    old_state: u8,
}

#[derive(Debug, Deserialize)]
struct LoggedOnData {
    steam_id: SteamId,
}

#[derive(Debug, Deserialize)]
struct ReasonData {
    #[serde(alias = "message", default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct LimitationsData {
    #[serde(default)]
    limited: bool,
    #[serde(default)]
    community_banned: bool,
    #[serde(default)]
    locked: bool,
    #[serde(default = "default_true")]
    can_invite_friends: bool,
}

#[derive(Debug, Deserialize)]
struct RelationshipData {
    steam_id: SteamId,
    relationship: u8,
}

#[derive(Debug, Deserialize)]
struct NewItemsData {
    count: u32,
}

#[derive(Debug, Deserialize)]
struct EmailData {
    address: String,
    #[serde(default)]
    validated: bool,
}

#[derive(Debug, Deserialize)]
struct WalletData {
    has_wallet: bool,
    #[serde(default)]
    balance: String,
}

#[derive(Debug, Deserialize)]
struct ChatData {
    sender: SteamId,
    text: String,
    #[serde(default = "default_chat_entry")]
    entry_type: u8,
}

#[derive(Debug, Deserialize)]
struct SubmitReply {
    offer_id: String,
    #[serde(default)]
    status: String,
}

fn default_true() -> bool {
    true
}

fn default_chat_entry() -> u8 {
    CHAT_ENTRY_MESSAGE
}

/// Turn a bridge notification into a session event.
///
/// Returns `Ok(None)` for frames the bot does not act on, such as typing
/// notifications or unknown types.
pub fn decode_event(frame: &BridgeFrame) -> Result<Option<SessionEvent>, serde_json::Error> {
    let event = match frame.msg_type.as_str() {
        "loggedOn" => {
            let data: LoggedOnData = parse_message_data(&frame.data)?;
            SessionEvent::LoggedOn { steam_id: data.steam_id }
        }
        "error" => {
            let data: ReasonData = parse_message_data(&frame.data)?;
            SessionEvent::LogOnFailed { reason: data.reason }
        }
        "webSession" => SessionEvent::WebSession,
        "webSessionFailed" => {
            let data: ReasonData = parse_message_data(&frame.data)?;
            SessionEvent::WebSessionFailed { reason: data.reason }
        }
        "accountLimitations" => {
            let data: LimitationsData = parse_message_data(&frame.data)?;
            SessionEvent::AccountLimitations(AccountLimitations {
                limited: data.limited,
                community_banned: data.community_banned,
                locked: data.locked,
                can_invite_friends: data.can_invite_friends,
            })
        }
        "relationships" => {
            let data: Vec<RelationshipData> = parse_message_data(&frame.data)?;
            SessionEvent::FriendRelationships(
                data.into_iter()
                    .map(|r| (r.steam_id, Relationship::from_code(r.relationship)))
                    .collect(),
            )
        }
        "friend" => {
            let data: RelationshipData = parse_message_data(&frame.data)?;
            SessionEvent::FriendRelationshipChanged {
                steam_id: data.steam_id,
                relationship: Relationship::from_code(data.relationship),
            }
        }
        "newItems" => {
            let data: NewItemsData = parse_message_data(&frame.data)?;
            SessionEvent::NewItems { count: data.count }
        }
        "emailInfo" => {
            let data: EmailData = parse_message_data(&frame.data)?;
            SessionEvent::EmailInfo {
                address: data.address,
                validated: data.validated,
            }
        }
        "wallet" => {
            let data: WalletData = parse_message_data(&frame.data)?;
            SessionEvent::Wallet {
                has_wallet: data.has_wallet,
                balance: data.balance,
            }
        }
        "friendMsg" => {
            let data: ChatData = parse_message_data(&frame.data)?;
            if data.entry_type != CHAT_ENTRY_MESSAGE {
                return Ok(None);
            }
            SessionEvent::ChatMessage {
                sender: data.sender,
                text: data.text,
            }
        }
        "newOffer" => {
            let data: WireOffer = parse_message_data(&frame.data)?;
            SessionEvent::OfferCreated(data.into())
        }
        "receivedOfferChanged" | "sentOfferChanged" => {
            let data: OfferChangedData = parse_message_data(&frame.data)?;
            let offer: Offer = data.offer.into();
            let old_state = OfferState::from_code(data.old_state, offer.direction);
            SessionEvent::OfferStateChanged { offer, old_state }
        }
        "pollData" => SessionEvent::PollCursorUpdated(PollCursor(frame.data.clone())),
        "pollFailure" => {
            let data: ReasonData = parse_message_data(&frame.data)?;
            SessionEvent::PollFailed { reason: data.reason }
        }
        _ => return Ok(None),
    };

    Ok(Some(event))
}

/// Request payload for submitting a draft offer
pub fn submit_offer_payload(draft: &DraftOffer) -> Value {
    let items: Vec<Value> = draft
        .items_to_give
        .iter()
        .map(|item| {
            serde_json::json!({
                "appid": item.app_id,
                "contextid": item.context_id,
                "assetid": item.asset_id,
            })
        })
        .collect();

    serde_json::json!({
        "partner": draft.partner,
        "items_to_give": items,
        "message": draft.message,
    })
}

/// Read the bridge's reply to `sendOffer`.
///
/// Returns the new offer id and whether it still awaits confirmation.
pub fn parse_submit_reply(data: &Value) -> Result<(OfferId, bool), serde_json::Error> {
    let reply: SubmitReply = parse_message_data(data)?;
    Ok((OfferId(reply.offer_id), reply.status == "pending"))
}
