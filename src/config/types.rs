use serde::{Deserialize, Serialize};

use crate::types::SteamId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account_name: Option<String>,

    /// Never written back to disk when the loader saves the config
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// SteamID64 of the bot administrator
    #[serde(default)]
    pub admin: Option<String>,

    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Domain registered for the web API key
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Base URL used when linking to trade offers
    #[serde(default = "default_community_url")]
    pub community_url: String,

    /// Websocket endpoint of the session bridge
    #[serde(default = "default_session_url")]
    pub session_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Outgoing offers older than this are canceled by the session provider
    #[serde(default = "default_cancel_after_secs")]
    pub cancel_after_secs: u64,

    #[serde(default = "default_poll_data_path")]
    pub poll_data_path: String,

    #[serde(default = "default_command_trigger")]
    pub command_trigger: String,

    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub inventory: InventoryConfig,

    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    #[serde(default = "default_app_id")]
    pub app_id: u32,

    #[serde(default = "default_context_id")]
    pub context_id: u32,

    #[serde(default = "default_category_tag")]
    pub category_tag: String,
}

/// Chat texts sent to trade partners.
///
/// Templates may reference `{series}`, `{count}`, `{url}` and `{reason}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_decline_message")]
    pub decline: String,

    #[serde(default = "default_no_stock_message")]
    pub no_stock: String,

    #[serde(default = "default_partial_stock_message")]
    pub partial_stock: String,

    #[serde(default = "default_offer_note")]
    pub offer_note: String,

    #[serde(default = "default_sent_message")]
    pub sent: String,

    #[serde(default = "default_pending_message")]
    pub pending: String,

    #[serde(default = "default_failed_message")]
    pub failed: String,

    #[serde(default = "default_inventory_failed_message")]
    pub inventory_failed: String,
}

// Default values
fn default_greeting() -> String {
    "Hi! Type \"!trade <series> <amount>\" to get free crates, e.g. \"!trade 82 3\".".to_string()
}

fn default_domain() -> String {
    "localhost".to_string()
}

fn default_community_url() -> String {
    "https://steamcommunity.com".to_string()
}

fn default_session_url() -> String {
    "ws://127.0.0.1:8765".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_cancel_after_secs() -> u64 {
    300
}

fn default_poll_data_path() -> String {
    "polldata.json".to_string()
}

fn default_command_trigger() -> String {
    "!trade".to_string()
}

fn default_app_id() -> u32 {
    440 // Team Fortress 2
}

fn default_context_id() -> u32 {
    2
}

fn default_category_tag() -> String {
    "Supply Crate".to_string()
}

fn default_decline_message() -> String {
    "Invalid offer.  Please use the chat interface to request items.  Trade offers sent to me must only include items you're giving to me.".to_string()
}

fn default_no_stock_message() -> String {
    "I don't have any crates of series {series} available.  Sorry!".to_string()
}

fn default_partial_stock_message() -> String {
    "I only have {count} crates of series {series} available.  Sending a trade offer with all crates of this series.".to_string()
}

fn default_offer_note() -> String {
    "Here are the free crates you requested!  <3".to_string()
}

fn default_sent_message() -> String {
    "Trade offer sent successfully.  You can find the offer here: {url}".to_string()
}

fn default_pending_message() -> String {
    "Awaiting email confirmation".to_string()
}

fn default_failed_message() -> String {
    "Something went wrong when trying to send the trade offer. Steam message: {reason}".to_string()
}

fn default_inventory_failed_message() -> String {
    "I couldn't load my inventory right now, please try again later. Steam message: {reason}".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_name: None,
            password: None,
            admin: None,
            greeting: default_greeting(),
            domain: default_domain(),
            community_url: default_community_url(),
            session_url: default_session_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            cancel_after_secs: default_cancel_after_secs(),
            poll_data_path: default_poll_data_path(),
            command_trigger: default_command_trigger(),
            webhook_url: Some(String::new()),
            inventory: InventoryConfig::default(),
            messages: MessagesConfig::default(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            context_id: default_context_id(),
            category_tag: default_category_tag(),
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            decline: default_decline_message(),
            no_stock: default_no_stock_message(),
            partial_stock: default_partial_stock_message(),
            offer_note: default_offer_note(),
            sent: default_sent_message(),
            pending: default_pending_message(),
            failed: default_failed_message(),
            inventory_failed: default_inventory_failed_message(),
        }
    }
}

impl Config {
    /// Returns the webhook URL only if it is non-empty.
    pub fn active_webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|u| !u.is_empty())
    }

    /// Parsed administrator identity, if one is configured and valid
    pub fn admin_id(&self) -> Option<SteamId> {
        self.admin
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .and_then(|a| SteamId::try_from(a.to_string()).ok())
    }

    /// Link to an offer on the community site
    pub fn offer_url(&self, offer_id: &str) -> String {
        format!("{}/tradeoffer/{}", self.community_url.trim_end_matches('/'), offer_id)
    }
}
