//! Outbound offer builder
//!
//! Turns a crate request into a trade offer:
//! - Loads a fresh inventory snapshot (no local reservations, the provider
//!   is the source of truth for what we still own)
//! - Selects crates of the requested series
//! - Creates, fills and submits the offer
//! - Tells the requester how it went
//!
//! Failed submissions are reported, not retried.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::inventory::{select, Selection};
use crate::session::{SessionProvider, SubmitStatus};
use crate::types::{CrateRequest, InventoryItem, OfferId, SteamId};
use crate::utils::fill_template;

/// How an offer submission ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferSubmission {
    Sent { offer_id: OfferId },
    /// Created, but waits for email/mobile confirmation before delivery
    PendingConfirmation { offer_id: OfferId },
    Failed { reason: String },
}

pub struct TradeBuilder {
    config: Arc<Config>,
}

impl TradeBuilder {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Create an offer giving `items` to `partner` and submit it
    pub async fn build<S: SessionProvider>(
        &self,
        session: &S,
        partner: SteamId,
        items: Vec<InventoryItem>,
    ) -> OfferSubmission {
        let mut draft = session.create_offer(partner);

        debug!("Adding {} items to offer for {}", items.len(), partner.steam3());
        draft.add_my_items(items);
        draft.set_message(self.config.messages.offer_note.clone());

        match session.submit_offer(draft).await {
            Ok(SubmitStatus::Sent(offer_id)) => {
                info!("Trade offer {} sent successfully", offer_id);
                OfferSubmission::Sent { offer_id }
            }
            Ok(SubmitStatus::Pending(offer_id)) => {
                warn!(
                    "Trade offer {} sent but awaiting email confirmation. You should probably turn off email confirmation in the account settings",
                    offer_id
                );
                OfferSubmission::PendingConfirmation { offer_id }
            }
            Err(e) => {
                error!("Failed to send trade offer to {}: {}", partner.steam3(), e);
                OfferSubmission::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Chat text telling the requester how the submission went
    pub fn submission_message(&self, submission: &OfferSubmission) -> String {
        let messages = &self.config.messages;
        match submission {
            OfferSubmission::Sent { offer_id } => {
                fill_template(&messages.sent, &[("url", self.config.offer_url(&offer_id.0).as_str())])
            }
            OfferSubmission::PendingConfirmation { .. } => messages.pending.clone(),
            OfferSubmission::Failed { reason } => {
                fill_template(&messages.failed, &[("reason", reason.as_str())])
            }
        }
    }

    /// Handle a chat request for crates end to end.
    ///
    /// Returns the submission result, or `None` when no offer was sent.
    pub async fn send_crates<S: SessionProvider>(
        &self,
        session: &S,
        partner: SteamId,
        request: &CrateRequest,
    ) -> Option<OfferSubmission> {
        let inventory_config = &self.config.inventory;
        let messages = &self.config.messages;
        let series = request.series.as_str();

        let inventory = match session
            .load_inventory(inventory_config.app_id, inventory_config.context_id)
            .await
        {
            Ok(inventory) => inventory,
            Err(e) => {
                error!("Failed to load inventory: {}", e);
                let reason = e.to_string();
                self.tell(session, partner, fill_template(&messages.inventory_failed, &[("reason", reason.as_str())]))
                    .await;
                return None;
            }
        };

        let items = match select(&inventory, &inventory_config.category_tag, series, request.quantity) {
            Selection::NoMatchingItems => {
                info!("No crates of series {} available for {}", series, partner.steam3());
                self.tell(session, partner, fill_template(&messages.no_stock, &[("series", series)]))
                    .await;
                return None;
            }
            Selection::Partial { items, requested } => {
                debug!(
                    "User requested {} of series {}. Only {} available",
                    requested,
                    series,
                    items.len()
                );
                let count = items.len().to_string();
                self.tell(
                    session,
                    partner,
                    fill_template(&messages.partial_stock, &[("count", count.as_str()), ("series", series)]),
                )
                .await;
                items
            }
            Selection::Complete(items) => items,
        };

        let submission = self.build(session, partner, items).await;
        self.tell(session, partner, self.submission_message(&submission)).await;
        Some(submission)
    }

    async fn tell<S: SessionProvider>(&self, session: &S, partner: SteamId, text: String) {
        if let Err(e) = session.send_chat(partner, &text).await {
            error!("Failed to message {}: {}", partner.steam3(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{Call, RecordingSession};
    use crate::session::SessionError;
    use crate::types::ItemTag;

    const PARTNER: SteamId = SteamId(76561198000000001);

    fn builder() -> TradeBuilder {
        TradeBuilder::new(Arc::new(Config::default()))
    }

    fn crate_item(asset_id: usize, series: &str) -> InventoryItem {
        InventoryItem {
            name: format!("Mann Co. Supply Crate Series #{}", series),
            asset_id: asset_id.to_string(),
            class_id: "1".to_string(),
            instance_id: "0".to_string(),
            app_id: 440,
            context_id: "2".to_string(),
            tags: Some(vec![ItemTag {
                internal_name: "Supply Crate".to_string(),
                name: "Crate".to_string(),
                category: "Type".to_string(),
            }]),
        }
    }

    fn request(series: &str, quantity: u32) -> CrateRequest {
        CrateRequest {
            series: series.to_string(),
            quantity,
        }
    }

    fn submitted(session: &RecordingSession) -> Vec<Vec<String>> {
        session
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Submit(draft) => Some(draft.items_to_give.into_iter().map(|i| i.asset_id).collect()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sent_offer_links_to_offer() {
        let session = RecordingSession::with_inventory((0..5).map(|i| crate_item(i, "82")).collect());
        *session.submit_result.lock() = Ok(SubmitStatus::Sent(OfferId("5150".to_string())));

        let result = builder().send_crates(&session, PARTNER, &request("82", 3)).await;

        assert_eq!(result, Some(OfferSubmission::Sent { offer_id: OfferId("5150".to_string()) }));
        assert_eq!(submitted(&session), vec![vec!["0", "1", "2"]]);
        let chats = session.chats();
        assert_eq!(chats.len(), 1);
        assert!(chats[0].1.contains("https://steamcommunity.com/tradeoffer/5150"));
    }

    #[tokio::test]
    async fn test_offer_carries_note_and_uses_configured_inventory() {
        let session = RecordingSession::with_inventory(vec![crate_item(1, "82")]);

        builder().send_crates(&session, PARTNER, &request("82", 1)).await;

        let calls = session.calls();
        assert_eq!(calls[0], Call::LoadInventory(440, 2));
        match &calls[1] {
            Call::Submit(draft) => {
                assert_eq!(draft.partner, PARTNER);
                assert_eq!(draft.message, "Here are the free crates you requested!  <3");
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_confirmation_message() {
        let session = RecordingSession::with_inventory(vec![crate_item(1, "82")]);
        *session.submit_result.lock() = Ok(SubmitStatus::Pending(OfferId("7".to_string())));

        let result = builder().send_crates(&session, PARTNER, &request("82", 1)).await;

        assert_eq!(result, Some(OfferSubmission::PendingConfirmation { offer_id: OfferId("7".to_string()) }));
        assert_eq!(session.chats(), vec![(PARTNER, "Awaiting email confirmation".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_submission_reports_reason_once() {
        let session = RecordingSession::with_inventory(vec![crate_item(1, "82")]);
        *session.submit_result.lock() = Err(SessionError::Rejected("There was an error sending your trade offer (26)".to_string()));

        let result = builder().send_crates(&session, PARTNER, &request("82", 1)).await;

        assert!(matches!(result, Some(OfferSubmission::Failed { .. })));
        assert_eq!(session.count(|c| matches!(c, Call::Submit(_))), 1);
        let chats = session.chats();
        assert_eq!(chats.len(), 1);
        assert!(chats[0].1.contains("There was an error sending your trade offer (26)"));
    }

    #[tokio::test]
    async fn test_partial_stock_sends_everything_and_says_so() {
        let session = RecordingSession::with_inventory((0..4).map(|i| crate_item(i, "82")).collect());

        builder().send_crates(&session, PARTNER, &request("82", 10)).await;

        assert_eq!(submitted(&session), vec![vec!["0", "1", "2", "3"]]);
        let chats = session.chats();
        assert_eq!(chats.len(), 2);
        assert!(chats[0].1.starts_with("I only have 4 crates of series 82"));
    }

    #[tokio::test]
    async fn test_no_stock_sends_nothing() {
        let session = RecordingSession::with_inventory(vec![crate_item(1, "820")]);

        let result = builder().send_crates(&session, PARTNER, &request("82", 2)).await;

        assert_eq!(result, None);
        assert_eq!(session.count(|c| matches!(c, Call::Submit(_))), 0);
        assert_eq!(
            session.chats(),
            vec![(PARTNER, "I don't have any crates of series 82 available.  Sorry!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_inventory_failure_is_reported() {
        let session = RecordingSession::new();
        *session.inventory.lock() = Err(SessionError::Rejected("This profile is private".to_string()));

        let result = builder().send_crates(&session, PARTNER, &request("82", 1)).await;

        assert_eq!(result, None);
        assert_eq!(session.count(|c| matches!(c, Call::Submit(_))), 0);
        assert!(session.chats()[0].1.contains("This profile is private"));
    }

    #[test]
    fn test_submission_messages_are_distinct() {
        let builder = builder();
        let sent = builder.submission_message(&OfferSubmission::Sent { offer_id: OfferId("1".to_string()) });
        let pending = builder.submission_message(&OfferSubmission::PendingConfirmation { offer_id: OfferId("1".to_string()) });
        let failed = builder.submission_message(&OfferSubmission::Failed { reason: "boom".to_string() });

        assert!(sent.contains("/tradeoffer/1"));
        assert_eq!(pending, "Awaiting email confirmation");
        assert!(failed.ends_with("boom"));
        assert_ne!(sent, pending);
        assert_ne!(pending, failed);
    }
}
