use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::handlers::{
    classify_new_offer, classify_state_change, offer_handler, AdmissionPolicy, ChatCommand,
    CommandInterpreter, OfferDecision, OfferOutcome, OfferSubmission, TradeBuilder,
};
use crate::session::{AccountLimitations, SessionEvent, SessionProvider};
use crate::state::{OfferLedger, PollStore, Transition};
use crate::types::{CrateRequest, Offer, OfferState, Relationship, SteamId};
use crate::webhook;

/// Friend list size past which we start warning about the platform limit
const FRIEND_LIMIT_WARNING: usize = 200;

/// Conditions under which the bot cannot trade at all
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("log-on failed: {0}")]
    LogOnFailed(String),

    #[error("unable to set trade offer cookies: {0}")]
    WebSessionFailed(String),

    #[error("account is locked; cannot trade")]
    AccountLocked,

    #[error("session provider went away: {0}")]
    Disconnected(String),
}

/// Single event loop driving the bot.
///
/// Events are handled one at a time, each to completion, so the state held
/// here (offer ledger, friend count) needs no locking.
pub struct Dispatcher<S> {
    session: S,
    config: Arc<Config>,
    policy: AdmissionPolicy,
    interpreter: CommandInterpreter,
    builder: TradeBuilder,
    poll_store: PollStore,
    ledger: OfferLedger,
    friend_count: usize,
}

impl<S: SessionProvider> Dispatcher<S> {
    pub fn new(session: S, config: Arc<Config>, poll_store: PollStore) -> Result<Self, regex::Error> {
        let interpreter = CommandInterpreter::new(&config.command_trigger)?;
        let policy = AdmissionPolicy {
            admin: config.admin_id(),
            decline_message: config.messages.decline.clone(),
        };
        if policy.admin.is_none() {
            warn!("No valid admin SteamID64 configured; only free offers will be accepted");
        }

        Ok(Self {
            session,
            builder: TradeBuilder::new(config.clone()),
            config,
            policy,
            interpreter,
            poll_store,
            ledger: OfferLedger::new(),
            friend_count: 0,
        })
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn ledger(&self) -> &OfferLedger {
        &self.ledger
    }

    /// Process events until the provider hangs up or something fatal happens
    pub async fn run(&mut self, events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Result<(), FatalError> {
        while let Some(event) = events.recv().await {
            self.handle(event).await?;
        }
        warn!("Session event stream ended");
        Ok(())
    }

    pub async fn handle(&mut self, event: SessionEvent) -> Result<(), FatalError> {
        match event {
            SessionEvent::LoggedOn { steam_id } => {
                info!("Logged into Steam as {}", steam_id.steam3());
                if let Some(url) = self.config.active_webhook_url() {
                    let url = url.to_string();
                    let account = self.config.account_name.clone().unwrap_or_default();
                    let steam3 = steam_id.steam3();
                    tokio::spawn(async move {
                        webhook::send_webhook_logged_on(&account, &steam3, &url).await;
                    });
                }
            }
            SessionEvent::LogOnFailed { reason } => {
                error!("Log-on failed: {}", reason);
                return Err(FatalError::LogOnFailed(reason));
            }
            SessionEvent::WebSession => {
                debug!("Got web session, trade offer cookies set");
            }
            SessionEvent::WebSessionFailed { reason } => {
                error!("Unable to set trade offer cookies: {}", reason);
                return Err(FatalError::WebSessionFailed(reason));
            }
            SessionEvent::AccountLimitations(limits) => self.check_limitations(limits)?,
            SessionEvent::FriendRelationships(friends) => self.handle_friend_list(friends).await,
            SessionEvent::FriendRelationshipChanged { steam_id, relationship } => {
                self.handle_relationship(steam_id, relationship).await
            }
            SessionEvent::NewItems { count } => {
                info!("{} new items in our inventory", count);
            }
            SessionEvent::EmailInfo { address, validated } => {
                info!(
                    "Our email address is {} and it's {}",
                    address,
                    if validated { "validated" } else { "not validated" }
                );
            }
            SessionEvent::Wallet { has_wallet, balance } => {
                if has_wallet {
                    info!("We have {} Steam wallet credit remaining", balance);
                } else {
                    info!("We do not have a Steam wallet");
                }
            }
            SessionEvent::ChatMessage { sender, text } => self.handle_chat(sender, &text).await,
            SessionEvent::OfferCreated(offer) => self.handle_new_offer(offer).await,
            SessionEvent::OfferStateChanged { offer, old_state } => {
                self.handle_offer_change(offer, old_state).await
            }
            SessionEvent::PollCursorUpdated(cursor) => self.poll_store.save(&cursor).await,
            SessionEvent::PollFailed { reason } => {
                // The provider retries on its own schedule
                error!("Error polling for trade offers: {}", reason);
            }
            SessionEvent::Disconnected { reason } => {
                error!("Lost connection to the session provider: {}", reason);
                return Err(FatalError::Disconnected(reason));
            }
        }

        Ok(())
    }

    fn check_limitations(&self, limits: AccountLimitations) -> Result<(), FatalError> {
        if limits.limited {
            warn!("Our account is limited. We cannot send friend invites, use the market, open group chat, or access the web API");
        }
        if limits.community_banned {
            warn!("Our account is banned from Steam Community");
        }
        if limits.locked {
            error!("Our account is locked. We cannot trade/gift/purchase items, play on VAC servers, or access Steam Community. Shutting down");
            return Err(FatalError::AccountLocked);
        }
        if !limits.can_invite_friends {
            warn!("Our account is unable to send friend requests");
        }
        Ok(())
    }

    async fn handle_friend_list(&mut self, friends: Vec<(SteamId, Relationship)>) {
        self.friend_count = friends.len();

        for (steam_id, relationship) in friends {
            if relationship == Relationship::RequestRecipient {
                info!("Friend request while offline from: {}", steam_id.steam3());
                self.add_friend(steam_id).await;
            }
        }

        debug!("We have {} friends", self.friend_count);
        if self.friend_count > FRIEND_LIMIT_WARNING {
            warn!("We're approaching the default friends limit. Maybe we need to purge old friends?");
        }
    }

    async fn handle_relationship(&mut self, steam_id: SteamId, relationship: Relationship) {
        match relationship {
            Relationship::RequestRecipient => {
                info!("[{}] Accepted friend request", steam_id.steam3());
                if self.add_friend(steam_id).await {
                    self.friend_count += 1;
                }
            }
            Relationship::None => {
                info!("[{}] Un-friended", steam_id.steam3());
                self.friend_count = self.friend_count.saturating_sub(1);
            }
            other => debug!("[{}] Relationship is now {:?}", steam_id.steam3(), other),
        }
    }

    async fn add_friend(&self, steam_id: SteamId) -> bool {
        match self.session.add_friend(steam_id).await {
            Ok(()) => true,
            Err(e) => {
                error!("Unable to add friend {}: {}", steam_id.steam3(), e);
                false
            }
        }
    }

    async fn handle_chat(&self, sender: SteamId, text: &str) {
        debug!("[{}] MSG: {}", sender.steam3(), text);

        match self.interpreter.interpret(text) {
            ChatCommand::SendCrates(request) => self.send_crates(sender, &request).await,
            ChatCommand::Greet => {
                if let Err(e) = self.session.send_chat(sender, &self.config.greeting).await {
                    error!("Failed to greet {}: {}", sender.steam3(), e);
                }
            }
        }
    }

    async fn send_crates(&self, partner: SteamId, request: &CrateRequest) {
        info!(
            "{} requested {} crate(s) of series {}",
            partner.steam3(),
            request.quantity,
            request.series
        );

        let submission = self.builder.send_crates(&self.session, partner, request).await;

        if let (Some(OfferSubmission::Sent { offer_id }), Some(url)) =
            (submission, self.config.active_webhook_url())
        {
            let url = url.to_string();
            let partner = partner.steam3();
            let series = request.series.clone();
            let offer_url = self.config.offer_url(&offer_id.0);
            tokio::spawn(async move {
                webhook::send_webhook_crates_sent(&partner, &series, &offer_url, &url).await;
            });
        }
    }

    async fn handle_new_offer(&mut self, offer: Offer) {
        info!("New offer {} from {}", offer.id, offer.partner.steam3());

        if !self.admit_transition(&offer) {
            return;
        }

        let decision = classify_new_offer(&offer, &self.policy);
        self.apply(&offer, decision).await;
    }

    async fn handle_offer_change(&mut self, offer: Offer, old_state: OfferState) {
        info!(
            "{} Offer {} changed: {} -> {}",
            offer.partner.steam3(),
            offer.id,
            old_state,
            offer.state
        );

        if !self.admit_transition(&offer) {
            return;
        }

        let decision = classify_state_change(&offer, old_state);
        self.apply(&offer, decision).await;
    }

    /// Record the offer's state; false when the notification must not trigger
    /// side effects again
    fn admit_transition(&mut self, offer: &Offer) -> bool {
        match self.ledger.record(&offer.id, offer.state) {
            Transition::New => true,
            Transition::Duplicate => {
                info!("Offer {} is already {}, skipping repeated notification", offer.id, offer.state);
                false
            }
            Transition::Stale { .. } => false,
        }
    }

    async fn apply(&self, offer: &Offer, decision: OfferDecision) {
        if decision == OfferDecision::NoOp {
            return;
        }

        match offer_handler::execute(&self.session, offer, &decision).await {
            OfferOutcome::Received(names) => {
                if let Some(url) = self.config.active_webhook_url() {
                    let url = url.to_string();
                    let partner = offer.partner.steam3();
                    let offer_id = offer.id.0.clone();
                    tokio::spawn(async move {
                        webhook::send_webhook_offer_received(&partner, &offer_id, &names, &url).await;
                    });
                }
            }
            OfferOutcome::Failed(reason) => {
                // Not retried; the offer stays open until the partner acts or it expires
                warn!(
                    "Offer {} left as {} after failed {:?}: {}",
                    offer.id, offer.state, decision, reason
                );
            }
            OfferOutcome::Accepted | OfferOutcome::Declined | OfferOutcome::Confirmed => {
                debug!("Offer {} handled ({:?})", offer.id, decision);
            }
            OfferOutcome::Nothing => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{Call, RecordingSession};
    use crate::session::SessionError;
    use crate::types::{InventoryItem, ItemTag, OfferDirection, OfferId, PollCursor};
    use serde_json::json;

    const ADMIN: SteamId = SteamId(76561197960287930);
    const STRANGER: SteamId = SteamId(76561198000000001);

    struct Harness {
        dispatcher: Dispatcher<RecordingSession>,
        dir: tempfile::TempDir,
    }

    fn harness(session: RecordingSession) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            admin: Some(ADMIN.to_string()),
            ..Config::default()
        };
        let store = PollStore::new(dir.path().join("polldata.json"));
        Harness {
            dispatcher: Dispatcher::new(session, Arc::new(config), store).unwrap(),
            dir,
        }
    }

    fn crate_item(asset_id: &str) -> InventoryItem {
        InventoryItem {
            name: "Mann Co. Supply Crate Series #82".to_string(),
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

    fn inbound(id: &str, partner: SteamId, give: usize, state: OfferState) -> Offer {
        Offer {
            id: OfferId(id.to_string()),
            partner,
            direction: OfferDirection::Inbound,
            state,
            items_to_give: (0..give).map(|i| crate_item(&i.to_string())).collect(),
            items_to_receive: vec![crate_item("900")],
            message: None,
        }
    }

    fn accepts(session: &RecordingSession) -> usize {
        session.count(|c| matches!(c, Call::Accept(_)))
    }

    fn declines(session: &RecordingSession) -> usize {
        session.count(|c| matches!(c, Call::Decline(_)))
    }

    #[tokio::test]
    async fn test_redelivered_offer_is_handled_once() {
        let mut h = harness(RecordingSession::new());
        let offer = inbound("1", STRANGER, 0, OfferState::Created);

        h.dispatcher.handle(SessionEvent::OfferCreated(offer.clone())).await.unwrap();
        h.dispatcher.handle(SessionEvent::OfferCreated(offer)).await.unwrap();

        assert_eq!(accepts(h.dispatcher.session()), 1);
    }

    #[tokio::test]
    async fn test_declined_offer_notifies_once_even_if_redelivered() {
        let mut h = harness(RecordingSession::new());
        let offer = inbound("2", STRANGER, 1, OfferState::Created);

        h.dispatcher.handle(SessionEvent::OfferCreated(offer.clone())).await.unwrap();
        h.dispatcher.handle(SessionEvent::OfferCreated(offer)).await.unwrap();

        let session = h.dispatcher.session();
        assert_eq!(declines(session), 1);
        assert_eq!(session.chats().len(), 1);
    }

    #[tokio::test]
    async fn test_late_redelivery_after_escrow_is_not_accepted_again() {
        let mut h = harness(RecordingSession::new());
        let created = inbound("7", STRANGER, 0, OfferState::Created);
        let escrow = Offer { state: OfferState::InEscrow, ..created.clone() };

        h.dispatcher.handle(SessionEvent::OfferCreated(created.clone())).await.unwrap();
        h.dispatcher
            .handle(SessionEvent::OfferStateChanged { offer: escrow, old_state: OfferState::Created })
            .await
            .unwrap();
        h.dispatcher.handle(SessionEvent::OfferCreated(created)).await.unwrap();

        assert_eq!(accepts(h.dispatcher.session()), 1);
        assert_eq!(
            h.dispatcher.ledger().state_of(&OfferId("7".to_string())),
            Some(OfferState::InEscrow)
        );
    }

    #[tokio::test]
    async fn test_failed_accept_is_not_retried_on_redelivery() {
        let session = RecordingSession::new();
        *session.accept_result.lock() = Err(SessionError::Rejected("Not logged in".to_string()));
        let mut h = harness(session);
        let offer = inbound("8", STRANGER, 0, OfferState::Created);

        h.dispatcher.handle(SessionEvent::OfferCreated(offer.clone())).await.unwrap();
        h.dispatcher.handle(SessionEvent::OfferCreated(offer)).await.unwrap();

        assert_eq!(accepts(h.dispatcher.session()), 1);
    }

    #[tokio::test]
    async fn test_admin_offer_is_accepted() {
        let mut h = harness(RecordingSession::new());
        h.dispatcher
            .handle(SessionEvent::OfferCreated(inbound("3", ADMIN, 4, OfferState::Created)))
            .await
            .unwrap();

        assert_eq!(accepts(h.dispatcher.session()), 1);
        assert_eq!(declines(h.dispatcher.session()), 0);
    }

    #[tokio::test]
    async fn test_duplicate_state_change_fetches_items_once() {
        let mut h = harness(RecordingSession::new());
        let accepted = inbound("4", STRANGER, 0, OfferState::Accepted);

        for _ in 0..2 {
            h.dispatcher
                .handle(SessionEvent::OfferStateChanged {
                    offer: accepted.clone(),
                    old_state: OfferState::Created,
                })
                .await
                .unwrap();
        }

        assert_eq!(h.dispatcher.session().count(|c| matches!(c, Call::ReceivedItems(_))), 1);
        assert_eq!(h.dispatcher.ledger().state_of(&accepted.id), Some(OfferState::Accepted));
    }

    #[tokio::test]
    async fn test_terminal_offer_is_not_reopened() {
        let mut h = harness(RecordingSession::new());
        let declined = inbound("5", STRANGER, 1, OfferState::Declined);
        h.dispatcher
            .handle(SessionEvent::OfferStateChanged { offer: declined, old_state: OfferState::Created })
            .await
            .unwrap();

        // A late "new offer" for the same id must not trigger the admission policy
        h.dispatcher
            .handle(SessionEvent::OfferCreated(inbound("5", STRANGER, 1, OfferState::Created)))
            .await
            .unwrap();

        assert_eq!(declines(h.dispatcher.session()), 0);
        assert!(h.dispatcher.session().chats().is_empty());
    }

    #[tokio::test]
    async fn test_chat_command_sends_crates() {
        let session = RecordingSession::with_inventory(vec![crate_item("1"), crate_item("2")]);
        let mut h = harness(session);

        h.dispatcher
            .handle(SessionEvent::ChatMessage { sender: STRANGER, text: "!trade 82 1".to_string() })
            .await
            .unwrap();

        let session = h.dispatcher.session();
        assert_eq!(session.count(|c| matches!(c, Call::Submit(_))), 1);
        assert_eq!(session.chats().len(), 1);
    }

    #[tokio::test]
    async fn test_other_chat_gets_greeting() {
        let mut h = harness(RecordingSession::new());

        h.dispatcher
            .handle(SessionEvent::ChatMessage { sender: STRANGER, text: "hello".to_string() })
            .await
            .unwrap();

        let session = h.dispatcher.session();
        assert_eq!(session.chats(), vec![(STRANGER, Config::default().greeting)]);
        assert_eq!(session.count(|c| matches!(c, Call::LoadInventory(..))), 0);
    }

    #[tokio::test]
    async fn test_poll_cursor_is_persisted() {
        let mut h = harness(RecordingSession::new());
        let cursor = PollCursor(json!({"offersSince": 1700000000}));

        h.dispatcher.handle(SessionEvent::PollCursorUpdated(cursor.clone())).await.unwrap();

        let store = PollStore::new(h.dir.path().join("polldata.json"));
        assert_eq!(store.load().await, Some(cursor));
    }

    #[tokio::test]
    async fn test_poll_failure_is_not_fatal() {
        let mut h = harness(RecordingSession::new());
        assert!(h
            .dispatcher
            .handle(SessionEvent::PollFailed { reason: "HTTP error 503".to_string() })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_fatal_conditions() {
        let mut h = harness(RecordingSession::new());

        let locked = AccountLimitations { locked: true, can_invite_friends: true, ..Default::default() };
        assert!(matches!(
            h.dispatcher.handle(SessionEvent::AccountLimitations(locked)).await,
            Err(FatalError::AccountLocked)
        ));
        assert!(matches!(
            h.dispatcher.handle(SessionEvent::LogOnFailed { reason: "InvalidPassword".to_string() }).await,
            Err(FatalError::LogOnFailed(_))
        ));
        assert!(matches!(
            h.dispatcher.handle(SessionEvent::WebSessionFailed { reason: "HTTP 403".to_string() }).await,
            Err(FatalError::WebSessionFailed(_))
        ));

        let limited = AccountLimitations { limited: true, ..Default::default() };
        assert!(h.dispatcher.handle(SessionEvent::AccountLimitations(limited)).await.is_ok());
    }

    #[tokio::test]
    async fn test_pending_friend_requests_are_accepted() {
        let mut h = harness(RecordingSession::new());

        h.dispatcher
            .handle(SessionEvent::FriendRelationships(vec![
                (ADMIN, Relationship::Friend),
                (STRANGER, Relationship::RequestRecipient),
            ]))
            .await
            .unwrap();

        assert_eq!(h.dispatcher.session().calls(), vec![Call::AddFriend(STRANGER)]);
    }

    #[tokio::test]
    async fn test_run_stops_on_disconnect() {
        let mut h = harness(RecordingSession::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(SessionEvent::NewItems { count: 2 }).unwrap();
        tx.send(SessionEvent::Disconnected { reason: "stream ended".to_string() }).unwrap();

        let result = h.dispatcher.run(&mut rx).await;
        assert!(matches!(result, Err(FatalError::Disconnected(_))));
    }
}
