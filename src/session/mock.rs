//! In-memory session provider that records every call

use parking_lot::Mutex;

use super::provider::{DraftOffer, LogOnDetails, SessionError, SessionProvider, SubmitStatus};
use crate::types::{InventoryItem, OfferId, PollCursor, SteamId};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    LogOn(String),
    ImportPollCursor(PollCursor),
    Accept(OfferId),
    Decline(OfferId),
    Submit(DraftOffer),
    LoadInventory(u32, u32),
    ReceivedItems(OfferId),
    Chat(SteamId, String),
    AddFriend(SteamId),
}

pub struct RecordingSession {
    calls: Mutex<Vec<Call>>,
    pub inventory: Mutex<Result<Vec<InventoryItem>, SessionError>>,
    pub submit_result: Mutex<Result<SubmitStatus, SessionError>>,
    pub accept_result: Mutex<Result<(), SessionError>>,
    pub decline_result: Mutex<Result<(), SessionError>>,
    pub received: Mutex<Result<Vec<InventoryItem>, SessionError>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            inventory: Mutex::new(Ok(Vec::new())),
            submit_result: Mutex::new(Ok(SubmitStatus::Sent(OfferId("1000".to_string())))),
            accept_result: Mutex::new(Ok(())),
            decline_result: Mutex::new(Ok(())),
            received: Mutex::new(Ok(Vec::new())),
        }
    }

    pub fn with_inventory(items: Vec<InventoryItem>) -> Self {
        let session = Self::new();
        *session.inventory.lock() = Ok(items);
        session
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Chat messages sent so far, in order
    pub fn chats(&self) -> Vec<(SteamId, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Chat(to, text) => Some((*to, text.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl SessionProvider for RecordingSession {
    async fn log_on(&self, details: &LogOnDetails) -> Result<(), SessionError> {
        self.record(Call::LogOn(details.account_name.clone()));
        Ok(())
    }

    async fn import_poll_cursor(&self, cursor: &PollCursor) -> Result<(), SessionError> {
        self.record(Call::ImportPollCursor(cursor.clone()));
        Ok(())
    }

    async fn accept_offer(&self, id: &OfferId) -> Result<(), SessionError> {
        self.record(Call::Accept(id.clone()));
        self.accept_result.lock().clone()
    }

    async fn decline_offer(&self, id: &OfferId) -> Result<(), SessionError> {
        self.record(Call::Decline(id.clone()));
        self.decline_result.lock().clone()
    }

    async fn submit_offer(&self, draft: DraftOffer) -> Result<SubmitStatus, SessionError> {
        self.record(Call::Submit(draft));
        self.submit_result.lock().clone()
    }

    async fn load_inventory(
        &self,
        app_id: u32,
        context_id: u32,
    ) -> Result<Vec<InventoryItem>, SessionError> {
        self.record(Call::LoadInventory(app_id, context_id));
        self.inventory.lock().clone()
    }

    async fn received_items(&self, id: &OfferId) -> Result<Vec<InventoryItem>, SessionError> {
        self.record(Call::ReceivedItems(id.clone()));
        self.received.lock().clone()
    }

    async fn send_chat(&self, partner: SteamId, text: &str) -> Result<(), SessionError> {
        self.record(Call::Chat(partner, text.to_string()));
        Ok(())
    }

    async fn add_friend(&self, steam_id: SteamId) -> Result<(), SessionError> {
        self.record(Call::AddFriend(steam_id));
        Ok(())
    }
}
