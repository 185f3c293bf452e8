use anyhow::{Context, Result};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use parking_lot::Mutex as SyncMutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::messages::{
    decode_event, parse_message_data, parse_submit_reply, submit_offer_payload, BridgeFrame,
    RequestFrame,
};
use super::provider::{
    DraftOffer, LogOnDetails, SessionError, SessionEvent, SessionProvider, SubmitStatus,
};
use crate::types::{InventoryItem, OfferId, PollCursor, SteamId};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, Message>;
type Reply = std::result::Result<Value, SessionError>;
type PendingReplies = Arc<SyncMutex<HashMap<Uuid, oneshot::Sender<Reply>>>>;

/// Session provider backed by a websocket bridge.
///
/// The bridge is a sidecar process that owns the actual platform client
/// (log-on, cookies, offer polling). It pushes notifications as
/// `{"type", "data"}` frames and answers our requests with
/// `{"type": "response", "id", "data" | "error"}`.
#[derive(Clone)]
pub struct SessionBridge {
    write: Arc<Mutex<WsSink>>,
    pending: PendingReplies,
    request_timeout: Duration,
}

impl SessionBridge {
    pub async fn connect(
        url: &str,
        request_timeout: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>)> {
        info!("Connecting to session bridge: {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .context("Failed to connect to session bridge")?;

        info!("Session bridge connected");

        let (write, mut read) = ws_stream.split();
        let write = Arc::new(Mutex::new(write));
        let pending: PendingReplies = Arc::new(SyncMutex::new(HashMap::new()));
        let (tx, rx) = mpsc::unbounded_channel();

        let reader_pending = pending.clone();
        tokio::spawn(async move {
            let reason = loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = Self::handle_message(&text, &tx, &reader_pending) {
                            error!("Error handling session bridge message: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!("Session bridge closed the connection");
                        break frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by bridge".to_string());
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Pong is handled automatically by tungstenite
                        debug!("Received ping from session bridge");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Session bridge error: {}", e);
                        break e.to_string();
                    }
                    None => break "stream ended".to_string(),
                }
            };

            // Dropping the senders fails every outstanding request
            reader_pending.lock().clear();
            let _ = tx.send(SessionEvent::Disconnected { reason });
            info!("Session bridge connection closed");
        });

        Ok((
            Self {
                write,
                pending,
                request_timeout,
            },
            rx,
        ))
    }

    fn handle_message(
        text: &str,
        tx: &mpsc::UnboundedSender<SessionEvent>,
        pending: &PendingReplies,
    ) -> Result<()> {
        let frame: BridgeFrame = serde_json::from_str(text)
            .context("Failed to parse session bridge message")?;

        debug!("Received bridge message type: {}", frame.msg_type);

        if frame.msg_type == "response" {
            let id = frame.id.context("Response frame without request id")?;
            let reply = match frame.error {
                Some(message) => Err(SessionError::Rejected(message)),
                None => Ok(frame.data),
            };
            match pending.lock().remove(&id) {
                Some(waiter) => {
                    let _ = waiter.send(reply);
                }
                None => warn!("Reply for unknown or expired request {}", id),
            }
            return Ok(());
        }

        match decode_event(&frame).with_context(|| format!("Bad '{}' payload", frame.msg_type))? {
            Some(event) => {
                let _ = tx.send(event);
            }
            None => debug!("Ignoring bridge message type: {}", frame.msg_type),
        }

        Ok(())
    }

    async fn request(&self, msg_type: &str, data: Value) -> Reply {
        let id = Uuid::new_v4();
        let text = serde_json::to_string(&RequestFrame { msg_type, id, data })
            .map_err(|e| SessionError::Protocol(e.to_string()))?;

        let (waiter, reply) = oneshot::channel();
        self.pending.lock().insert(id, waiter);

        let sent = self.write.lock().await.send(Message::Text(text)).await;
        if let Err(e) = sent {
            self.pending.lock().remove(&id);
            return Err(SessionError::Transport(e.to_string()));
        }
        debug!("Sent {} request {}", msg_type, id);

        match tokio::time::timeout(self.request_timeout, reply).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(SessionError::Disconnected),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(SessionError::Timeout(self.request_timeout))
            }
        }
    }

    async fn request_ack(&self, msg_type: &str, data: Value) -> std::result::Result<(), SessionError> {
        self.request(msg_type, data).await.map(|_| ())
    }
}

fn protocol_error(e: serde_json::Error) -> SessionError {
    SessionError::Protocol(e.to_string())
}

impl SessionProvider for SessionBridge {
    async fn log_on(&self, details: &LogOnDetails) -> std::result::Result<(), SessionError> {
        self.request_ack(
            "logOn",
            json!({
                "account_name": details.account_name,
                "password": details.password,
                "domain": details.domain,
                "poll_interval_ms": details.poll_interval.as_millis() as u64,
                "cancel_time_ms": details.cancel_after.as_millis() as u64,
            }),
        )
        .await
    }

    async fn import_poll_cursor(&self, cursor: &PollCursor) -> std::result::Result<(), SessionError> {
        self.request_ack("setPollData", cursor.0.clone()).await
    }

    async fn accept_offer(&self, id: &OfferId) -> std::result::Result<(), SessionError> {
        self.request_ack("acceptOffer", json!({ "offer_id": id.0 })).await
    }

    async fn decline_offer(&self, id: &OfferId) -> std::result::Result<(), SessionError> {
        self.request_ack("declineOffer", json!({ "offer_id": id.0 })).await
    }

    async fn submit_offer(&self, draft: DraftOffer) -> std::result::Result<SubmitStatus, SessionError> {
        let data = self.request("sendOffer", submit_offer_payload(&draft)).await?;
        let (offer_id, pending) = parse_submit_reply(&data).map_err(protocol_error)?;
        Ok(if pending {
            SubmitStatus::Pending(offer_id)
        } else {
            SubmitStatus::Sent(offer_id)
        })
    }

    async fn load_inventory(
        &self,
        app_id: u32,
        context_id: u32,
    ) -> std::result::Result<Vec<InventoryItem>, SessionError> {
        let data = self
            .request(
                "loadInventory",
                json!({ "appid": app_id, "contextid": context_id, "tradable_only": true }),
            )
            .await?;
        parse_message_data(&data).map_err(protocol_error)
    }

    async fn received_items(&self, id: &OfferId) -> std::result::Result<Vec<InventoryItem>, SessionError> {
        let data = self
            .request("getReceivedItems", json!({ "offer_id": id.0 }))
            .await?;
        parse_message_data(&data).map_err(protocol_error)
    }

    async fn send_chat(&self, partner: SteamId, text: &str) -> std::result::Result<(), SessionError> {
        self.request_ack("sendMessage", json!({ "steam_id": partner, "text": text }))
            .await
    }

    async fn add_friend(&self, steam_id: SteamId) -> std::result::Result<(), SessionError> {
        self.request_ack("addFriend", json!({ "steam_id": steam_id })).await
    }
}
