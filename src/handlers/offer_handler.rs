//! Offer classifier
//!
//! Decides what to do with trade offer notifications:
//! - New inbound offers go through the admission policy (accept or decline)
//! - Offers reaching `Accepted` are reported
//! - Everything else is only logged
//!
//! Classification is pure; `execute` performs the side effects against the
//! session provider.

use tracing::{debug, error, info};

use crate::session::SessionProvider;
use crate::types::{Offer, OfferDirection, OfferState, SteamId};
use crate::utils::join_names;

/// Rules for automatically accepting inbound offers
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    /// Offers from this account are always accepted
    pub admin: Option<SteamId>,
    /// Sent to partners whose offer was declined
    pub decline_message: String,
}

impl AdmissionPolicy {
    /// An offer is admitted when it comes from the admin or costs us nothing
    pub fn admits(&self, offer: &Offer) -> bool {
        self.admin == Some(offer.partner) || offer.items_to_give.is_empty()
    }
}

/// What to do about an offer notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferDecision {
    Accept,
    /// Decline and tell the partner why
    Decline { reason: String },
    /// An inbound offer went through; look up what we got
    NotifyReceived,
    /// One of our offers went through
    NotifyAccepted,
    NoOp,
}

/// What actually happened when a decision was carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferOutcome {
    Accepted,
    Declined,
    /// Names of the items received, empty when the lookup failed
    Received(Vec<String>),
    Confirmed,
    Failed(String),
    Nothing,
}

/// Classify an offer the provider just told us about
pub fn classify_new_offer(offer: &Offer, policy: &AdmissionPolicy) -> OfferDecision {
    if offer.direction != OfferDirection::Inbound || offer.state != OfferState::Created {
        return OfferDecision::NoOp;
    }

    if policy.admits(offer) {
        OfferDecision::Accept
    } else {
        OfferDecision::Decline {
            reason: policy.decline_message.clone(),
        }
    }
}

/// Classify a state change on an offer we already know about
pub fn classify_state_change(offer: &Offer, old_state: OfferState) -> OfferDecision {
    if offer.state == old_state || offer.state != OfferState::Accepted {
        return OfferDecision::NoOp;
    }

    match offer.direction {
        OfferDirection::Inbound => OfferDecision::NotifyReceived,
        OfferDirection::Outbound => OfferDecision::NotifyAccepted,
    }
}

/// Carry out a decision. Failures are logged, never retried.
pub async fn execute<S: SessionProvider>(
    session: &S,
    offer: &Offer,
    decision: &OfferDecision,
) -> OfferOutcome {
    let partner = offer.partner.steam3();

    match decision {
        OfferDecision::Accept => {
            info!("User {} offered a valid trade. Trying to accept offer {}", partner, offer.id);
            match session.accept_offer(&offer.id).await {
                Ok(()) => {
                    info!("Offer {} accepted", offer.id);
                    OfferOutcome::Accepted
                }
                Err(e) => {
                    error!("Unable to accept offer {}: {}", offer.id, e);
                    OfferOutcome::Failed(e.to_string())
                }
            }
        }
        OfferDecision::Decline { reason } => {
            info!("User {} offered an invalid trade. Declining offer {}", partner, offer.id);
            match session.decline_offer(&offer.id).await {
                Ok(()) => {
                    debug!("Offer {} declined", offer.id);
                    if let Err(e) = session.send_chat(offer.partner, reason).await {
                        error!("Unable to tell {} why offer {} was declined: {}", partner, offer.id, e);
                    }
                    OfferOutcome::Declined
                }
                Err(e) => {
                    error!("Unable to decline offer {}: {}", offer.id, e);
                    OfferOutcome::Failed(e.to_string())
                }
            }
        }
        OfferDecision::NotifyReceived => match session.received_items(&offer.id).await {
            Ok(items) => {
                let names: Vec<String> = items.into_iter().map(|i| i.name).collect();
                info!("Received: {}", join_names(names.iter().map(String::as_str)));
                OfferOutcome::Received(names)
            }
            Err(e) => {
                error!("Couldn't get received items for offer {}: {}", offer.id, e);
                OfferOutcome::Received(Vec::new())
            }
        },
        OfferDecision::NotifyAccepted => {
            info!("Our sent offer {} has been accepted", offer.id);
            OfferOutcome::Confirmed
        }
        OfferDecision::NoOp => OfferOutcome::Nothing,
    }
}
