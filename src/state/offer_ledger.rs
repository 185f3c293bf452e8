use std::collections::HashMap;
use tracing::{debug, warn};

use crate::types::{OfferId, OfferState};

/// Outcome of recording an offer state notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First time we see this state for the offer; act on it
    New,
    /// Already recorded; re-delivered notification, log only
    Duplicate,
    /// Offer is already terminal or further along; the notification is stale
    Stale { current: OfferState },
}

/// Last known state of every offer seen during this run.
///
/// Entries are never removed; terminal states stay around so late or
/// repeated notifications can be recognised.
#[derive(Debug, Default)]
pub struct OfferLedger {
    states: HashMap<OfferId, OfferState>,
}

impl OfferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `state` for `id` before acting on it.
    ///
    /// Offers only move forward: a state behind the recorded one, or any
    /// move out of a terminal state, is reported as stale and not recorded.
    pub fn record(&mut self, id: &OfferId, state: OfferState) -> Transition {
        match self.states.get(id).copied() {
            Some(current) if current == state => {
                debug!("Offer {} already recorded as {}", id, state);
                Transition::Duplicate
            }
            Some(current) if current.is_terminal() || stage(state) < stage(current) => {
                warn!("Offer {} is already {}, ignoring move to {}", id, current, state);
                Transition::Stale { current }
            }
            _ => {
                self.states.insert(id.clone(), state);
                Transition::New
            }
        }
    }

    pub fn state_of(&self, id: &OfferId) -> Option<OfferState> {
        self.states.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Position of a state in the offer lifecycle.
///
/// Our own offers wait in `EmailPending` before becoming `Created`, and
/// `InEscrow` is only reached from `Created`.
fn stage(state: OfferState) -> u8 {
    match state {
        OfferState::EmailPending => 0,
        OfferState::Created | OfferState::Unknown => 1,
        OfferState::InEscrow => 2,
        _ => 3,
    }
}
