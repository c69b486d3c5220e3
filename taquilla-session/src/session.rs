use crate::registry::{SeatRegistry, SelectionError};
use chrono::{DateTime, Utc};
use std::time::Duration;
use taquilla_core::{SearchRequest, SearchResponse, SeatKey, SeatStatus};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Confirming,
    Closed(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Purchased,
    Released,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no seats selected")]
    NoSeatsSelected,

    #[error("the reservation is no longer open")]
    NotOpen,

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// One reservation hold: the search result it came from, the seats the user
/// has marked and a fixed deadline. The session is a pure state machine —
/// timers and network calls belong to its owner.
///
/// `Open → Confirming → Closed(Purchased)` on an approved payment;
/// `Confirming → Open` when the payment is rejected or aborted;
/// `Open → Closed(Released)` on deadline expiry or an explicit cancel.
#[derive(Debug)]
pub struct ReservationSession {
    pub id: Uuid,
    category_index: usize,
    pub category: String,
    registry: SeatRegistry,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Monotonic counterpart of `expires_at`; fixed at creation, never
    /// renewed by user activity.
    pub deadline: Instant,
    state: SessionState,
}

impl ReservationSession {
    pub fn new(request: &SearchRequest, response: &SearchResponse, hold: Duration) -> Self {
        let created_at = Utc::now();
        let session = Self {
            id: Uuid::new_v4(),
            category_index: request.category_index,
            category: response.category.clone(),
            registry: SeatRegistry::load(response),
            created_at,
            expires_at: created_at + chrono::Duration::seconds(hold.as_secs() as i64),
            deadline: Instant::now() + hold,
            state: SessionState::Open,
        };
        tracing::debug!(
            session_id = %session.id,
            category = %session.category,
            seats = session.registry.len(),
            expires_at = %session.expires_at,
            "reservation session created"
        );
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registry(&self) -> &SeatRegistry {
        &self.registry
    }

    /// Flip a seat's selection. Only legal while the session is open.
    pub fn toggle(&mut self, key: &SeatKey) -> Result<SeatStatus, SessionError> {
        if self.state != SessionState::Open {
            return Err(SessionError::NotOpen);
        }
        Ok(self.registry.toggle(key)?)
    }

    /// Enter the payment exchange. Refused locally when nothing is selected,
    /// before any network traffic. Returns the selection set on success.
    pub fn begin_confirm(&mut self) -> Result<Vec<SeatKey>, SessionError> {
        if self.state != SessionState::Open {
            return Err(SessionError::NotOpen);
        }
        let seats = self.registry.selected();
        if seats.is_empty() {
            return Err(SessionError::NoSeatsSelected);
        }
        self.state = SessionState::Confirming;
        Ok(seats)
    }

    /// Settle a payment exchange begun with [`begin_confirm`]. Approval
    /// closes the session as purchased; anything else reopens it.
    ///
    /// [`begin_confirm`]: Self::begin_confirm
    pub fn payment_settled(&mut self, approved: bool) {
        if self.state != SessionState::Confirming {
            return;
        }
        self.state = if approved {
            SessionState::Closed(CloseReason::Purchased)
        } else {
            SessionState::Open
        };
    }

    /// Close the hold and hand back the release request for the current
    /// selection — exactly once. Returns `None` when the session is not
    /// open anymore, which is what makes a deadline firing and a user
    /// action mutually exclusive.
    pub fn close_released(&mut self) -> Option<SearchRequest> {
        if self.state != SessionState::Open {
            return None;
        }
        self.state = SessionState::Closed(CloseReason::Released);
        let seats = self.registry.selected();
        tracing::debug!(session_id = %self.id, seats = seats.len(), "session closed, releasing hold");
        Some(SearchRequest::release(self.category_index, seats))
    }

    /// The purchase-confirmation request for the current selection.
    pub fn purchase_request(&self) -> SearchRequest {
        SearchRequest::confirm(self.category_index, self.registry.selected())
    }
}
