use chrono::{DateTime, Utc};
use taquilla_core::{SearchResponse, SeatKey, SeatStatus};

/// Everything the engine reports back to the presentation layer. Events are
/// delivered on one channel, in the order the consumer produced them, so
/// the receiving side never needs its own locking.
#[derive(Debug)]
pub enum UiEvent {
    /// A search was satisfied and a reservation hold opened.
    SearchResult {
        response: SearchResponse,
        expires_at: DateTime<Utc>,
    },
    /// A seat changed between available and selected.
    SeatToggled { key: SeatKey, status: SeatStatus },
    /// The purchase flow finished; `closed` means the seat-selection screen
    /// is done and the session is gone.
    PurchaseOutcome { message: String, closed: bool },
    /// A socket or decoding failure. Never fatal; the session, if any,
    /// keeps its prior state.
    ConnectionError(String),
    /// Informational text: server messages, local validation refusals.
    Notice(String),
}
