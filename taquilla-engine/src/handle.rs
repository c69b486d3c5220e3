use crate::engine::Command;
use taquilla_core::SeatKey;
use taquilla_session::payment::PaymentCredentials;
use tokio::sync::mpsc;

/// Cloneable front door to the engine. Safe to call from any task or
/// thread: every call is marshaled onto the engine's mailbox and handled
/// by its single consumer.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    pub async fn request_search(&self, category_index: usize, ticket_count: u32) {
        self.send(Command::Search {
            category_index,
            ticket_count,
        })
        .await;
    }

    pub async fn toggle_seat(&self, key: SeatKey) {
        self.send(Command::ToggleSeat(key)).await;
    }

    /// `credentials: None` models the buyer dismissing the payment form,
    /// which aborts the exchange without counting as a declined attempt.
    pub async fn confirm_purchase(
        &self,
        method: impl Into<String>,
        credentials: Option<PaymentCredentials>,
    ) {
        self.send(Command::ConfirmPurchase {
            method: method.into(),
            credentials,
        })
        .await;
    }

    pub async fn cancel_purchase(&self) {
        self.send(Command::CancelPurchase).await;
    }

    async fn send(&self, command: Command) {
        if self.tx.send(command).await.is_err() {
            tracing::warn!("engine is gone, dropping command");
        }
    }
}
