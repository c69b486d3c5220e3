use crate::config::Config;
use crate::events::UiEvent;
use crate::handle::EngineHandle;
use std::collections::HashMap;
use std::sync::Arc;
use taquilla_core::{SearchRequest, SearchResponse, SeatKey};
use taquilla_net::dispatcher::{CorrelatedResult, RequestDispatcher};
use taquilla_net::transport::{SearchTransport, TransportError};
use taquilla_session::payment::{PaymentContext, PaymentCredentials, PaymentGateway, PaymentOutcome};
use taquilla_session::session::{ReservationSession, SessionState};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_stream::StreamExt;
use uuid::Uuid;

/// Everything that reaches the engine's single consumer: user actions from
/// the handle plus the engine's own background I/O and timer completions.
pub(crate) enum Command {
    Search {
        category_index: usize,
        ticket_count: u32,
    },
    ToggleSeat(SeatKey),
    ConfirmPurchase {
        method: String,
        credentials: Option<PaymentCredentials>,
    },
    CancelPurchase,
    SearchSettled(CorrelatedResult),
    PurchaseReply {
        session_id: Uuid,
        outcome: Result<SearchResponse, TransportError>,
    },
    ReleaseReply {
        session_id: Uuid,
        outcome: Result<SearchResponse, TransportError>,
    },
    HoldExpired {
        session_id: Uuid,
    },
}

/// One logical search fanned out over the wire and not yet fully settled.
struct PendingSearch {
    outstanding: usize,
    satisfied: bool,
    last_error: Option<TransportError>,
}

/// The single consumer that owns all registry and session state. Background
/// tasks only ever talk to it through the mailbox, so no business state
/// needs a lock.
pub struct Engine {
    config: Config,
    transport: Arc<dyn SearchTransport>,
    dispatcher: RequestDispatcher,
    gateway: PaymentGateway,
    commands: mpsc::Receiver<Command>,
    loopback: mpsc::Sender<Command>,
    events: mpsc::Sender<UiEvent>,
    /// Correlation id -> logical search. Entries are consumed on delivery,
    /// so a correlation id is acted on at most once.
    correlations: HashMap<Uuid, Uuid>,
    searches: HashMap<Uuid, PendingSearch>,
    session: Option<ReservationSession>,
    hold_timer: Option<JoinHandle<()>>,
}

impl Engine {
    /// Start the consumer task. Returns the handle the presentation layer
    /// calls in, and the channel its callbacks arrive on.
    pub fn spawn(
        config: Config,
        transport: Arc<dyn SearchTransport>,
        gateway: PaymentGateway,
    ) -> (EngineHandle, mpsc::Receiver<UiEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (evt_tx, evt_rx) = mpsc::channel(64);
        let engine = Engine {
            config,
            dispatcher: RequestDispatcher::new(Arc::clone(&transport)),
            transport,
            gateway,
            commands: cmd_rx,
            loopback: cmd_tx.clone(),
            events: evt_tx,
            correlations: HashMap::new(),
            searches: HashMap::new(),
            session: None,
            hold_timer: None,
        };
        tokio::spawn(engine.run());
        (EngineHandle::new(cmd_tx), evt_rx)
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Search {
                category_index,
                ticket_count,
            } => self.start_search(category_index, ticket_count).await,
            Command::ToggleSeat(key) => self.toggle_seat(key).await,
            Command::ConfirmPurchase {
                method,
                credentials,
            } => self.confirm_purchase(method, credentials).await,
            Command::CancelPurchase => self.cancel_purchase().await,
            Command::SearchSettled(result) => self.on_search_settled(result).await,
            Command::PurchaseReply {
                session_id,
                outcome,
            } => self.on_purchase_reply(session_id, outcome).await,
            Command::ReleaseReply {
                session_id,
                outcome,
            } => self.on_release_reply(session_id, outcome).await,
            Command::HoldExpired { session_id } => self.on_hold_expired(session_id).await,
        }
    }

    async fn start_search(&mut self, category_index: usize, ticket_count: u32) {
        let max_tickets = self.config.business_rules.max_tickets;
        if ticket_count == 0 || ticket_count > max_tickets {
            self.emit(UiEvent::Notice(format!(
                "Ticket count must be between 1 and {max_tickets}."
            )))
            .await;
            return;
        }
        if category_index >= self.config.business_rules.categories.len() {
            self.emit(UiEvent::Notice("Unknown category.".to_string()))
                .await;
            return;
        }

        let search_id = Uuid::new_v4();
        let request = SearchRequest::search(category_index, ticket_count);
        let redundancy = self.config.business_rules.search_redundancy.max(1);
        let requests: Vec<(Uuid, SearchRequest)> = (0..redundancy)
            .map(|_| (Uuid::new_v4(), request.clone()))
            .collect();
        for (correlation_id, _) in &requests {
            self.correlations.insert(*correlation_id, search_id);
        }
        self.searches.insert(
            search_id,
            PendingSearch {
                outstanding: requests.len(),
                satisfied: false,
                last_error: None,
            },
        );
        tracing::info!(
            %search_id,
            category = %self.config.business_rules.categories[category_index],
            tickets = ticket_count,
            redundancy = requests.len(),
            "dispatching seat search"
        );

        let mut stream = self.dispatcher.dispatch(requests);
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                if loopback.send(Command::SearchSettled(result)).await.is_err() {
                    break;
                }
            }
        });
    }

    async fn on_search_settled(&mut self, result: CorrelatedResult) {
        let Some(search_id) = self.correlations.remove(&result.correlation_id) else {
            tracing::debug!(
                correlation_id = %result.correlation_id,
                "result for an already-consumed correlation id, ignoring"
            );
            return;
        };
        let Some(pending) = self.searches.get_mut(&search_id) else {
            return;
        };
        pending.outstanding -= 1;

        let mut fresh_response = None;
        match result.outcome {
            Ok(response) => {
                if pending.satisfied {
                    tracing::debug!(%search_id, "discarding redundant response for a satisfied search");
                } else {
                    pending.satisfied = true;
                    fresh_response = Some(response);
                }
            }
            Err(err) => {
                tracing::warn!(%search_id, error = %err, "search attempt failed");
                pending.last_error = Some(err);
            }
        }

        let exhausted = pending.outstanding == 0;
        let satisfied = pending.satisfied;
        if exhausted {
            let finished = self.searches.remove(&search_id);
            if !satisfied {
                let detail = finished
                    .and_then(|p| p.last_error)
                    .map(|e| connection_message(&e))
                    .unwrap_or_else(|| "no response from the server".to_string());
                self.emit(UiEvent::ConnectionError(detail)).await;
            }
        }

        if let Some(response) = fresh_response {
            self.open_session(result.request, response).await;
        }
    }

    async fn open_session(&mut self, request: SearchRequest, response: SearchResponse) {
        if response.category_seats.is_empty() {
            let message = if response.message.is_empty() {
                "No seats available in this category.".to_string()
            } else {
                response.message.clone()
            };
            self.emit(UiEvent::Notice(message)).await;
            return;
        }

        // A new result supersedes any hold still open from a prior search.
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.state() == SessionState::Open)
        {
            self.release_current("Previous reservation released.").await;
        }

        let hold = Duration::from_secs(self.config.business_rules.hold_seconds);
        let session = ReservationSession::new(&request, &response, hold);
        tracing::info!(
            session_id = %session.id,
            category = %session.category,
            expires_at = %session.expires_at,
            "reservation hold opened"
        );
        self.arm_hold_timer(session.id, session.deadline);
        let expires_at = session.expires_at;
        self.session = Some(session);
        self.emit(UiEvent::SearchResult {
            response,
            expires_at,
        })
        .await;
    }

    async fn toggle_seat(&mut self, key: SeatKey) {
        let Some(session) = self.session.as_mut() else {
            self.emit(UiEvent::Notice("No active reservation.".to_string()))
                .await;
            return;
        };
        match session.toggle(&key) {
            Ok(status) => self.emit(UiEvent::SeatToggled { key, status }).await,
            Err(err) => self.emit(UiEvent::Notice(err.to_string())).await,
        }
    }

    async fn confirm_purchase(
        &mut self,
        method: String,
        credentials: Option<PaymentCredentials>,
    ) {
        let Some(session) = self.session.as_mut() else {
            self.emit(UiEvent::Notice("No active reservation.".to_string()))
                .await;
            return;
        };
        let seats = match session.begin_confirm() {
            Ok(seats) => seats,
            Err(err) => {
                let message = err.to_string();
                self.emit(UiEvent::Notice(message)).await;
                return;
            }
        };
        let session_id = session.id;
        let deadline = session.deadline;
        let ctx = PaymentContext {
            category: session.category.clone(),
            seats,
            credentials,
        };
        // The payment exchange preempts the hold timer; it is re-armed
        // against the original deadline if the purchase does not go through.
        self.cancel_hold_timer();

        tracing::info!(%session_id, %method, "starting payment authorization");
        match self.gateway.authorize(&method, &ctx).await {
            Ok(PaymentOutcome::Approved) => {
                tracing::info!(%session_id, "payment approved, confirming purchase");
                let purchase = {
                    let Some(session) = self.session.as_mut().filter(|s| s.id == session_id)
                    else {
                        return;
                    };
                    session.payment_settled(true);
                    session.purchase_request()
                };
                self.send_in_background(purchase, move |outcome| Command::PurchaseReply {
                    session_id,
                    outcome,
                });
            }
            Ok(PaymentOutcome::Rejected) => {
                tracing::info!(%session_id, "payment declined");
                self.reopen_after_payment(session_id, deadline);
                self.emit(UiEvent::Notice("Payment declined.".to_string()))
                    .await;
            }
            Ok(PaymentOutcome::Aborted) => {
                // Backing out is not a declined attempt; no message.
                tracing::info!(%session_id, "payment aborted by the buyer");
                self.reopen_after_payment(session_id, deadline);
            }
            Err(err) => {
                tracing::error!(%session_id, error = %err, "payment authorization unavailable");
                self.reopen_after_payment(session_id, deadline);
                self.emit(UiEvent::Notice(
                    "Could not process the payment.".to_string(),
                ))
                .await;
            }
        }
    }

    /// Return a session to `Open` after a payment that did not go through,
    /// re-arming the timer against the original deadline — the hold window
    /// never extends.
    fn reopen_after_payment(&mut self, session_id: Uuid, deadline: Instant) {
        let reopened = match self.session.as_mut().filter(|s| s.id == session_id) {
            Some(session) => {
                session.payment_settled(false);
                true
            }
            None => false,
        };
        if reopened {
            self.arm_hold_timer(session_id, deadline);
        }
    }

    async fn cancel_purchase(&mut self) {
        match self.session.as_ref().map(|s| s.state()) {
            Some(SessionState::Open) => {
                self.release_current("Purchase canceled. Seats have been released.")
                    .await;
            }
            Some(SessionState::Confirming) => {
                self.emit(UiEvent::Notice("A payment is in progress.".to_string()))
                    .await;
            }
            _ => {
                self.emit(UiEvent::Notice("No active reservation.".to_string()))
                    .await;
            }
        }
    }

    async fn on_hold_expired(&mut self, session_id: Uuid) {
        let live = self
            .session
            .as_ref()
            .is_some_and(|s| s.id == session_id && s.state() == SessionState::Open);
        if !live {
            tracing::debug!(%session_id, "stale hold-expiry tick ignored");
            return;
        }
        tracing::info!(%session_id, "reservation hold expired");
        self.release_current("Reservation time expired. Seats have been released.")
            .await;
    }

    /// Close the current session as released and push the release request
    /// out in the background. No-op unless the session is open.
    async fn release_current(&mut self, message: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(release) = session.close_released() else {
            return;
        };
        let session_id = session.id;
        self.cancel_hold_timer();
        tracing::info!(
            %session_id,
            seats = release.selected_seats.as_deref().map_or(0, |s| s.len()),
            "sending release request"
        );
        self.send_in_background(release, move |outcome| Command::ReleaseReply {
            session_id,
            outcome,
        });
        self.emit(UiEvent::PurchaseOutcome {
            message: message.to_string(),
            closed: true,
        })
        .await;
    }

    async fn on_purchase_reply(
        &mut self,
        session_id: Uuid,
        outcome: Result<SearchResponse, TransportError>,
    ) {
        if self.session.as_ref().map(|s| s.id) != Some(session_id) {
            tracing::debug!(%session_id, "purchase reply for a superseded session, ignoring");
            return;
        }
        match outcome {
            Ok(response) => {
                tracing::info!(%session_id, "purchase confirmed by the server");
                self.session = None;
                self.emit(UiEvent::PurchaseOutcome {
                    message: response.message,
                    closed: true,
                })
                .await;
            }
            Err(err) => {
                // The session stays closed as purchased; only the ack is
                // missing. Let the user see what happened.
                tracing::error!(%session_id, error = %err, "purchase confirmation not delivered");
                self.emit(UiEvent::ConnectionError(connection_message(&err)))
                    .await;
            }
        }
    }

    async fn on_release_reply(
        &mut self,
        session_id: Uuid,
        outcome: Result<SearchResponse, TransportError>,
    ) {
        match outcome {
            Ok(response) => {
                tracing::info!(%session_id, "release acknowledged by the server");
                if self.session.as_ref().map(|s| s.id) == Some(session_id) {
                    self.session = None;
                }
                if !response.message.is_empty() {
                    self.emit(UiEvent::Notice(response.message)).await;
                }
            }
            Err(err) => {
                tracing::error!(%session_id, error = %err, "release request not delivered");
                self.emit(UiEvent::ConnectionError(connection_message(&err)))
                    .await;
            }
        }
    }

    fn arm_hold_timer(&mut self, session_id: Uuid, deadline: Instant) {
        self.cancel_hold_timer();
        let loopback = self.loopback.clone();
        self.hold_timer = Some(tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = loopback.send(Command::HoldExpired { session_id }).await;
        }));
    }

    fn cancel_hold_timer(&mut self) {
        if let Some(timer) = self.hold_timer.take() {
            timer.abort();
        }
    }

    fn send_in_background<F>(&self, request: SearchRequest, wrap: F)
    where
        F: FnOnce(Result<SearchResponse, TransportError>) -> Command + Send + 'static,
    {
        let transport = Arc::clone(&self.transport);
        let loopback = self.loopback.clone();
        tokio::spawn(async move {
            let outcome = transport.send(&request).await;
            let _ = loopback.send(wrap(outcome)).await;
        });
    }

    async fn emit(&self, event: UiEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("presentation side hung up, dropping event");
        }
    }
}

fn connection_message(err: &TransportError) -> String {
    if err.is_connection() {
        format!("Connection error: {err}")
    } else {
        "Could not process the server response.".to_string()
    }
}
