//! End-to-end flows over a real socket: the engine talks to an in-process
//! stub that speaks the inventory server's one-exchange JSON protocol.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taquilla_core::{SearchRequest, SearchResponse, SeatKey, SeatStatus, WireSeat, WireSeatStatus};
use taquilla_engine::config::{BusinessRules, Config, ServerConfig};
use taquilla_engine::{Engine, UiEvent};
use taquilla_net::transport::TcpTransport;
use taquilla_session::payment::{
    PaymentAuthorizer, PaymentContext, PaymentCredentials, PaymentError, PaymentGateway,
    PaymentOutcome,
};
use taquilla_session::registry::SeatRegistry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::Receiver;

/// Records every request it serves, both parsed and as raw bytes.
#[derive(Default)]
struct StubServer {
    requests: Mutex<Vec<(SearchRequest, String)>>,
}

impl StubServer {
    fn recorded(&self) -> Vec<(SearchRequest, String)> {
        self.requests.lock().unwrap().clone()
    }

    fn releases(&self) -> Vec<SearchRequest> {
        self.recorded()
            .into_iter()
            .map(|(request, _)| request)
            .filter(|r| r.selected_seats.is_some() && !r.confirm_purchase)
            .collect()
    }
}

fn wire_seat(zone: &str, row: u32, number: u32, status: WireSeatStatus) -> WireSeat {
    WireSeat {
        zone: zone.to_string(),
        row,
        number,
        status,
    }
}

/// Five seats in "Platea Este", two recommended — the canonical search
/// result the stub hands out.
fn stub_search_response() -> SearchResponse {
    SearchResponse {
        category: "Platea Este".to_string(),
        message: String::new(),
        category_seats: vec![
            wire_seat("Zona A", 1, 1, WireSeatStatus::Sold),
            wire_seat("Zona A", 1, 2, WireSeatStatus::Available),
            wire_seat("Zona A", 1, 3, WireSeatStatus::Available),
            wire_seat("Zona A", 1, 4, WireSeatStatus::Held),
            wire_seat("Zona A", 2, 11, WireSeatStatus::Available),
        ],
        recommended_seats: vec![SeatKey::new("Zona A", 1, 2), SeatKey::new("Zona A", 1, 3)],
    }
}

fn respond_to(request: &SearchRequest) -> SearchResponse {
    let mut response = stub_search_response();
    if request.confirm_purchase {
        response.message = "Compra realizada.".to_string();
    } else if request.selected_seats.is_some() {
        response.message = "Compra cancelada. Asientos liberados.".to_string();
    }
    response
}

async fn spawn_stub(state: Arc<StubServer>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                let mut raw = Vec::new();
                if socket.read_to_end(&mut raw).await.is_err() {
                    return;
                }
                let Ok(request) = serde_json::from_slice::<SearchRequest>(&raw) else {
                    return;
                };
                let body = serde_json::to_vec(&respond_to(&request)).unwrap();
                state
                    .requests
                    .lock()
                    .unwrap()
                    .push((request, String::from_utf8_lossy(&raw).into_owned()));
                let _ = socket.write_all(&body).await;
            });
        }
    });
    addr
}

fn config_for(addr: SocketAddr, hold_seconds: u64) -> Config {
    Config {
        server: ServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
        },
        business_rules: BusinessRules {
            hold_seconds,
            ..BusinessRules::default()
        },
    }
}

struct ApprovingAuthorizer;

#[async_trait]
impl PaymentAuthorizer for ApprovingAuthorizer {
    fn method(&self) -> &'static str {
        "card"
    }

    async fn authorize(&self, ctx: &PaymentContext) -> Result<PaymentOutcome, PaymentError> {
        if ctx.credentials.is_none() {
            return Ok(PaymentOutcome::Aborted);
        }
        Ok(PaymentOutcome::Approved)
    }
}

fn approving_gateway() -> PaymentGateway {
    let mut gateway = PaymentGateway::new();
    gateway.register(Arc::new(ApprovingAuthorizer));
    gateway
}

async fn next_event(events: &mut Receiver<UiEvent>) -> UiEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for an engine event")
        .expect("engine event channel closed")
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn search_opens_a_hold_with_recommended_seats_selected() {
    let stub = Arc::new(StubServer::default());
    let addr = spawn_stub(Arc::clone(&stub)).await;
    let (handle, mut events) = Engine::spawn(
        config_for(addr, 120),
        Arc::new(TcpTransport::new(addr.to_string())),
        approving_gateway(),
    );

    handle.request_search(0, 2).await;

    let UiEvent::SearchResult { response, .. } = next_event(&mut events).await else {
        panic!("expected a search result first");
    };
    assert_eq!(response.category, "Platea Este");

    let registry = SeatRegistry::load(&response);
    assert_eq!(
        registry.selected(),
        vec![SeatKey::new("Zona A", 1, 2), SeatKey::new("Zona A", 1, 3)]
    );
    assert_eq!(
        registry.status(&SeatKey::new("Zona A", 1, 1)),
        Some(SeatStatus::Sold)
    );
    assert_eq!(
        registry.status(&SeatKey::new("Zona A", 1, 4)),
        Some(SeatStatus::OnHoldByOther)
    );
    assert_eq!(
        registry.status(&SeatKey::new("Zona A", 2, 11)),
        Some(SeatStatus::Available)
    );

    // All three redundant requests reach the server; only one result shows.
    wait_until(|| stub.recorded().len() == 3).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, UiEvent::SearchResult { .. }),
            "a single search must open a single hold"
        );
    }
}

#[tokio::test]
async fn approved_purchase_confirms_over_the_wire_without_status_fields() {
    let stub = Arc::new(StubServer::default());
    let addr = spawn_stub(Arc::clone(&stub)).await;
    let (handle, mut events) = Engine::spawn(
        config_for(addr, 120),
        Arc::new(TcpTransport::new(addr.to_string())),
        approving_gateway(),
    );

    handle.request_search(0, 2).await;
    assert!(matches!(
        next_event(&mut events).await,
        UiEvent::SearchResult { .. }
    ));

    handle
        .confirm_purchase(
            "card",
            Some(PaymentCredentials::Card {
                number: "4111111111111111".to_string(),
                expiry: "12/29".to_string(),
                cvv: "123".to_string(),
            }),
        )
        .await;

    let event = next_event(&mut events).await;
    let UiEvent::PurchaseOutcome { message, closed } = event else {
        panic!("expected a purchase outcome, got {event:?}");
    };
    assert_eq!(message, "Compra realizada.");
    assert!(closed);

    let confirm = stub
        .recorded()
        .into_iter()
        .find(|(request, _)| request.confirm_purchase)
        .expect("the confirm request must reach the server");
    assert_eq!(confirm.0.ticket_count, 2);
    assert_eq!(
        confirm.0.selected_seats.as_deref().unwrap(),
        &[SeatKey::new("Zona A", 1, 2), SeatKey::new("Zona A", 1, 3)]
    );
    assert!(
        !confirm.1.contains("estado"),
        "outgoing seats must not carry a status field: {}",
        confirm.1
    );
}

#[tokio::test]
async fn expired_hold_releases_the_selection_over_the_wire() {
    let stub = Arc::new(StubServer::default());
    let addr = spawn_stub(Arc::clone(&stub)).await;
    let (handle, mut events) = Engine::spawn(
        config_for(addr, 1),
        Arc::new(TcpTransport::new(addr.to_string())),
        approving_gateway(),
    );

    handle.request_search(0, 2).await;
    assert!(matches!(
        next_event(&mut events).await,
        UiEvent::SearchResult { .. }
    ));

    // No user action: the 1 s hold lapses on its own.
    let event = next_event(&mut events).await;
    let UiEvent::PurchaseOutcome { message, closed } = event else {
        panic!("expected the expiry outcome, got {event:?}");
    };
    assert!(message.contains("expired"), "got: {message}");
    assert!(closed);

    wait_until(|| !stub.releases().is_empty()).await;
    let releases = stub.releases();
    assert_eq!(releases.len(), 1, "the release fires exactly once");
    assert!(!releases[0].confirm_purchase);
    assert_eq!(
        releases[0].selected_seats.as_deref().unwrap(),
        &[SeatKey::new("Zona A", 1, 2), SeatKey::new("Zona A", 1, 3)]
    );
}

#[tokio::test]
async fn explicit_cancel_releases_and_preempts_the_deadline() {
    let stub = Arc::new(StubServer::default());
    let addr = spawn_stub(Arc::clone(&stub)).await;
    let (handle, mut events) = Engine::spawn(
        config_for(addr, 1),
        Arc::new(TcpTransport::new(addr.to_string())),
        approving_gateway(),
    );

    handle.request_search(0, 2).await;
    assert!(matches!(
        next_event(&mut events).await,
        UiEvent::SearchResult { .. }
    ));

    handle.cancel_purchase().await;
    let event = next_event(&mut events).await;
    assert!(matches!(
        event,
        UiEvent::PurchaseOutcome { closed: true, .. }
    ));

    // Give the 1 s deadline a chance to misfire; it must not.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        stub.releases().len(),
        1,
        "cancel and deadline must not both release"
    );
}
