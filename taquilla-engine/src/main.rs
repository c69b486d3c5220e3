use std::sync::Arc;
use taquilla_core::{SeatKey, SeatStatus};
use taquilla_engine::{Config, Engine, UiEvent};
use taquilla_net::transport::TcpTransport;
use taquilla_session::payment::{PaymentCredentials, PaymentGateway};
use taquilla_session::registry::SeatRegistry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taquilla=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(server = %config.server.addr(), "starting taquilla client engine");

    let transport = Arc::new(TcpTransport::new(config.server.addr()));
    let gateway = PaymentGateway::with_default_methods();
    let categories = config.business_rules.categories.clone();
    let (handle, mut events) = Engine::spawn(config, transport, gateway);

    // The console is the presentation layer: it renders events from the
    // engine's single consumer and feeds user actions back in.
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                UiEvent::SearchResult {
                    response,
                    expires_at,
                } => {
                    println!("\nCategory: {}", response.category);
                    if !response.message.is_empty() {
                        println!("{}", response.message);
                    }
                    println!("Hold expires at {}", expires_at.format("%H:%M:%S"));
                    let registry = SeatRegistry::load(&response);
                    for zone in registry.seats_by_zone_then_row() {
                        println!("--- {} ---", zone.zone);
                        for row in zone.rows {
                            let seats: Vec<String> = row
                                .seats
                                .iter()
                                .map(|seat| {
                                    let marker = match seat.status {
                                        SeatStatus::Available => ' ',
                                        SeatStatus::SelectedByUser => '*',
                                        SeatStatus::OnHoldByOther => '#',
                                        SeatStatus::Sold => 'x',
                                    };
                                    format!("{}{}", seat.key.number, marker)
                                })
                                .collect();
                            println!("  row {}: {}", row.row, seats.join(" "));
                        }
                    }
                    print!("> ");
                }
                UiEvent::SeatToggled { key, status } => {
                    let verb = if status == SeatStatus::SelectedByUser {
                        "selected"
                    } else {
                        "deselected"
                    };
                    println!("{verb}: {key}");
                }
                UiEvent::PurchaseOutcome { message, closed } => {
                    println!("{message}");
                    if closed {
                        println!("(selection screen closed)");
                    }
                }
                UiEvent::ConnectionError(message) => println!("! {message}"),
                UiEvent::Notice(message) => println!("{message}"),
            }
        }
    });

    println!("Categories:");
    for (index, name) in categories.iter().enumerate() {
        println!("  {index}: {name}");
    }
    println!("Commands:");
    println!("  search <category> <tickets>");
    println!("  toggle <zone..> <row> <seat>");
    println!("  confirm card <number> <expiry> <cvv>");
    println!("  confirm paypal <email> <password>");
    println!("  confirm crypto <wallet>");
    println!("  confirm <method>          (dismisses the payment form)");
    println!("  cancel | quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["quit" | "exit"] => break,
            ["search", category, tickets] => {
                match (category.parse(), tickets.parse()) {
                    (Ok(category_index), Ok(ticket_count)) => {
                        handle.request_search(category_index, ticket_count).await;
                    }
                    _ => println!("usage: search <category> <tickets>"),
                }
            }
            ["toggle", rest @ ..] if rest.len() >= 3 => {
                let zone = rest[..rest.len() - 2].join(" ");
                match (rest[rest.len() - 2].parse(), rest[rest.len() - 1].parse()) {
                    (Ok(row), Ok(number)) => {
                        handle.toggle_seat(SeatKey::new(zone, row, number)).await;
                    }
                    _ => println!("usage: toggle <zone..> <row> <seat>"),
                }
            }
            ["confirm", method, rest @ ..] => {
                let credentials = parse_credentials(method, rest);
                handle.confirm_purchase(*method, credentials).await;
            }
            ["cancel"] => handle.cancel_purchase().await,
            _ => println!("unrecognized command: {line}"),
        }
    }

    Ok(())
}

/// Map form fields typed on the command line onto the method's credential
/// shape. Too few fields means the buyer backed out of the form.
fn parse_credentials(method: &str, fields: &[&str]) -> Option<PaymentCredentials> {
    match (method, fields) {
        ("card", [number, expiry, cvv]) => Some(PaymentCredentials::Card {
            number: number.to_string(),
            expiry: expiry.to_string(),
            cvv: cvv.to_string(),
        }),
        ("paypal", [email, password]) => Some(PaymentCredentials::PayPal {
            email: email.to_string(),
            password: password.to_string(),
        }),
        ("crypto", [wallet_address]) => Some(PaymentCredentials::Crypto {
            wallet_address: wallet_address.to_string(),
        }),
        _ => None,
    }
}
