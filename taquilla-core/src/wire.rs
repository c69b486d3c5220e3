//! The JSON documents exchanged with the inventory server. One request and
//! one response per TCP connection; field names follow the server's schema.

use crate::seat::{SeatKey, WireSeatStatus};
use serde::{Deserialize, Serialize};

/// Request document. Covers all three shapes the client sends: an initial
/// seat search (`confirm_purchase = false`, no seats), a purchase
/// confirmation and a release (seats present, flag on or off).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "indice_categoria")]
    pub category_index: usize,
    #[serde(rename = "cantidad_boletos")]
    pub ticket_count: u32,
    #[serde(rename = "confirmar_compra")]
    pub confirm_purchase: bool,
    #[serde(rename = "asientos_recomendados")]
    pub selected_seats: Option<Vec<SeatKey>>,
}

impl SearchRequest {
    /// Initial seat search for a category and quantity.
    pub fn search(category_index: usize, ticket_count: u32) -> Self {
        Self {
            category_index,
            ticket_count,
            confirm_purchase: false,
            selected_seats: None,
        }
    }

    /// Purchase confirmation for the given seats.
    pub fn confirm(category_index: usize, seats: Vec<SeatKey>) -> Self {
        Self {
            category_index,
            ticket_count: seats.len() as u32,
            confirm_purchase: true,
            selected_seats: Some(seats),
        }
    }

    /// Release of a hold, handing the given seats back to the server.
    pub fn release(category_index: usize, seats: Vec<SeatKey>) -> Self {
        Self {
            category_index,
            ticket_count: seats.len() as u32,
            confirm_purchase: false,
            selected_seats: Some(seats),
        }
    }
}

/// One seat entry in `asientos_categoria`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSeat {
    #[serde(rename = "zona")]
    pub zone: String,
    #[serde(rename = "fila")]
    pub row: u32,
    #[serde(rename = "asiento")]
    pub number: u32,
    #[serde(rename = "estado")]
    pub status: WireSeatStatus,
}

impl WireSeat {
    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.zone.clone(), self.row, self.number)
    }
}

/// Response document, for searches as well as confirm/release replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "mensaje")]
    pub message: String,
    #[serde(rename = "asientos_categoria")]
    pub category_seats: Vec<WireSeat>,
    #[serde(rename = "asientos_recomendados")]
    pub recommended_seats: Vec<SeatKey>,
}
