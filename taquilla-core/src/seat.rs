use serde::{Deserialize, Serialize};
use std::fmt;

/// Seat state as the inventory server reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireSeatStatus {
    #[serde(rename = "Disponible")]
    Available,
    #[serde(rename = "Reservada")]
    Held,
    #[serde(rename = "Comprada")]
    Sold,
}

/// Client-side seat state. `SelectedByUser` is a local overlay on top of the
/// last known server truth and never travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatStatus {
    Available,
    OnHoldByOther,
    Sold,
    SelectedByUser,
}

impl From<WireSeatStatus> for SeatStatus {
    fn from(status: WireSeatStatus) -> Self {
        match status {
            WireSeatStatus::Available => SeatStatus::Available,
            WireSeatStatus::Held => SeatStatus::OnHoldByOther,
            WireSeatStatus::Sold => SeatStatus::Sold,
        }
    }
}

/// Unique seat identity within the venue: zone, row, seat number.
///
/// Ordering is zone (lexicographic), then row, then number, so ordered
/// collections keyed by `SeatKey` come out in presentation order for free.
/// The wire shape is `{zona, fila, asiento}` with no status field, which is
/// exactly what outgoing purchase/release requests must contain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatKey {
    #[serde(rename = "zona")]
    pub zone: String,
    #[serde(rename = "fila")]
    pub row: u32,
    #[serde(rename = "asiento")]
    pub number: u32,
}

impl SeatKey {
    pub fn new(zone: impl Into<String>, row: u32, number: u32) -> Self {
        Self {
            zone: zone.into(),
            row,
            number,
        }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {} seat {}", self.zone, self.row, self.number)
    }
}

/// A seat together with its client-side status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub key: SeatKey,
    pub status: SeatStatus,
}
