use std::collections::BTreeMap;
use taquilla_core::{SearchResponse, Seat, SeatKey, SeatStatus};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("seat {0} is not part of the current search result")]
    UnknownSeat(SeatKey),

    #[error("seat {0} is held by another buyer")]
    HeldByOther(SeatKey),

    #[error("seat {0} is already sold")]
    Sold(SeatKey),
}

/// In-memory index of the active search result, keyed by seat identity.
/// A key appears at most once; iteration order is zone, row, seat number.
#[derive(Debug, Clone, Default)]
pub struct SeatRegistry {
    seats: BTreeMap<SeatKey, SeatStatus>,
}

/// One zone's seats grouped by row, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSeats {
    pub zone: String,
    pub rows: Vec<RowSeats>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSeats {
    pub row: u32,
    pub seats: Vec<Seat>,
}

impl SeatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a fresh search result, replacing anything held
    /// before. Seats the server recommends are forced to `SelectedByUser`,
    /// whatever status the wire reported for them.
    pub fn load(response: &SearchResponse) -> Self {
        let mut seats: BTreeMap<SeatKey, SeatStatus> = BTreeMap::new();
        for seat in &response.category_seats {
            seats.insert(seat.key(), SeatStatus::from(seat.status));
        }
        for key in &response.recommended_seats {
            seats.insert(key.clone(), SeatStatus::SelectedByUser);
        }
        Self { seats }
    }

    pub fn status(&self, key: &SeatKey) -> Option<SeatStatus> {
        self.seats.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Flip a seat between `Available` and `SelectedByUser`. Seats held by
    /// someone else or already sold reject the toggle.
    pub fn toggle(&mut self, key: &SeatKey) -> Result<SeatStatus, SelectionError> {
        let status = self
            .seats
            .get_mut(key)
            .ok_or_else(|| SelectionError::UnknownSeat(key.clone()))?;
        let next = match *status {
            SeatStatus::Available => SeatStatus::SelectedByUser,
            SeatStatus::SelectedByUser => SeatStatus::Available,
            SeatStatus::OnHoldByOther => return Err(SelectionError::HeldByOther(key.clone())),
            SeatStatus::Sold => return Err(SelectionError::Sold(key.clone())),
        };
        *status = next;
        Ok(next)
    }

    /// The seats currently marked by the user, in key order. Exactly this
    /// set goes into outgoing purchase and release requests.
    pub fn selected(&self) -> Vec<SeatKey> {
        self.seats
            .iter()
            .filter(|(_, status)| **status == SeatStatus::SelectedByUser)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Deterministic grouping for rendering: zones lexicographically, rows
    /// numerically within a zone, seats numerically within a row.
    pub fn seats_by_zone_then_row(&self) -> Vec<ZoneSeats> {
        let mut zones: Vec<ZoneSeats> = Vec::new();
        for (key, status) in &self.seats {
            let seat = Seat {
                key: key.clone(),
                status: *status,
            };
            match zones.last_mut() {
                Some(zone) if zone.zone == key.zone => match zone.rows.last_mut() {
                    Some(row) if row.row == key.row => row.seats.push(seat),
                    _ => zone.rows.push(RowSeats {
                        row: key.row,
                        seats: vec![seat],
                    }),
                },
                _ => zones.push(ZoneSeats {
                    zone: key.zone.clone(),
                    rows: vec![RowSeats {
                        row: key.row,
                        seats: vec![seat],
                    }],
                }),
            }
        }
        zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taquilla_core::{WireSeat, WireSeatStatus};

    fn wire_seat(zone: &str, row: u32, number: u32, status: WireSeatStatus) -> WireSeat {
        WireSeat {
            zone: zone.to_string(),
            row,
            number,
            status,
        }
    }

    fn platea_este_response() -> SearchResponse {
        // Scenario from the wire contract: five seats in one category, two
        // of them recommended by the server.
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
            recommended_seats: vec![
                SeatKey::new("Zona A", 1, 2),
                SeatKey::new("Zona A", 1, 3),
            ],
        }
    }

    #[test]
    fn recommended_seats_are_selected_and_the_rest_keep_wire_status() {
        let registry = SeatRegistry::load(&platea_este_response());
        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.status(&SeatKey::new("Zona A", 1, 2)),
            Some(SeatStatus::SelectedByUser)
        );
        assert_eq!(
            registry.status(&SeatKey::new("Zona A", 1, 3)),
            Some(SeatStatus::SelectedByUser)
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
    }

    #[test]
    fn recommendation_overrides_reported_status() {
        let mut response = platea_este_response();
        // Server reports the recommended seat as held; the overlay wins.
        response.category_seats[1].status = WireSeatStatus::Held;
        let registry = SeatRegistry::load(&response);
        assert_eq!(
            registry.status(&SeatKey::new("Zona A", 1, 2)),
            Some(SeatStatus::SelectedByUser)
        );
    }

    #[test]
    fn toggle_alternates_between_available_and_selected() {
        let mut registry = SeatRegistry::load(&platea_este_response());
        let key = SeatKey::new("Zona A", 2, 11);
        for _ in 0..3 {
            assert_eq!(registry.toggle(&key), Ok(SeatStatus::SelectedByUser));
            assert_eq!(registry.toggle(&key), Ok(SeatStatus::Available));
        }
    }

    #[test]
    fn sold_and_held_seats_reject_toggles() {
        let mut registry = SeatRegistry::load(&platea_este_response());
        let sold = SeatKey::new("Zona A", 1, 1);
        let held = SeatKey::new("Zona A", 1, 4);
        assert_eq!(registry.toggle(&sold), Err(SelectionError::Sold(sold.clone())));
        assert_eq!(
            registry.toggle(&held),
            Err(SelectionError::HeldByOther(held.clone()))
        );
        // Statuses untouched.
        assert_eq!(registry.status(&sold), Some(SeatStatus::Sold));
        assert_eq!(registry.status(&held), Some(SeatStatus::OnHoldByOther));
    }

    #[test]
    fn unknown_seat_rejects_toggle() {
        let mut registry = SeatRegistry::load(&platea_este_response());
        let key = SeatKey::new("Zona Z", 9, 9);
        assert_eq!(
            registry.toggle(&key),
            Err(SelectionError::UnknownSeat(key))
        );
    }

    #[test]
    fn selected_returns_exactly_the_marked_seats_in_order() {
        let mut registry = SeatRegistry::load(&platea_este_response());
        registry.toggle(&SeatKey::new("Zona A", 2, 11)).unwrap();
        assert_eq!(
            registry.selected(),
            vec![
                SeatKey::new("Zona A", 1, 2),
                SeatKey::new("Zona A", 1, 3),
                SeatKey::new("Zona A", 2, 11),
            ]
        );
    }

    #[test]
    fn grouping_is_deterministic_and_ordered() {
        let response = SearchResponse {
            category: "General Norte".to_string(),
            message: String::new(),
            category_seats: vec![
                wire_seat("Zona B", 1, 1, WireSeatStatus::Available),
                wire_seat("Zona A", 2, 12, WireSeatStatus::Available),
                wire_seat("Zona A", 1, 5, WireSeatStatus::Available),
                wire_seat("Zona A", 1, 2, WireSeatStatus::Available),
            ],
            recommended_seats: vec![],
        };
        let registry = SeatRegistry::load(&response);
        let zones = registry.seats_by_zone_then_row();

        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].zone, "Zona A");
        assert_eq!(zones[1].zone, "Zona B");
        assert_eq!(zones[0].rows.len(), 2);
        assert_eq!(zones[0].rows[0].row, 1);
        let numbers: Vec<u32> = zones[0].rows[0]
            .seats
            .iter()
            .map(|s| s.key.number)
            .collect();
        assert_eq!(numbers, vec![2, 5]);
    }

    #[test]
    fn loading_replaces_the_registry_wholesale() {
        let first = SeatRegistry::load(&platea_este_response());
        assert_eq!(first.len(), 5);

        let response = SearchResponse {
            category: "Platea Oeste".to_string(),
            message: String::new(),
            category_seats: vec![wire_seat("Zona C", 1, 7, WireSeatStatus::Available)],
            recommended_seats: vec![],
        };
        let second = SeatRegistry::load(&response);
        assert_eq!(second.len(), 1);
        assert!(second.status(&SeatKey::new("Zona A", 1, 2)).is_none());
    }
}
