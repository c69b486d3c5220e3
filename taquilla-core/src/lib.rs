pub mod seat;
pub mod wire;

pub use seat::{Seat, SeatKey, SeatStatus, WireSeatStatus};
pub use wire::{SearchRequest, SearchResponse, WireSeat};
