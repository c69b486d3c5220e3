pub mod payment;
pub mod registry;
pub mod session;

pub use payment::{PaymentCredentials, PaymentGateway, PaymentOutcome};
pub use registry::{SeatRegistry, SelectionError};
pub use session::{CloseReason, ReservationSession, SessionError, SessionState};
