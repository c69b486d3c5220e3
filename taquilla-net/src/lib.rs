pub mod dispatcher;
pub mod transport;

pub use dispatcher::{CorrelatedResult, RequestDispatcher};
pub use transport::{SearchTransport, TcpTransport, TransportError};
