pub mod bus;
pub mod codec;
pub mod tcp;
pub mod traits;

pub use bus::{BusClient, BusTransport};
pub use tcp::TcpTransport;
pub use traits::{FeedbackSink, SendError, TransportAdapter, TransportEvent};
