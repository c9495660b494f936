//! Transport boundary between the core and the dispatcher link

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Events a transport delivers to the core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A dispatcher peer attached
    PeerConnected { peer: String },
    /// The dispatcher peer went away
    PeerDisconnected { reason: String },
    /// One raw transport order arrived
    OrderReceived(String),
}

/// Failure to push a feedback message to the dispatcher
#[derive(Error, Debug)]
pub enum SendError {
    #[error("no dispatcher attached")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feedback channel closed")]
    ChannelClosed,
}

/// Outbound half of a transport: best-effort push of status feedback
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Push one serialized feedback message to the attached dispatcher
    async fn send_feedback(&self, payload: String) -> Result<(), SendError>;

    /// Whether a dispatcher is currently attached to receive feedback
    fn is_ready(&self) -> bool;
}

/// A dispatcher link: a stream of inbound transport events plus a feedback
/// sink for the outbound direction. The core is written once against this
/// boundary; the socket and pub/sub variants both implement it.
#[async_trait]
pub trait TransportAdapter: Send {
    /// Receive the next transport event. `None` means the transport stopped.
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Cloneable handle for pushing status feedback to the dispatcher
    fn feedback_sink(&self) -> Arc<dyn FeedbackSink>;
}
