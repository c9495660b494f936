//! In-process publish/subscribe transport
//!
//! Broker-style variant of the dispatcher link: orders published to the
//! order topic arrive at the core as [`TransportEvent::OrderReceived`], and
//! status feedback fans out to every feedback subscriber. Peers attach by
//! subscribing rather than connecting, so this variant has no
//! connect/disconnect events. Also serves as the harness transport for
//! end-to-end tests.

use crate::transport::traits::{FeedbackSink, SendError, TransportAdapter, TransportEvent};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

const ORDER_TOPIC_CAPACITY: usize = 100;
const FEEDBACK_TOPIC_CAPACITY: usize = 16;

/// Outbound half of the bus: publishes feedback to all subscribers
#[derive(Clone)]
pub struct BusFeedbackSink {
    feedback_tx: broadcast::Sender<String>,
}

#[async_trait]
impl FeedbackSink for BusFeedbackSink {
    async fn send_feedback(&self, payload: String) -> Result<(), SendError> {
        self.feedback_tx
            .send(payload)
            .map_err(|_| SendError::ChannelClosed)?;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.feedback_tx.receiver_count() > 0
    }
}

/// Core-side end of the bus
pub struct BusTransport {
    event_rx: mpsc::Receiver<TransportEvent>,
    sink: BusFeedbackSink,
}

/// Dispatcher-side handle: publishes orders, subscribes to feedback
#[derive(Clone)]
pub struct BusClient {
    order_tx: mpsc::Sender<TransportEvent>,
    feedback_tx: broadcast::Sender<String>,
}

impl BusTransport {
    /// Open the bus, returning the core-side transport and the
    /// dispatcher-side client handle
    pub fn open() -> (Self, BusClient) {
        let (order_tx, event_rx) = mpsc::channel(ORDER_TOPIC_CAPACITY);
        let (feedback_tx, _) = broadcast::channel(FEEDBACK_TOPIC_CAPACITY);

        let transport = Self {
            event_rx,
            sink: BusFeedbackSink {
                feedback_tx: feedback_tx.clone(),
            },
        };
        let client = BusClient {
            order_tx,
            feedback_tx,
        };
        (transport, client)
    }
}

#[async_trait]
impl TransportAdapter for BusTransport {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.event_rx.recv().await
    }

    fn feedback_sink(&self) -> Arc<dyn FeedbackSink> {
        Arc::new(self.sink.clone())
    }
}

impl BusClient {
    /// Publish one raw transport order to the order topic
    pub async fn publish_order(&self, raw: impl Into<String>) -> Result<(), SendError> {
        self.order_tx
            .send(TransportEvent::OrderReceived(raw.into()))
            .await
            .map_err(|_| SendError::ChannelClosed)
    }

    /// Subscribe to the feedback topic
    pub fn subscribe_feedback(&self) -> broadcast::Receiver<String> {
        self.feedback_tx.subscribe()
    }
}
