//! TCP request/response transport: one dispatcher peer at a time
//!
//! The simulator speaks to its dispatcher over a plain server socket: bind,
//! accept one peer, exchange newline-delimited JSON, and on any read failure
//! drop the peer and go back to accepting. Transport failures never reach
//! the core; the event stream just reports the peer coming and going.

use crate::transport::codec::{self, LineDecoder};
use crate::transport::traits::{FeedbackSink, SendError, TransportAdapter, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

/// Shared outbound half of the TCP transport
#[derive(Clone)]
pub struct TcpFeedbackSink {
    writer: Arc<Mutex<Option<WriteHalf<TcpStream>>>>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl FeedbackSink for TcpFeedbackSink {
    async fn send_feedback(&self, payload: String) -> Result<(), SendError> {
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or(SendError::NotConnected)?;
        stream.write_all(&codec::encode(&payload)).await?;
        stream.flush().await?;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Dispatcher-facing TCP server transport
pub struct TcpTransport {
    local_addr: SocketAddr,
    event_rx: mpsc::Receiver<TransportEvent>,
    sink: TcpFeedbackSink,
}

impl TcpTransport {
    /// Bind the listener and start the accept loop
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("server opened on {}", local_addr);

        let (event_tx, event_rx) = mpsc::channel(100);
        let sink = TcpFeedbackSink {
            writer: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
        };

        let sink_clone = sink.clone();
        tokio::spawn(async move {
            accept_loop(listener, sink_clone, event_tx).await;
        });

        Ok(Self {
            local_addr,
            event_rx,
            sink,
        })
    }

    /// Address the listener actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl TransportAdapter for TcpTransport {
    async fn recv(&mut self) -> Option<TransportEvent> {
        self.event_rx.recv().await
    }

    fn feedback_sink(&self) -> Arc<dyn FeedbackSink> {
        Arc::new(self.sink.clone())
    }
}

/// Accept dispatchers one at a time, forever. A dropped peer puts the
/// transport back into accepting; only the core going away ends the loop.
async fn accept_loop(
    listener: TcpListener,
    sink: TcpFeedbackSink,
    event_tx: mpsc::Sender<TransportEvent>,
) {
    loop {
        info!("waiting for dispatcher...");
        let (stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("accept failed: {}", e);
                break;
            }
        };
        info!("dispatcher {} connected", addr);

        let (mut reader, writer) = tokio::io::split(stream);
        *sink.writer.lock().await = Some(writer);
        sink.connected.store(true, Ordering::SeqCst);

        let connected = TransportEvent::PeerConnected {
            peer: addr.to_string(),
        };
        if event_tx.send(connected).await.is_err() {
            break;
        }

        let reason = read_orders(&mut reader, &event_tx).await;

        sink.connected.store(false, Ordering::SeqCst);
        if let Some(mut writer) = sink.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        if event_tx
            .send(TransportEvent::PeerDisconnected { reason })
            .await
            .is_err()
        {
            break;
        }
    }
}

/// Forward newline-delimited orders until the peer goes away; returns the
/// reason the connection ended.
async fn read_orders(
    reader: &mut ReadHalf<TcpStream>,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> String {
    let mut decoder = LineDecoder::new();
    let mut buf = vec![0u8; 4096];

    loop {
        // Drain complete frames before reading more
        loop {
            match decoder.decode_next() {
                Ok(Some(line)) => {
                    if event_tx
                        .send(TransportEvent::OrderReceived(line))
                        .await
                        .is_err()
                    {
                        return "core shut down".into();
                    }
                }
                Ok(None) => break,
                Err(e) => return format!("decode error: {}", e),
            }
        }

        match reader.read(&mut buf).await {
            Ok(0) => return "dispatcher disconnected".into(),
            Ok(n) => decoder.extend(&buf[..n]),
            Err(e) => return format!("read error: {}", e),
        }
    }
}
