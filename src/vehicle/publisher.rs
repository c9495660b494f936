//! Periodic status feedback task

use crate::protocol::StatusFeedback;
use crate::transport::FeedbackSink;
use crate::vehicle::DispatchController;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error};

/// Spawn the feedback ticker.
///
/// Every tick takes one consistent snapshot of the vehicle state and pushes
/// a STATUS_IND message to the sink; the first tick fires immediately.
/// Feedback is a live status poll, not a guaranteed-delivery channel: a tick
/// with no dispatcher attached is skipped, and a failed send is logged and
/// never retried.
pub fn spawn(
    controller: Arc<DispatchController>,
    sink: Arc<dyn FeedbackSink>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;

            if !sink.is_ready() {
                debug!("no dispatcher attached, skipping status feedback");
                continue;
            }

            let snapshot = controller.snapshot().await;
            let feedback = StatusFeedback::from_snapshot(&snapshot);
            let payload = match serde_json::to_string(&feedback) {
                Ok(json) => json,
                Err(e) => {
                    error!("failed to serialize status feedback: {}", e);
                    continue;
                }
            };

            if let Err(e) = sink.send_feedback(payload).await {
                error!("failed to send status feedback: {}", e);
            }
        }
    })
}
