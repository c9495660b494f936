//! Transport order intake and traversal supervision

use crate::protocol::{self, RejectReason};
use crate::vehicle::state::{VehicleSnapshot, VehicleState};
use crate::vehicle::traversal;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Outcome of submitting a raw transport order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Order accepted; `order_number` is its 1-based sequence number this run
    Accepted { order_number: u64 },
    /// Byte-identical to the previous accepted order; dropped without effect
    Duplicate,
    /// Order rejected; state unchanged
    Rejected(RejectReason),
}

/// Everything the three tasks touch, behind one lock.
///
/// The pending queue, completed log, position, dedup key and traversal handle
/// form a single critical section: the traversal task's poll-and-exit check
/// must never interleave with `submit`'s replace-and-maybe-spawn, or an
/// executor could observe an empty queue and exit just as a new order lands.
#[derive(Debug)]
pub(crate) struct CoreState {
    pub vehicle: VehicleState,
    pub last_accepted_order: Option<String>,
    pub order_count: u64,
    /// Handle of the running traversal task. `Some` while a traversal is
    /// active; the task takes it out itself when it drains the queue.
    pub traversal: Option<JoinHandle<()>>,
}

/// Accepts transport orders from the ingestion side and supervises the
/// traversal task. At most one traversal is live at any time.
pub struct DispatchController {
    core: Arc<Mutex<CoreState>>,
    travel_time: Duration,
}

impl DispatchController {
    pub fn new(initial_position: impl Into<String>, travel_time: Duration) -> Self {
        Self {
            core: Arc::new(Mutex::new(CoreState {
                vehicle: VehicleState::new(initial_position),
                last_accepted_order: None,
                order_count: 0,
                traversal: None,
            })),
            travel_time,
        }
    }

    /// Submit one raw transport order.
    ///
    /// An accepted order replaces the pending queue wholesale. A traversal
    /// that is still draining simply observes the new queue after its current
    /// leg (last write wins, never a merge); if none is running, one is
    /// started. Rejected and duplicate submissions leave all state untouched.
    pub async fn submit(&self, raw: &str) -> SubmitOutcome {
        let mut core = self.core.lock().await;

        if core.last_accepted_order.as_deref() == Some(raw) {
            info!("duplicated transport order, ignored");
            return SubmitOutcome::Duplicate;
        }

        let waypoints = match protocol::validate_order(raw) {
            Ok(waypoints) => waypoints,
            Err(reason) => {
                warn!(%reason, payload = raw, "transport order rejected");
                return SubmitOutcome::Rejected(reason);
            }
        };

        core.vehicle.pending = VecDeque::from(waypoints);
        core.last_accepted_order = Some(raw.to_string());
        core.order_count += 1;
        let order_number = core.order_count;
        info!(
            order = order_number,
            todo = ?core.vehicle.pending,
            "executing transport order"
        );

        if core.traversal.is_none() {
            core.traversal = Some(traversal::spawn(self.core.clone(), self.travel_time));
        }

        SubmitOutcome::Accepted { order_number }
    }

    /// Consistent snapshot of the vehicle state for status feedback
    pub async fn snapshot(&self) -> VehicleSnapshot {
        self.core.lock().await.vehicle.snapshot()
    }

    /// Number of orders accepted this run
    pub async fn order_count(&self) -> u64 {
        self.core.lock().await.order_count
    }

    /// Whether a traversal task is currently draining the queue
    pub async fn traversal_active(&self) -> bool {
        self.core.lock().await.traversal.is_some()
    }

    /// Stop the in-flight traversal, if any.
    ///
    /// The task is cancelled at its sleep point: the leg being travelled is
    /// not completed and the position stays where it was. Waypoints already
    /// completed are preserved.
    pub async fn shutdown(&self) {
        let handle = self.core.lock().await.traversal.take();
        if let Some(handle) = handle {
            handle.abort();
            // Cancellation surfaces as a JoinError; expected here.
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    const TRAVEL: Duration = Duration::from_secs(5);

    fn runline(points: &[&str]) -> String {
        let points: Vec<String> = points.iter().map(|id| format!("{{\"id\":\"{}\"}}", id)).collect();
        format!("{{\"cmd\":\"runline\",\"points\":[{}]}}", points.join(","))
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_order_is_dropped() {
        let controller = DispatchController::new("0", TRAVEL);
        let raw = runline(&["A", "B"]);

        assert_eq!(
            controller.submit(&raw).await,
            SubmitOutcome::Accepted { order_number: 1 }
        );
        let after_first = controller.snapshot().await;

        assert_eq!(controller.submit(&raw).await, SubmitOutcome::Duplicate);
        assert_eq!(controller.snapshot().await, after_first);
        assert_eq!(controller.order_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_only_against_immediately_preceding_order() {
        let controller = DispatchController::new("0", TRAVEL);
        let first = runline(&["A"]);
        let second = runline(&["B"]);

        assert!(matches!(
            controller.submit(&first).await,
            SubmitOutcome::Accepted { .. }
        ));
        assert!(matches!(
            controller.submit(&second).await,
            SubmitOutcome::Accepted { .. }
        ));
        // Same bytes as the first order, but no longer the last accepted one
        assert_eq!(
            controller.submit(&first).await,
            SubmitOutcome::Accepted { order_number: 3 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_order_leaves_state_untouched() {
        let controller = DispatchController::new("0", TRAVEL);
        controller.submit(&runline(&["A", "B"])).await;
        let before = controller.snapshot().await;

        let invalid = r#"{"cmd":"runline","points":[{"id":"A"},{}]}"#;
        assert_eq!(
            controller.submit(invalid).await,
            SubmitOutcome::Rejected(RejectReason::InvalidPoint(1))
        );
        assert_eq!(controller.snapshot().await, before);
        assert_eq!(controller.order_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_update_dedup_key() {
        let controller = DispatchController::new("0", TRAVEL);
        let invalid = r#"{"cmd":"stop"}"#;

        // A rejected order is never recorded, so resubmitting it is another
        // rejection, not a duplicate.
        assert!(matches!(
            controller.submit(invalid).await,
            SubmitOutcome::Rejected(RejectReason::UnsupportedCommand(_))
        ));
        assert!(matches!(
            controller.submit(invalid).await,
            SubmitOutcome::Rejected(RejectReason::UnsupportedCommand(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_points_rejected_without_starting_traversal() {
        let controller = DispatchController::new("0", TRAVEL);

        assert_eq!(
            controller.submit(r#"{"cmd":"runline","points":[]}"#).await,
            SubmitOutcome::Rejected(RejectReason::MissingOrEmptyPoints)
        );
        assert_eq!(
            controller.submit(r#"{"cmd":"runline"}"#).await,
            SubmitOutcome::Rejected(RejectReason::MissingOrEmptyPoints)
        );

        assert!(!controller.traversal_active().await);
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.position, "0");
        assert!(snapshot.pending.is_empty());
        assert!(snapshot.completed.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_drain_in_order() {
        let controller = DispatchController::new("0", TRAVEL);
        controller.submit(&runline(&["P1", "P2", "P3"])).await;

        // Three legs of five seconds each
        sleep(Duration::from_secs(16)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.completed, vec!["P1", "P2", "P3"]);
        assert_eq!(snapshot.position, "P3");
        assert!(snapshot.pending.is_empty());
        assert!(!controller.traversal_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_order_supersedes_pending_queue() {
        let controller = DispatchController::new("0", TRAVEL);
        controller.submit(&runline(&["A", "B", "C"])).await;

        // Let the first leg complete, then replace the queue mid-traversal.
        sleep(Duration::from_secs(6)).await;
        assert_eq!(controller.snapshot().await.completed, vec!["A"]);
        controller.submit(&runline(&["X", "Y"])).await;

        sleep(Duration::from_secs(12)).await;

        let snapshot = controller.snapshot().await;
        assert!(snapshot.pending.is_empty());
        assert_eq!(snapshot.completed, vec!["A", "X", "Y"]);
        assert_eq!(snapshot.position, "Y");
        assert!(!controller.traversal_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_traversal_restarts_after_drain() {
        let controller = DispatchController::new("0", TRAVEL);
        controller.submit(&runline(&["A"])).await;
        sleep(Duration::from_secs(6)).await;
        assert!(!controller.traversal_active().await);

        controller.submit(&runline(&["B"])).await;
        assert!(controller.traversal_active().await);
        sleep(Duration::from_secs(6)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.completed, vec!["A", "B"]);
        assert_eq!(snapshot.position, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_never_tear_across_a_leg() {
        let controller = DispatchController::new("0", TRAVEL);
        controller.submit(&runline(&["P1", "P2", "P3"])).await;

        // Observe at points interleaved with leg completions: every waypoint
        // is in exactly one of the two lists, and their concatenation is
        // always the original order.
        for _ in 0..10 {
            sleep(Duration::from_secs(2)).await;
            let snapshot = controller.snapshot().await;
            let mut all = snapshot.completed.clone();
            all.extend(snapshot.pending.iter().cloned());
            assert_eq!(all, vec!["P1", "P2", "P3"]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_leg_without_completing_it() {
        let controller = DispatchController::new("0", TRAVEL);
        controller.submit(&runline(&["A", "B"])).await;

        // First leg done, second leg in flight
        sleep(Duration::from_secs(6)).await;
        controller.shutdown().await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.completed, vec!["A"]);
        assert_eq!(snapshot.position, "A");
        assert_eq!(snapshot.pending, vec!["B"]);
        assert!(!controller.traversal_active().await);

        // The aborted task must not wake up later and finish the leg
        sleep(Duration::from_secs(20)).await;
        assert_eq!(controller.snapshot().await, snapshot);
    }
}
