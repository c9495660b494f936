//! Background waypoint traversal task

use crate::vehicle::dispatch::CoreState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

/// Spawn the traversal task that drains the pending queue.
///
/// The caller installs the returned handle into `CoreState::traversal` under
/// the core lock before releasing it; the task takes the handle back out in
/// the same critical section in which it observes the queue empty. A
/// concurrent `submit` therefore either sees a live traversal (and leaves it
/// to drain the replaced queue) or sees none after the task has already
/// committed to exiting.
pub(crate) fn spawn(core: Arc<Mutex<CoreState>>, travel_time: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            {
                let mut state = core.lock().await;
                if state.vehicle.pending.is_empty() {
                    state.traversal = None;
                    info!(order = state.order_count, "transport order executed");
                    return;
                }
            }

            // Simulated travel towards the next waypoint. Cancellation lands
            // here: the waypoint stays pending, neither completed nor
            // reflected in the position.
            sleep(travel_time).await;

            let mut state = core.lock().await;
            // The queue may have been replaced by a newer order during the
            // sleep; whatever is at the front now is the leg that completes.
            if let Some(destination) = state.vehicle.pending.pop_front() {
                state.vehicle.completed.push(destination.clone());
                state.vehicle.position = destination;
                info!(position = %state.vehicle.position, "AGV reached position");
            }
        }
    })
}
