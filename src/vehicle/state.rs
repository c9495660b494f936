//! In-memory vehicle state

use std::collections::VecDeque;

/// Position and waypoint bookkeeping for the simulated vehicle
///
/// Owned by the core; every cross-task access goes through the core lock in
/// [`DispatchController`](crate::vehicle::DispatchController).
#[derive(Debug)]
pub struct VehicleState {
    /// Name of the waypoint the vehicle currently occupies
    pub position: String,
    /// Waypoints still to visit, front first. Replaced wholesale on each
    /// accepted order, drained only by the traversal task.
    pub pending: VecDeque<String>,
    /// Waypoints visited this run, oldest first. Append-only; unbounded for
    /// the process lifetime.
    pub completed: Vec<String>,
}

impl VehicleState {
    pub fn new(initial_position: impl Into<String>) -> Self {
        Self {
            position: initial_position.into(),
            pending: VecDeque::new(),
            completed: Vec::new(),
        }
    }

    /// Copy of all three fields taken at a single instant
    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            position: self.position.clone(),
            pending: self.pending.iter().cloned().collect(),
            completed: self.completed.clone(),
        }
    }
}

/// Consistent point-in-time copy of [`VehicleState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleSnapshot {
    pub position: String,
    pub pending: Vec<String>,
    pub completed: Vec<String>,
}
