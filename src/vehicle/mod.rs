//! Order-execution core
//!
//! This module owns the in-memory vehicle state and the three concurrent
//! roles around it: order intake ([`DispatchController`]), background
//! waypoint traversal, and periodic status feedback ([`publisher`]). All
//! shared state lives behind one lock inside the controller.

pub mod dispatch;
pub mod publisher;
pub mod state;
mod traversal;

pub use dispatch::{DispatchController, SubmitOutcome};
pub use state::{VehicleSnapshot, VehicleState};
