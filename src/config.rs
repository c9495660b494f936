//! Simulator configuration

use std::time::Duration;

/// Configuration for the AGV simulator
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Name of the waypoint the vehicle starts at
    pub initial_position: String,
    /// Address the dispatcher-facing listener binds to
    pub listen_addr: String,
    /// Simulated travel time per waypoint
    pub travel_time: Duration,
    /// Period between status feedback pushes
    pub feedback_period: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_position: "0".into(),
            listen_addr: "0.0.0.0:5000".into(),
            travel_time: Duration::from_secs(5),
            feedback_period: Duration::from_millis(2000),
        }
    }
}
