//! Dispatcher protocol schema
//!
//! Inbound transport orders and outbound STATUS_IND feedback are JSON
//! documents:
//!
//! ```text
//! order:    {"cmd":"runline","points":[{"id":"P1"},{"id":"P2"}]}
//! feedback: {"feedback":"STATUS_IND","position":{...},"todo_list":[...],...}
//! ```

use crate::vehicle::VehicleSnapshot;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// The only command verb the simulator executes
pub const CMD_RUNLINE: &str = "runline";

/// Why a transport order was rejected
///
/// All rejections are local and recoverable: the offending order is logged
/// and dropped, core state stays untouched, and ingestion continues. Nothing
/// is sent back to the dispatcher for a rejected order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("invalid JSON: {0}")]
    MalformedPayload(String),

    #[error("transport order doesn't have element [cmd]")]
    MissingCommand,

    #[error("transport order unknown command: {0}")]
    UnsupportedCommand(String),

    #[error("transport order doesn't have any point")]
    MissingOrEmptyPoints,

    #[error("transport order invalid point at index {0}")]
    InvalidPoint(usize),
}

/// Validate a raw transport order into its waypoint sequence.
///
/// Validation is all-or-nothing: the first invalid point rejects the whole
/// order, so a half-updated pending queue can never be installed. Waypoints
/// come back in input order; repeats within one order are legal and kept.
pub fn validate_order(raw: &str) -> Result<Vec<String>, RejectReason> {
    let order: Value =
        serde_json::from_str(raw).map_err(|e| RejectReason::MalformedPayload(e.to_string()))?;
    let order = order
        .as_object()
        .ok_or_else(|| RejectReason::MalformedPayload("not a JSON object".into()))?;

    let cmd = order.get("cmd").ok_or(RejectReason::MissingCommand)?;
    match cmd.as_str() {
        Some(CMD_RUNLINE) => {}
        Some(other) => return Err(RejectReason::UnsupportedCommand(other.into())),
        None => return Err(RejectReason::UnsupportedCommand(cmd.to_string())),
    }

    let points = order
        .get("points")
        .and_then(Value::as_array)
        .filter(|points| !points.is_empty())
        .ok_or(RejectReason::MissingOrEmptyPoints)?;

    let mut waypoints = Vec::with_capacity(points.len());
    for (index, point) in points.iter().enumerate() {
        let id = point
            .get("id")
            .and_then(Value::as_str)
            .ok_or(RejectReason::InvalidPoint(index))?;
        waypoints.push(id.to_string());
    }

    Ok(waypoints)
}

/// Periodic STATUS_IND feedback message
///
/// Built fresh from a [`VehicleSnapshot`] on every publish tick, never
/// cached. Orientation, status and action are reserved for future simulation
/// fidelity and always emitted as zero, as are the position coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct StatusFeedback {
    pub feedback: &'static str,
    pub position: FeedbackPosition,
    pub orientation: u32,
    pub status: u32,
    pub action: u32,
    pub todo_list: Vec<String>,
    pub completed_point: Vec<String>,
}

/// Position block of a STATUS_IND message
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackPosition {
    pub position_name: String,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl StatusFeedback {
    /// Build a STATUS_IND from a consistent vehicle snapshot
    pub fn from_snapshot(snapshot: &VehicleSnapshot) -> Self {
        Self {
            feedback: "STATUS_IND",
            position: FeedbackPosition {
                position_name: snapshot.position.clone(),
                x: 0,
                y: 0,
                z: 0,
            },
            orientation: 0,
            status: 0,
            action: 0,
            todo_list: snapshot.pending.clone(),
            completed_point: snapshot.completed.clone(),
        }
    }
}
