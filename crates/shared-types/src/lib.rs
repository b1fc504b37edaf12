//! Shared types for the Mathboard workspace
//!
//! This crate contains the wire-level vocabulary shared between the RPC
//! bridge, the scene crate and the session layer: elements, commands,
//! computation results, worker status and pointer events.

pub mod command;
pub mod element;
pub mod errors;
pub mod events;
pub mod intent;
pub mod results;
pub mod status;

pub use command::{Command, CommandError, Intent, RawCommand, RequestKind};
pub use element::{Element, ElementId, ElementKind, Parent, Props};
pub use errors::{ErrorResponse, MathboardError, MathboardResult};
pub use results::{Annotation, CommandResult, GeometryResult, GraphEntry, GraphResult};
pub use status::{WorkerPhase, WorkerStatus};

/// A point in user (math) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserPoint {
    pub x: f64,
    pub y: f64,
}

impl UserPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &UserPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}
