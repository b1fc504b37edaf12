//! Declarative scene for the Mathboard canvas
//!
//! The [`SceneModel`] is the authoritative element list. The [`Reconciler`]
//! brings a live object graph owned by a [`DrawingBackend`] into agreement
//! with it, and the [`InteractionController`] turns pointer gestures into
//! view changes or model mutations.

pub mod backend;
pub mod controls;
pub mod defaults;
pub mod memory;
pub mod model;
pub mod reconciler;
pub mod viewport;

pub use backend::{DrawingBackend, ObjectHandle, RenderError, ResolvedParent};
pub use controls::canvas_controller::{InteractionConfig, InteractionController, InteractionState};
pub use defaults::ElementDefaults;
pub use memory::{BackendOps, MemoryBackend, MemoryObject};
pub use model::{SceneModel, SceneMutation};
pub use reconciler::{LiveObject, ReconcileReport, Reconciler};
pub use viewport::{BoundingBox, Viewport};

use mathboard_shared::ElementId;
use thiserror::Error;

/// Scene model errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Duplicate element id: {0}")]
    DuplicateId(ElementId),

    #[error("Element {id} references missing parent {parent}")]
    DanglingParent { id: ElementId, parent: ElementId },

    #[error("Element not found: {0}")]
    NotFound(ElementId),

    #[error("Element {0} is not a free point")]
    NotAFreePoint(ElementId),
}

pub type Result<T> = std::result::Result<T, SceneError>;
