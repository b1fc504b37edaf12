//! Seam to the drawing library that owns the live objects

use crate::viewport::Viewport;
use mathboard_shared::{ElementId, ElementKind, Props};
use std::fmt;
use thiserror::Error;

/// Opaque reference to a live object inside the drawing library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A parent entry with references resolved to live objects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedParent {
    Number(f64),
    Object(ObjectHandle),
}

/// Drawing library failures, scoped to a single object
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Cannot draw {kind}: {message}")]
    InvalidParents { kind: ElementKind, message: String },

    #[error("Unknown object {0}")]
    UnknownHandle(ObjectHandle),

    #[error("Drawing backend error: {0}")]
    Backend(String),
}

/// Creation/update/removal interface of the drawing library.
///
/// Only the reconciler and the interaction controller call into it, both on
/// the UI thread.
pub trait DrawingBackend {
    /// Stop painting until [`resume_updates`](Self::resume_updates).
    fn suspend_updates(&mut self);

    /// Resume painting and flush everything changed since the suspend.
    fn resume_updates(&mut self);

    fn create(
        &mut self,
        id: &ElementId,
        kind: ElementKind,
        parents: &[ResolvedParent],
        props: &Props,
    ) -> Result<ObjectHandle, RenderError>;

    fn move_point(&mut self, handle: ObjectHandle, x: f64, y: f64) -> Result<(), RenderError>;

    fn set_visible(&mut self, handle: ObjectHandle, visible: bool) -> Result<(), RenderError>;

    fn remove(&mut self, handle: ObjectHandle) -> Result<(), RenderError>;

    /// Current coordinates of a point object, `None` for anything else.
    fn point_position(&self, handle: ObjectHandle) -> Option<(f64, f64)>;

    fn viewport(&self) -> Viewport;

    fn set_viewport(&mut self, viewport: Viewport);
}
