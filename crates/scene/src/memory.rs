//! Headless drawing backend
//!
//! Keeps live objects in memory and counts every operation, which makes it
//! the backend of choice for tests, benchmarks and the headless demo.

use crate::backend::{DrawingBackend, ObjectHandle, RenderError, ResolvedParent};
use crate::viewport::Viewport;
use mathboard_shared::{ElementId, ElementKind, Props};
use std::collections::{BTreeMap, HashSet};

/// A live object as the backend sees it
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryObject {
    pub id: ElementId,
    pub kind: ElementKind,
    pub parents: Vec<ResolvedParent>,
    pub props: Props,
    pub visible: bool,
    /// Coordinates of free points
    pub position: Option<(f64, f64)>,
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendOps {
    pub creates: usize,
    pub moves: usize,
    pub visibility_changes: usize,
    pub removes: usize,
    /// Number of times suspended changes were flushed to the screen
    pub paints: usize,
}

impl BackendOps {
    /// Creates, moves, visibility changes and removals together.
    pub fn mutations(&self) -> usize {
        self.creates + self.moves + self.visibility_changes + self.removes
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: BTreeMap<ObjectHandle, MemoryObject>,
    next_handle: u64,
    viewport: Viewport,
    suspended: usize,
    ops: BackendOps,
    creation_order: Vec<ElementId>,
    failing: HashSet<ElementId>,
}

impl MemoryBackend {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    /// Make every future `create` for `id` fail.
    pub fn fail_on(&mut self, id: impl Into<ElementId>) {
        self.failing.insert(id.into());
    }

    pub fn ops(&self) -> BackendOps {
        self.ops
    }

    pub fn reset_ops(&mut self) {
        self.ops = BackendOps::default();
        self.creation_order.clear();
    }

    /// Element ids in the order their objects were created.
    pub fn creation_order(&self) -> &[ElementId] {
        &self.creation_order
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&MemoryObject> {
        self.objects.get(&handle)
    }

    pub fn find(&self, id: &ElementId) -> Option<(ObjectHandle, &MemoryObject)> {
        self.objects
            .iter()
            .find(|(_, object)| &object.id == id)
            .map(|(handle, object)| (*handle, object))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended > 0
    }

    fn object_mut(&mut self, handle: ObjectHandle) -> Result<&mut MemoryObject, RenderError> {
        self.objects
            .get_mut(&handle)
            .ok_or(RenderError::UnknownHandle(handle))
    }

    fn paint_if_live(&mut self) {
        if self.suspended == 0 {
            self.ops.paints += 1;
        }
    }
}

impl DrawingBackend for MemoryBackend {
    fn suspend_updates(&mut self) {
        self.suspended += 1;
    }

    fn resume_updates(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
        self.paint_if_live();
    }

    fn create(
        &mut self,
        id: &ElementId,
        kind: ElementKind,
        parents: &[ResolvedParent],
        props: &Props,
    ) -> Result<ObjectHandle, RenderError> {
        if self.failing.contains(id) {
            return Err(RenderError::Backend(format!("refused to draw {id}")));
        }
        if let Some(missing) = parents.iter().find_map(|p| match p {
            ResolvedParent::Object(h) if !self.objects.contains_key(h) => Some(*h),
            _ => None,
        }) {
            return Err(RenderError::UnknownHandle(missing));
        }

        let position = match (kind, parents) {
            (ElementKind::Point, [ResolvedParent::Number(x), ResolvedParent::Number(y)]) => {
                Some((*x, *y))
            }
            (ElementKind::Point, [ResolvedParent::Object(_), ..]) => None,
            (ElementKind::Point, _) => {
                return Err(RenderError::InvalidParents {
                    kind,
                    message: format!("expected [x, y], got {} parent(s)", parents.len()),
                })
            }
            _ => None,
        };

        self.next_handle += 1;
        let handle = ObjectHandle(self.next_handle);
        let visible = props
            .get("visible")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        self.objects.insert(
            handle,
            MemoryObject {
                id: id.clone(),
                kind,
                parents: parents.to_vec(),
                props: props.clone(),
                visible,
                position,
            },
        );
        self.ops.creates += 1;
        self.creation_order.push(id.clone());
        self.paint_if_live();
        Ok(handle)
    }

    fn move_point(&mut self, handle: ObjectHandle, x: f64, y: f64) -> Result<(), RenderError> {
        let object = self.object_mut(handle)?;
        if object.position.is_none() {
            return Err(RenderError::InvalidParents {
                kind: object.kind,
                message: format!("{} is not a free point", object.id),
            });
        }
        object.position = Some((x, y));
        self.ops.moves += 1;
        self.paint_if_live();
        Ok(())
    }

    fn set_visible(&mut self, handle: ObjectHandle, visible: bool) -> Result<(), RenderError> {
        self.object_mut(handle)?.visible = visible;
        self.ops.visibility_changes += 1;
        self.paint_if_live();
        Ok(())
    }

    fn remove(&mut self, handle: ObjectHandle) -> Result<(), RenderError> {
        self.objects
            .remove(&handle)
            .ok_or(RenderError::UnknownHandle(handle))?;
        self.ops.removes += 1;
        self.paint_if_live();
        Ok(())
    }

    fn point_position(&self, handle: ObjectHandle) -> Option<(f64, f64)> {
        self.objects.get(&handle).and_then(|o| o.position)
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.paint_if_live();
    }
}
