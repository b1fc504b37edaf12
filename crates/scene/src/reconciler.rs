//! Synchronizes the live object graph with the scene model

use crate::backend::{DrawingBackend, ObjectHandle, RenderError, ResolvedParent};
use crate::defaults::ElementDefaults;
use crate::model::SceneModel;
use mathboard_shared::{Element, ElementId, ElementKind, Parent};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const POSITION_EPSILON: f64 = 1e-9;

/// Bookkeeping for one object living in the drawing backend
#[derive(Debug, Clone, PartialEq)]
pub struct LiveObject {
    pub handle: ObjectHandle,
    pub kind: ElementKind,
    /// Parents as declared when the object was last synchronized
    pub parents: Vec<Parent>,
    /// Free, non-fixed points accept drag gestures
    pub draggable: bool,
    pub visible: bool,
}

impl LiveObject {
    fn parent_refs(&self) -> impl Iterator<Item = &ElementId> {
        self.parents.iter().filter_map(|p| match p {
            Parent::Ref(id) => Some(id),
            Parent::Number(_) => None,
        })
    }

    fn is_free_point(&self) -> bool {
        self.kind == ElementKind::Point
            && matches!(self.parents.as_slice(), [Parent::Number(_), Parent::Number(_)])
    }
}

/// What a reconciliation pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<ElementId>,
    pub updated: Vec<ElementId>,
    pub removed: Vec<ElementId>,
    /// Waiting for a parent that is not live yet; retried next pass
    pub deferred: Vec<ElementId>,
    /// Rejected by the drawing backend
    pub failed: Vec<(ElementId, RenderError)>,
    /// Left alone because a gesture holds them
    pub skipped_locked: Vec<ElementId>,
}

impl ReconcileReport {
    /// True if the pass touched no live object.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Owns the id -> live object map and keeps it isomorphic to the model.
///
/// Objects are created in dependency-class order (points, then lines and
/// segments, circles and polygons, angles/sectors/curves, text and images),
/// so parents are live before their children. Existing objects are updated
/// in place; only removed or structurally changed elements are torn down.
pub struct Reconciler {
    live: HashMap<ElementId, LiveObject>,
    defaults: ElementDefaults,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::with_defaults(ElementDefaults::default())
    }

    pub fn with_defaults(defaults: ElementDefaults) -> Self {
        Self {
            live: HashMap::new(),
            defaults,
        }
    }

    pub fn defaults_mut(&mut self) -> &mut ElementDefaults {
        &mut self.defaults
    }

    pub fn live(&self, id: &ElementId) -> Option<&LiveObject> {
        self.live.get(id)
    }

    pub fn handle(&self, id: &ElementId) -> Option<ObjectHandle> {
        self.live.get(id).map(|l| l.handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live point objects, used for hit testing.
    pub fn live_points(&self) -> impl Iterator<Item = (&ElementId, &LiveObject)> {
        self.live
            .iter()
            .filter(|(_, live)| live.kind == ElementKind::Point)
    }

    /// Run one pass as a single visual update.
    ///
    /// `locked` is the element held by an in-progress gesture; its live
    /// object is neither updated nor rebuilt.
    pub fn reconcile<B: DrawingBackend + ?Sized>(
        &mut self,
        model: &SceneModel,
        backend: &mut B,
        locked: Option<&ElementId>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        backend.suspend_updates();

        self.remove_stale(model, backend, locked, &mut report);

        let mut order: Vec<&Element> = model.elements().iter().collect();
        order.sort_by_key(|e| e.kind.dependency_class());

        let mut waiting = Vec::new();
        for element in order {
            if !self.live.contains_key(&element.id) {
                if !self.try_create(element, backend, &mut report) {
                    waiting.push(element);
                }
                continue;
            }
            if locked == Some(&element.id) {
                report.skipped_locked.push(element.id.clone());
                continue;
            }
            self.update(element, backend, &mut report);
        }

        // Parents can sit in a higher class (a glider on a line); retry while
        // creations keep making progress.
        while !waiting.is_empty() {
            let before = waiting.len();
            waiting.retain(|element| !self.try_create(element, backend, &mut report));
            if waiting.len() == before {
                break;
            }
        }
        for element in waiting {
            if let Some(parent) = element.parent_refs().find(|p| !self.live.contains_key(*p)) {
                log::debug!(
                    "Deferring {} {}: parent {} is not live",
                    element.kind,
                    element.id,
                    parent
                );
            }
            report.deferred.push(element.id.clone());
        }

        backend.resume_updates();
        log::debug!(
            "Reconciled {} element(s): {} created, {} updated, {} removed, {} deferred, {} failed",
            model.len(),
            report.created.len(),
            report.updated.len(),
            report.removed.len(),
            report.deferred.len(),
            report.failed.len()
        );
        report
    }

    /// Tear down live objects that are gone from the model or whose
    /// declaration changed shape, together with their live dependents.
    fn remove_stale<B: DrawingBackend + ?Sized>(
        &mut self,
        model: &SceneModel,
        backend: &mut B,
        locked: Option<&ElementId>,
        report: &mut ReconcileReport,
    ) {
        let mut doomed: HashSet<ElementId> = self
            .live
            .iter()
            .filter(|(id, live)| match model.get(id) {
                None => true,
                Some(element) => locked != Some(*id) && is_structural_change(element, live),
            })
            .map(|(id, _)| id.clone())
            .collect();
        if doomed.is_empty() {
            return;
        }

        loop {
            let dependents: Vec<ElementId> = self
                .live
                .iter()
                .filter(|(id, live)| {
                    !doomed.contains(*id) && live.parent_refs().any(|p| doomed.contains(p))
                })
                .map(|(id, _)| id.clone())
                .collect();
            if dependents.is_empty() {
                break;
            }
            doomed.extend(dependents);
        }

        let mut remaining: Vec<(ElementId, LiveObject)> = doomed
            .into_iter()
            .filter_map(|id| self.live.remove(&id).map(|live| (id, live)))
            .collect();

        // Children before parents
        while !remaining.is_empty() {
            let referenced: HashSet<ElementId> = remaining
                .iter()
                .flat_map(|(_, live)| live.parent_refs().cloned())
                .collect();
            let (mut leaves, mut rest): (Vec<_>, Vec<_>) = remaining
                .into_iter()
                .partition(|(id, _)| !referenced.contains(id));
            if leaves.is_empty() {
                // Reference cycle; nothing left to order by
                leaves = std::mem::take(&mut rest);
            }
            leaves.sort_by(|a, b| a.0.cmp(&b.0));

            for (id, live) in leaves {
                if let Err(e) = backend.remove(live.handle) {
                    log::warn!("Failed to remove {} {}: {}", live.kind, id, e);
                }
                report.removed.push(id);
            }
            remaining = rest;
        }
    }

    /// Returns false if a parent is not live yet.
    fn try_create<B: DrawingBackend + ?Sized>(
        &mut self,
        element: &Element,
        backend: &mut B,
        report: &mut ReconcileReport,
    ) -> bool {
        let mut resolved = Vec::with_capacity(element.parents.len());
        for parent in &element.parents {
            match parent {
                Parent::Number(n) => resolved.push(ResolvedParent::Number(*n)),
                Parent::Ref(id) => match self.live.get(id) {
                    Some(live) => resolved.push(ResolvedParent::Object(live.handle)),
                    None => return false,
                },
            }
        }

        let props = self.defaults.merge(element.kind, &element.props);
        match backend.create(&element.id, element.kind, &resolved, &props) {
            Ok(handle) => {
                let fixed = props.get("fixed").and_then(Value::as_bool).unwrap_or(false);
                self.live.insert(
                    element.id.clone(),
                    LiveObject {
                        handle,
                        kind: element.kind,
                        parents: element.parents.clone(),
                        draggable: element.point_position().is_some() && !fixed,
                        visible: element.is_visible(),
                    },
                );
                report.created.push(element.id.clone());
            }
            Err(e) => {
                log::warn!("Failed to draw {} {}: {}", element.kind, element.id, e);
                report.failed.push((element.id.clone(), e));
            }
        }
        true
    }

    /// Apply mutable fields only: point position and visibility.
    fn update<B: DrawingBackend + ?Sized>(
        &mut self,
        element: &Element,
        backend: &mut B,
        report: &mut ReconcileReport,
    ) {
        let Some(live) = self.live.get_mut(&element.id) else {
            return;
        };

        match sync_mutable_fields(element, live, backend) {
            Ok(true) => report.updated.push(element.id.clone()),
            Ok(false) => {}
            Err(e) => {
                log::warn!("Failed to update {} {}: {}", element.kind, element.id, e);
                report.failed.push((element.id.clone(), e));
            }
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// A change the backend cannot express as an in-place update.
fn is_structural_change(element: &Element, live: &LiveObject) -> bool {
    if element.kind != live.kind {
        return true;
    }
    if element.parents == live.parents {
        return false;
    }
    !(live.is_free_point() && element.point_position().is_some())
}

fn sync_mutable_fields<B: DrawingBackend + ?Sized>(
    element: &Element,
    live: &mut LiveObject,
    backend: &mut B,
) -> Result<bool, RenderError> {
    let mut changed = false;

    if let Some((x, y)) = element.point_position() {
        let in_place = backend.point_position(live.handle).map_or(false, |(cx, cy)| {
            (cx - x).abs() <= POSITION_EPSILON && (cy - y).abs() <= POSITION_EPSILON
        });
        if !in_place {
            backend.move_point(live.handle, x, y)?;
            changed = true;
        }
        live.parents = element.parents.clone();
    }

    let visible = element.is_visible();
    if visible != live.visible {
        backend.set_visible(live.handle, visible)?;
        live.visible = visible;
        changed = true;
    }

    Ok(changed)
}
