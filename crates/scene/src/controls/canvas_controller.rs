use crate::backend::{DrawingBackend, ObjectHandle};
use crate::model::SceneMutation;
use crate::reconciler::Reconciler;
use mathboard_shared::events::{
    ElementState, MouseButton, MouseScrollDelta, PhysicalPosition, WindowEvent,
};
use mathboard_shared::{ElementId, UserPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    /// Multiplicative zoom per wheel notch
    pub zoom_factor: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Hit threshold is the visible span divided by this
    pub hit_threshold_divisor: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            zoom_factor: 1.25,
            min_scale: 0.05,
            max_scale: 50.0,
            hit_threshold_divisor: 40.0,
        }
    }
}

/// Single source of truth for gesture arbitration
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    Panning { last: PhysicalPosition },
    Dragging { id: ElementId, handle: ObjectHandle },
}

/// Turns pointer and wheel events into view changes or scene mutations.
///
/// Panning and zooming only touch the backend's viewport. Dragging moves the
/// live point directly and reports a [`SceneMutation::MovePoint`] once the
/// pointer is released.
pub struct InteractionController {
    config: InteractionConfig,
    state: InteractionState,
    position: PhysicalPosition,
    scale: f64,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        InteractionController {
            config,
            state: InteractionState::Idle,
            position: PhysicalPosition::new(-1., -1.),
            scale: 1.0,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Zoom relative to the initial view
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Element the reconciler must leave alone right now.
    pub fn locked_element(&self) -> Option<&ElementId> {
        match &self.state {
            InteractionState::Dragging { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn handle_cursor_event<B: DrawingBackend + ?Sized>(
        &mut self,
        event: WindowEvent,
        live: &Reconciler,
        backend: &mut B,
    ) -> Option<SceneMutation> {
        match event {
            WindowEvent::MouseWheel { delta } => {
                self.handle_cursor_wheel(delta, backend);
                None
            }
            WindowEvent::CursorMoved { position } => {
                self.handle_cursor_moved(position, backend);
                None
            }
            WindowEvent::MouseInput { state, button } => {
                self.handle_cursor_input(state, button, live, backend)
            }
        }
    }

    fn handle_cursor_moved<B: DrawingBackend + ?Sized>(
        &mut self,
        position: PhysicalPosition,
        backend: &mut B,
    ) {
        if position == self.position {
            return;
        }
        self.position = position;

        match &mut self.state {
            InteractionState::Idle => {}
            InteractionState::Panning { last } => {
                let viewport = backend.viewport();
                // Delta in the current view, recomputed for every sample
                if let (Some(from), Some(to)) = (
                    viewport.screen_to_user(*last),
                    viewport.screen_to_user(position),
                ) {
                    let mut next = viewport;
                    next.bbox = viewport.bbox.translate(from.x - to.x, from.y - to.y);
                    backend.set_viewport(next);
                }
                *last = position;
            }
            InteractionState::Dragging { id, handle } => {
                let Some(target) = backend.viewport().screen_to_user(position) else {
                    return;
                };
                if let Err(e) = backend.move_point(*handle, target.x, target.y) {
                    log::warn!("Failed to drag {}: {}", id, e);
                }
            }
        }
    }

    fn handle_cursor_input<B: DrawingBackend + ?Sized>(
        &mut self,
        state: ElementState,
        button: MouseButton,
        live: &Reconciler,
        backend: &mut B,
    ) -> Option<SceneMutation> {
        if button != MouseButton::Left {
            return None;
        }

        match state {
            ElementState::Pressed => {
                self.begin_gesture(live, backend);
                None
            }
            ElementState::Released => {
                let finished = std::mem::replace(&mut self.state, InteractionState::Idle);
                match finished {
                    InteractionState::Dragging { id, handle } => {
                        match backend.point_position(handle) {
                            Some((x, y)) => Some(SceneMutation::MovePoint { id, x, y }),
                            None => {
                                log::debug!("Dragged element {} vanished before release", id);
                                None
                            }
                        }
                    }
                    InteractionState::Panning { .. } | InteractionState::Idle => None,
                }
            }
        }
    }

    fn begin_gesture<B: DrawingBackend + ?Sized>(&mut self, live: &Reconciler, backend: &B) {
        let viewport = backend.viewport();
        let Some(pointer) = viewport.screen_to_user(self.position) else {
            return;
        };
        let threshold = viewport.hit_threshold(self.config.hit_threshold_divisor);

        let mut nearest: Option<(f64, &ElementId, ObjectHandle, bool)> = None;
        for (id, object) in live.live_points() {
            if !object.visible {
                continue;
            }
            let Some((x, y)) = backend.point_position(object.handle) else {
                continue;
            };
            let distance = pointer.distance_to(&UserPoint::new(x, y));
            if distance <= threshold && nearest.map_or(true, |(d, ..)| distance < d) {
                nearest = Some((distance, id, object.handle, object.draggable));
            }
        }

        match nearest {
            // Dragging wins over any pan in progress
            Some((_, id, handle, true)) => {
                self.state = InteractionState::Dragging {
                    id: id.clone(),
                    handle,
                };
            }
            Some((_, id, _, false)) => {
                log::debug!("Pointer down on fixed point {}", id);
            }
            None => {
                if self.state == InteractionState::Idle {
                    self.state = InteractionState::Panning {
                        last: self.position,
                    };
                }
            }
        }
    }

    fn handle_cursor_wheel<B: DrawingBackend + ?Sized>(
        &mut self,
        delta: MouseScrollDelta,
        backend: &mut B,
    ) {
        let notches = delta.vertical_notches();
        if notches == 0.0 {
            return;
        }

        // Scrolling up zooms in
        let target = (self.scale * self.config.zoom_factor.powf(-notches))
            .clamp(self.config.min_scale, self.config.max_scale);
        let factor = target / self.scale;
        if (factor - 1.0).abs() < f64::EPSILON {
            return;
        }

        let viewport = backend.viewport();
        let Some(anchor) = viewport.screen_to_user(self.position) else {
            return;
        };

        let mut next = viewport;
        next.bbox = viewport.bbox.zoom_at(anchor, factor);
        backend.set_viewport(next);
        self.scale = target;
    }
}
