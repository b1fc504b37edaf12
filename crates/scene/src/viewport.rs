//! Visible region and screen/user coordinate conversion

use mathboard_shared::events::PhysicalPosition;
use mathboard_shared::UserPoint;
use nalgebra_glm as glm;
use serde::{Deserialize, Serialize};

/// Visible region in user coordinates, `[left, top, right, bottom]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_array([left, top, right, bottom]: [f64; 4]) -> Self {
        Self::new(left, top, right, bottom)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.left, self.top, self.right, self.bottom]
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Scale around `anchor`; `factor > 1` zooms in. The anchor keeps its
    /// relative position inside the box.
    pub fn zoom_at(&self, anchor: UserPoint, factor: f64) -> Self {
        Self::new(
            anchor.x - (anchor.x - self.left) / factor,
            anchor.y + (self.top - anchor.y) / factor,
            anchor.x + (self.right - anchor.x) / factor,
            anchor.y - (anchor.y - self.bottom) / factor,
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(-10.0, 10.0, 10.0, -10.0)
    }
}

/// Bounding box plus the pixel size of the canvas showing it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(bbox: BoundingBox, width: u32, height: u32) -> Self {
        Self {
            bbox,
            width,
            height,
        }
    }

    /// Visible coordinate span used for adaptive hit testing
    pub fn span(&self) -> f64 {
        self.bbox.width()
    }

    /// Distance under which a pointer counts as touching an object.
    /// Shrinks as the view zooms in.
    pub fn hit_threshold(&self, divisor: f64) -> f64 {
        self.span() / divisor
    }

    /// Convert a canvas pixel position to user coordinates.
    ///
    /// `None` when the view is degenerate.
    pub fn screen_to_user(&self, position: PhysicalPosition) -> Option<UserPoint> {
        if self.width == 0 || self.height == 0 || self.bbox.is_degenerate() {
            return None;
        }

        let projection = glm::ortho_rh_zo(
            self.bbox.left,
            self.bbox.right,
            self.bbox.bottom,
            self.bbox.top,
            -1.0,
            1.0,
        );
        let inverse = projection.try_inverse()?;

        // Pixels to NDC, y pointing up
        let ndc_x = 2.0 * position.x / self.width as f64 - 1.0;
        let ndc_y = 1.0 - 2.0 * position.y / self.height as f64;

        let user = inverse * glm::vec4(ndc_x, ndc_y, 0.0, 1.0);
        Some(UserPoint::new(user.x, user.y))
    }

    /// Convert user coordinates to canvas pixels.
    pub fn user_to_screen(&self, point: UserPoint) -> PhysicalPosition {
        let projection = glm::ortho_rh_zo(
            self.bbox.left,
            self.bbox.right,
            self.bbox.bottom,
            self.bbox.top,
            -1.0,
            1.0,
        );
        let ndc = projection * glm::vec4(point.x, point.y, 0.0, 1.0);
        PhysicalPosition::new(
            (ndc.x + 1.0) * self.width as f64 / 2.0,
            (1.0 - ndc.y) * self.height as f64 / 2.0,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(BoundingBox::default(), 800, 600)
    }
}
