//! Pan/zoom/hover state over a [`Layout`].
//!
//! The transform is a translation by `offset` followed by a uniform scale about the
//! viewport centre, so a world point `p` lands on screen at
//! `center + offset + zoom * (p - center)`.

use crate::config::ViewportSection;

use super::builder::{LaidOutNode, Layout, Point};

/// Radius of a drawn node in world units.
pub const NODE_RADIUS: f64 = 16.0;

/// Scale applied to the hovered node.
pub const HOVER_SCALE: f64 = 1.1;

/// Vertical screen offset used when centring on the root.
const TOP_MARGIN: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset: Point,
    pub zoom: f64,
    pub is_dragging: bool,
    last_pointer: Point,
    hovered: Option<String>,
    settings: ViewportSection,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportSection::default())
    }
}

impl Viewport {
    pub fn new(settings: ViewportSection) -> Self {
        Self {
            offset: Point::default(),
            zoom: 1.0,
            is_dragging: false,
            last_pointer: Point::default(),
            hovered: None,
            settings,
        }
    }

    pub fn width(&self) -> f64 {
        self.settings.width
    }

    pub fn height(&self) -> f64 {
        self.settings.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.settings.width / 2.0, self.settings.height / 2.0)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.settings.width = width;
        self.settings.height = height;
    }

    /// Place the root horizontally in the middle of the viewport, near the top.
    /// Zoom is left alone.
    pub fn center_on(&mut self, layout: &Layout) {
        if let Some(root) = layout.root() {
            self.offset = Point::new(self.settings.width / 2.0 - root.position.x, TOP_MARGIN);
        }
    }

    pub fn pointer_down(&mut self, at: Point) {
        self.is_dragging = true;
        self.last_pointer = at;
    }

    /// Pan by the movement since the last pointer event. Returns whether the
    /// offset changed.
    pub fn pointer_move(&mut self, at: Point) -> bool {
        if !self.is_dragging {
            return false;
        }
        let dx = at.x - self.last_pointer.x;
        let dy = at.y - self.last_pointer.y;
        self.offset.x += dx;
        self.offset.y += dy;
        self.last_pointer = at;
        dx != 0.0 || dy != 0.0
    }

    pub fn pointer_up(&mut self) {
        self.is_dragging = false;
    }

    /// Leaving the viewport ends a drag like releasing the pointer.
    pub fn pointer_leave(&mut self) {
        self.pointer_up();
    }

    /// Zoom by a wheel delta; positive deltas zoom out.
    pub fn wheel(&mut self, delta_y: f64) {
        self.set_zoom(self.zoom - delta_y * self.settings.wheel_sensitivity);
    }

    /// Set the zoom, bounded by the configured limits.
    pub fn set_zoom(&mut self, zoom: f64) {
        // f64::clamp panics on inverted bounds, which a bad config can produce.
        self.zoom = zoom.max(self.settings.min_zoom).min(self.settings.max_zoom);
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn hover(&mut self, id: impl Into<String>) {
        self.hovered = Some(id.into());
    }

    pub fn unhover(&mut self) {
        self.hovered = None;
    }

    /// Update the hovered node from a pointer position. Returns whether it changed.
    pub fn hover_at(&mut self, layout: &Layout, at: Point) -> bool {
        let next = self.node_at(layout, at).map(|n| n.id.clone());
        if next == self.hovered {
            return false;
        }
        self.hovered = next;
        true
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        let c = self.center();
        Point::new(
            c.x + self.offset.x + self.zoom * (p.x - c.x),
            c.y + self.offset.y + self.zoom * (p.y - c.y),
        )
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        let c = self.center();
        Point::new(
            (p.x - c.x - self.offset.x) / self.zoom + c.x,
            (p.y - c.y - self.offset.y) / self.zoom + c.y,
        )
    }

    /// Topmost node under a screen position. The hovered node is drawn above the
    /// others, and later nodes above earlier ones.
    pub fn node_at<'a>(&self, layout: &'a Layout, at: Point) -> Option<&'a LaidOutNode> {
        let world = self.screen_to_world(at);

        if let Some(hovered) = self.hovered.as_deref().and_then(|id| layout.node(id)) {
            if hovered.position.distance(&world) <= NODE_RADIUS * HOVER_SCALE {
                return Some(hovered);
            }
        }

        layout
            .nodes()
            .iter()
            .rev()
            .find(|n| n.position.distance(&world) <= NODE_RADIUS)
    }
}
