//! Repository structure graph: layout, viewport, rendering and live updates.
//!
//! - [`builder`] turns the flat node/link lists from the backend into a layered tree layout
//! - [`viewport`] holds pan, zoom and hover state and maps screen ↔ world coordinates
//! - [`render`] builds a drawable [`Scene`] and serializes it to SVG
//! - [`watcher`] refetches and relays out whenever the selected project or session changes

pub mod builder;
pub mod render;
pub mod viewport;
pub mod watcher;

pub use builder::{LaidOutNode, Layout, LayoutBuilder, Point, ROOT_ID, build_layout};
pub use render::{EdgeShape, NodeIcon, NodeShape, Scene, scene};
pub use viewport::{NODE_RADIUS, Viewport};
pub use watcher::{StructureState, StructureWatcher};
