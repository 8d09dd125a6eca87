//! Turns a [`Layout`] and [`Viewport`] into drawable shapes, and shapes into SVG.

use std::fmt::Write as _;

use crate::api::NodeKind;

use super::builder::{Layout, Point};
use super::viewport::{HOVER_SCALE, NODE_RADIUS, Viewport};

pub const BACKGROUND: &str = "#080b0f";
pub const EDGE_COLOR: &str = "#2d3342";
pub const EDGE_HIGHLIGHT: &str = "#4F8BFF";
const NODE_FILL: &str = "#11151c";
const NODE_FILL_HOVER: &str = "#1a1f29";
const NODE_BORDER: &str = "rgba(255,255,255,0.1)";
const ICON_MUTED: &str = "#6b7280";
const ICON_TYPESCRIPT: &str = "#60a5fa";
const ICON_SECONDARY: &str = "#9ca3af";
const LABEL_MUTED: &str = "rgba(107,114,128,0.7)";

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeShape {
    pub source: String,
    pub target: String,
    pub from: Point,
    pub to: Point,
    /// Set when either endpoint is hovered
    pub emphasized: bool,
}

impl EdgeShape {
    pub fn stroke(&self) -> &'static str {
        if self.emphasized { EDGE_HIGHLIGHT } else { EDGE_COLOR }
    }

    pub fn stroke_width(&self) -> f64 {
        if self.emphasized { 2.0 } else { 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIcon {
    Folder,
    TypeScript,
    File,
}

impl NodeIcon {
    fn color(&self) -> &'static str {
        match self {
            NodeIcon::Folder => ICON_MUTED,
            NodeIcon::TypeScript => ICON_TYPESCRIPT,
            NodeIcon::File => ICON_SECONDARY,
        }
    }

    fn glyph(&self) -> &'static str {
        match self {
            NodeIcon::Folder => "\u{25A4}",
            NodeIcon::TypeScript | NodeIcon::File => "\u{2039}\u{203A}",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeShape {
    pub id: String,
    pub kind: NodeKind,
    pub center: Point,
    pub radius: f64,
    pub hovered: bool,
    pub icon: NodeIcon,
    /// Folders are always labelled, files only while hovered
    pub label: Option<String>,
}

/// Everything needed to draw one frame, in world coordinates plus the view transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub offset: Point,
    pub zoom: f64,
    pub edges: Vec<EdgeShape>,
    /// Draw order; the hovered node comes last
    pub nodes: Vec<NodeShape>,
}

/// Build the scene for the current view state.
pub fn scene(layout: &Layout, viewport: &Viewport) -> Scene {
    let hovered = viewport.hovered();

    let edges = layout
        .edges()
        .map(|(source, target)| EdgeShape {
            source: source.id.clone(),
            target: target.id.clone(),
            from: source.position,
            to: target.position,
            emphasized: hovered == Some(source.id.as_str()) || hovered == Some(target.id.as_str()),
        })
        .collect();

    let mut nodes: Vec<NodeShape> = layout
        .nodes()
        .iter()
        .map(|node| {
            let is_hovered = hovered == Some(node.id.as_str());
            let icon = match node.kind {
                NodeKind::Folder => NodeIcon::Folder,
                NodeKind::File => match node.file_type.as_deref() {
                    Some("ts") | Some("tsx") => NodeIcon::TypeScript,
                    _ => NodeIcon::File,
                },
            };
            let label = (is_hovered || node.kind == NodeKind::Folder).then(|| node.name.clone());
            NodeShape {
                id: node.id.clone(),
                kind: node.kind,
                center: node.position,
                radius: if is_hovered {
                    NODE_RADIUS * HOVER_SCALE
                } else {
                    NODE_RADIUS
                },
                hovered: is_hovered,
                icon,
                label,
            }
        })
        .collect();

    if let Some(idx) = nodes.iter().position(|n| n.hovered) {
        let top = nodes.remove(idx);
        nodes.push(top);
    }

    Scene {
        width: viewport.width(),
        height: viewport.height(),
        offset: viewport.offset,
        zoom: viewport.zoom,
        edges,
        nodes,
    }
}

impl Scene {
    pub fn node(&self, id: &str) -> Option<&NodeShape> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// SVG `transform` for the world group: translate by the offset, then scale
    /// about the viewport centre.
    fn transform(&self) -> String {
        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        format!(
            "translate({} {}) scale({}) translate({} {})",
            fmt_num(cx + self.offset.x),
            fmt_num(cy + self.offset.y),
            fmt_num(self.zoom),
            fmt_num(-cx),
            fmt_num(-cy)
        )
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_svg(&mut out);
        out
    }

    fn write_svg(&self, out: &mut String) -> std::fmt::Result {
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="monospace">"#,
            w = fmt_num(self.width),
            h = fmt_num(self.height)
        )?;
        writeln!(
            out,
            r##"<defs><pattern id="grid" width="20" height="20" patternUnits="userSpaceOnUse"><circle cx="10" cy="10" r="1" fill="#fff" opacity="0.03"/></pattern></defs>"##
        )?;
        writeln!(out, r#"<rect width="100%" height="100%" fill="{}"/>"#, BACKGROUND)?;
        writeln!(out, r#"<g transform="{}">"#, self.transform())?;
        writeln!(
            out,
            r#"<rect x="-10000" y="-10000" width="20000" height="20000" fill="url(#grid)"/>"#
        )?;

        for edge in &self.edges {
            writeln!(
                out,
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
                fmt_num(edge.from.x),
                fmt_num(edge.from.y),
                fmt_num(edge.to.x),
                fmt_num(edge.to.y),
                edge.stroke(),
                fmt_num(edge.stroke_width())
            )?;
        }

        for node in &self.nodes {
            let (fill, border) = if node.hovered {
                (NODE_FILL_HOVER, EDGE_HIGHLIGHT)
            } else {
                (NODE_FILL, NODE_BORDER)
            };
            writeln!(
                out,
                r#"<g class="node {kind}" data-id="{id}">"#,
                kind = node.kind,
                id = escape_xml(&node.id)
            )?;
            writeln!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}" fill="{}" stroke="{}"/>"#,
                fmt_num(node.center.x),
                fmt_num(node.center.y),
                fmt_num(node.radius),
                fill,
                border
            )?;
            writeln!(
                out,
                r#"<text x="{}" y="{}" font-size="10" text-anchor="middle" dominant-baseline="central" fill="{}">{}</text>"#,
                fmt_num(node.center.x),
                fmt_num(node.center.y),
                node.icon.color(),
                node.icon.glyph()
            )?;
            if let Some(label) = &node.label {
                let label_y = node.center.y + node.radius + 8.0;
                if node.hovered {
                    let width = label.chars().count() as f64 * 5.5 + 12.0;
                    writeln!(
                        out,
                        r#"<rect x="{}" y="{}" width="{}" height="14" rx="3" fill="rgba(0,0,0,0.8)"/>"#,
                        fmt_num(node.center.x - width / 2.0),
                        fmt_num(label_y - 7.0),
                        fmt_num(width)
                    )?;
                }
                writeln!(
                    out,
                    r#"<text x="{}" y="{}" font-size="9" text-anchor="middle" dominant-baseline="central" fill="{}">{}</text>"#,
                    fmt_num(node.center.x),
                    fmt_num(label_y),
                    if node.hovered { "#fff" } else { LABEL_MUTED },
                    escape_xml(label)
                )?;
            }
            writeln!(out, "</g>")?;
        }

        writeln!(out, "</g>")?;
        writeln!(
            out,
            r#"<text x="16" y="28" font-size="11" font-weight="bold" fill="{}">ARCHITECTURE TOPOLOGY</text>"#,
            ICON_SECONDARY
        )?;
        writeln!(out, "</svg>")
    }
}

/// Trim float noise so output is stable, e.g. `940` instead of `940.0`.
fn fmt_num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == rounded.trunc() {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
