//! Layered tree layout for repository structure graphs.
//!
//! The builder takes the flat node/link lists of the structure endpoint, infers the
//! hierarchy from the root, assigns each node a level and places every level as a
//! centred row.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use rand::Rng;
use tracing::debug;

use crate::api::{ApiLink, ApiNode, NodeKind};
use crate::config::LayoutSection;

/// Id the backend gives the repository root.
pub const ROOT_ID: &str = "ROOT";

/// A 2D point in layout (world) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A node with its computed position.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutNode {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub path: String,
    pub file_type: Option<String>,
    pub position: Point,
    /// Level in the tree; unreachable nodes stay at 0
    pub depth: usize,
    /// Children in the order their links were supplied
    pub child_ids: Vec<String>,
}

impl LaidOutNode {
    fn from_api(node: &ApiNode) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind,
            name: node.name.clone(),
            path: node.path.clone(),
            file_type: node.file_type.clone(),
            position: Point::default(),
            depth: 0,
            child_ids: Vec::new(),
        }
    }
}

/// A laid-out graph ready for rendering.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Nodes grouped by level (levels in order of first appearance), input order within a level
    nodes: Vec<LaidOutNode>,
    /// Map from node id to index in `nodes`
    index_map: HashMap<String, usize>,
    root_id: String,
    width: f64,
    height: f64,
}

impl Layout {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[LaidOutNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&LaidOutNode> {
        self.index_map.get(id).and_then(|&i| self.nodes.get(i))
    }

    pub fn root(&self) -> Option<&LaidOutNode> {
        self.node(&self.root_id)
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Canvas size the rows were centred in.
    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// All parent → child edges whose endpoints are both present, in node order.
    pub fn edges(&self) -> impl Iterator<Item = (&LaidOutNode, &LaidOutNode)> {
        self.nodes.iter().flat_map(move |source| {
            source
                .child_ids
                .iter()
                .filter_map(move |target| self.node(target).map(|t| (source, t)))
        })
    }

    /// Deepest level present in the layout.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

type JitterFn = Box<dyn FnMut(f64) -> f64 + Send>;

/// Builder for [`Layout`]s.
pub struct LayoutBuilder {
    settings: LayoutSection,
    /// Returns a horizontal jitter in `[0, max)` for each node
    jitter: JitterFn,
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new(LayoutSection::default())
    }
}

impl LayoutBuilder {
    /// Create a builder with random jitter.
    pub fn new(settings: LayoutSection) -> Self {
        Self {
            settings,
            jitter: Box::new(random_jitter),
        }
    }

    /// Replace the jitter source, e.g. for deterministic output.
    pub fn with_jitter(mut self, jitter: impl FnMut(f64) -> f64 + Send + 'static) -> Self {
        self.jitter = Box::new(jitter);
        self
    }

    /// Place nodes exactly on the grid.
    pub fn without_jitter(self) -> Self {
        self.with_jitter(|_| 0.0)
    }

    pub fn settings(&self) -> &LayoutSection {
        &self.settings
    }

    /// Build the layout. Returns `None` when there are no nodes.
    ///
    /// - The root is the node with id `ROOT`, else the first node.
    /// - Links naming an unknown node are dropped.
    /// - A node reached along several paths keeps the depth of its last visit.
    /// - A link back to a node on the current path is not followed.
    /// - Nodes the traversal never reaches are placed at depth 0.
    pub fn build(&mut self, nodes: &[ApiNode], links: &[ApiLink]) -> Option<Layout> {
        let root_id = nodes
            .iter()
            .find(|n| n.id == ROOT_ID)
            .or_else(|| nodes.first())?
            .id
            .clone();

        // Later duplicates replace earlier ones but keep the first position.
        let mut node_map: IndexMap<String, LaidOutNode> = IndexMap::with_capacity(nodes.len());
        for node in nodes {
            node_map.insert(node.id.clone(), LaidOutNode::from_api(node));
        }

        let mut dropped = 0usize;
        for link in links {
            if node_map.contains_key(&link.source) && node_map.contains_key(&link.target) {
                if let Some(source) = node_map.get_mut(&link.source) {
                    source.child_ids.push(link.target.clone());
                }
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "dropped links with unknown endpoints");
        }

        let mut depths: HashMap<String, usize> = HashMap::new();
        let mut on_path: HashSet<String> = HashSet::new();
        assign_depths(&root_id, &node_map, &mut depths, &mut on_path);

        let mut levels: IndexMap<usize, Vec<String>> = IndexMap::new();
        for (id, node) in node_map.iter_mut() {
            node.depth = depths.get(id).copied().unwrap_or(0);
            levels.entry(node.depth).or_default().push(id.clone());
        }

        let spacing = self.settings.sibling_spacing;
        let mut laid_out = Vec::with_capacity(node_map.len());
        for (level, ids) in &levels {
            let row_width = ids.len() as f64 * spacing;
            let start_x = (self.settings.canvas_width - row_width) / 2.0;
            let y = self.settings.base_offset + *level as f64 * self.settings.level_height;

            for (idx, id) in ids.iter().enumerate() {
                if let Some(mut node) = node_map.swap_remove(id) {
                    let jitter = (self.jitter)(self.settings.max_jitter);
                    node.position = Point::new(start_x + idx as f64 * spacing + jitter, y);
                    laid_out.push(node);
                }
            }
        }

        let index_map = laid_out
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();

        Some(Layout {
            nodes: laid_out,
            index_map,
            root_id,
            width: self.settings.canvas_width,
            height: self.settings.canvas_height,
        })
    }
}

struct DepthFrame<'a> {
    id: &'a str,
    depth: usize,
    children: &'a [String],
    next: usize,
}

/// Depth-first level assignment from `root`, in pre-order.
///
/// Runs on an explicit stack so a deep chain cannot exhaust the thread stack.
fn assign_depths(
    root: &str,
    node_map: &IndexMap<String, LaidOutNode>,
    depths: &mut HashMap<String, usize>,
    on_path: &mut HashSet<String>,
) {
    let mut stack = Vec::new();
    enter_node(root, 0, node_map, depths, on_path, &mut stack);

    while let Some(frame) = stack.last_mut() {
        let (id, depth, children) = (frame.id, frame.depth, frame.children);
        let Some(child) = children.get(frame.next) else {
            on_path.remove(id);
            stack.pop();
            continue;
        };
        frame.next += 1;
        if on_path.contains(child) {
            debug!(parent = %id, %child, "skipping link that closes a cycle");
            continue;
        }
        enter_node(child, depth + 1, node_map, depths, on_path, &mut stack);
    }
}

/// Record `id` at `depth` (last writer wins) and queue its children.
fn enter_node<'a>(
    id: &'a str,
    depth: usize,
    node_map: &'a IndexMap<String, LaidOutNode>,
    depths: &mut HashMap<String, usize>,
    on_path: &mut HashSet<String>,
    stack: &mut Vec<DepthFrame<'a>>,
) {
    depths.insert(id.to_string(), depth);
    if let Some(node) = node_map.get(id) {
        on_path.insert(id.to_string());
        stack.push(DepthFrame {
            id,
            depth,
            children: &node.child_ids,
            next: 0,
        });
    }
}

fn random_jitter(max: f64) -> f64 {
    if max > 0.0 {
        rand::thread_rng().gen_range(0.0..max)
    } else {
        0.0
    }
}

/// Lay out with the default constants and random jitter.
pub fn build_layout(nodes: &[ApiNode], links: &[ApiLink]) -> Option<Layout> {
    LayoutBuilder::default().build(nodes, links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(id: &str) -> ApiNode {
        ApiNode::folder(id, id, id)
    }

    fn file(id: &str) -> ApiNode {
        ApiNode::file(id, &format!("{}.ts", id), id)
    }

    fn link(source: &str, target: &str) -> ApiLink {
        ApiLink::new(source, target)
    }

    fn build(nodes: &[ApiNode], links: &[ApiLink]) -> Layout {
        LayoutBuilder::default()
            .without_jitter()
            .build(nodes, links)
            .unwrap()
    }

    #[test]
    fn test_empty_input_has_no_layout() {
        assert!(build_layout(&[], &[]).is_none());
        assert!(build_layout(&[], &[link("ROOT", "A")]).is_none());
    }

    #[test]
    fn test_root_and_children_levels() {
        let layout = build(
            &[folder("ROOT"), file("A"), file("B")],
            &[link("ROOT", "A"), link("ROOT", "B")],
        );

        let root = layout.root().unwrap();
        assert_eq!(root.id, "ROOT");
        assert_eq!(root.depth, 0);
        assert_eq!(root.position.y, 100.0);

        let a = layout.node("A").unwrap();
        let b = layout.node("B").unwrap();
        assert_eq!((a.depth, b.depth), (1, 1));
        assert_eq!(a.position.y, 280.0);
        assert_eq!(b.position.y, 280.0);
        assert_eq!(root.child_ids, vec!["A", "B"]);
    }

    #[test]
    fn test_rows_are_centred_with_fixed_spacing() {
        let layout = build(
            &[folder("ROOT"), file("A"), file("B")],
            &[link("ROOT", "A"), link("ROOT", "B")],
        );
        // Level 0: one node, row width 120 in a 2000-wide canvas.
        assert_eq!(layout.root().unwrap().position.x, 940.0);
        // Level 1: two nodes, row width 240.
        assert_eq!(layout.node("A").unwrap().position.x, 880.0);
        assert_eq!(layout.node("B").unwrap().position.x, 1000.0);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let nodes: Vec<ApiNode> = std::iter::once(folder("ROOT"))
            .chain((0..50).map(|i| file(&format!("f{}", i))))
            .collect();
        let links: Vec<ApiLink> = (0..50).map(|i| link("ROOT", &format!("f{}", i))).collect();
        let layout = build_layout(&nodes, &links).unwrap();

        let start_x = (2000.0 - 50.0 * 120.0) / 2.0;
        for (idx, id) in (0..50).map(|i| format!("f{}", i)).enumerate() {
            let x = layout.node(&id).unwrap().position.x;
            let grid = start_x + idx as f64 * 120.0;
            assert!(x >= grid && x < grid + 20.0, "{} at {} outside jitter range", id, x);
        }
    }

    #[test]
    fn test_root_falls_back_to_first_node() {
        let layout = build(&[folder("top"), file("x")], &[link("top", "x")]);
        assert_eq!(layout.root_id(), "top");
        assert_eq!(layout.node("x").unwrap().depth, 1);
    }

    #[test]
    fn test_root_id_preferred_over_first_node() {
        let layout = build(&[file("x"), folder("ROOT")], &[link("ROOT", "x")]);
        assert_eq!(layout.root_id(), "ROOT");
        assert_eq!(layout.node("x").unwrap().depth, 1);
    }

    #[test]
    fn test_unknown_link_endpoints_are_dropped() {
        let layout = build(
            &[folder("ROOT"), file("A")],
            &[link("ROOT", "A"), link("ROOT", "ghost"), link("ghost", "A")],
        );
        assert_eq!(layout.root().unwrap().child_ids, vec!["A"]);
        assert!(layout.nodes().iter().all(|n| !n.child_ids.contains(&"ghost".to_string())));
        assert_eq!(layout.edges().count(), 1);
    }

    #[test]
    fn test_unreachable_nodes_sit_at_depth_zero() {
        let layout = build(
            &[folder("ROOT"), file("A"), file("orphan")],
            &[link("ROOT", "A")],
        );
        assert_eq!(layout.len(), 3);
        let orphan = layout.node("orphan").unwrap();
        assert_eq!(orphan.depth, 0);
        assert_eq!(orphan.position.y, 100.0);
        // Shares the top row with the root: two nodes, row width 240.
        assert_eq!(layout.root().unwrap().position.x, 880.0);
        assert_eq!(orphan.position.x, 1000.0);
    }

    #[test]
    fn test_last_visit_wins_for_multi_parent_nodes() {
        // ROOT -> A -> C, ROOT -> C: DFS visits C at depth 2 first, then at depth 1 last.
        let layout = build(
            &[folder("ROOT"), folder("A"), file("C")],
            &[link("ROOT", "A"), link("A", "C"), link("ROOT", "C")],
        );
        assert_eq!(layout.node("C").unwrap().depth, 1);

        // Reverse link order: C is last visited at depth 2.
        let layout = build(
            &[folder("ROOT"), folder("A"), file("C")],
            &[link("ROOT", "C"), link("ROOT", "A"), link("A", "C")],
        );
        assert_eq!(layout.node("C").unwrap().depth, 2);
    }

    #[test]
    fn test_cycles_terminate() {
        let layout = build(
            &[folder("ROOT"), folder("A"), folder("B")],
            &[link("ROOT", "A"), link("A", "B"), link("B", "A"), link("B", "ROOT")],
        );
        assert_eq!(layout.root().unwrap().depth, 0);
        assert_eq!(layout.node("A").unwrap().depth, 1);
        assert_eq!(layout.node("B").unwrap().depth, 2);
    }

    #[test]
    fn test_self_loop_terminates() {
        let layout = build(&[folder("ROOT")], &[link("ROOT", "ROOT")]);
        assert_eq!(layout.root().unwrap().depth, 0);
    }

    #[test]
    fn test_duplicate_ids_keep_first_position_last_value() {
        let mut replacement = file("A");
        replacement.name = "renamed.ts".to_string();
        let layout = build(
            &[folder("ROOT"), file("A"), file("B"), replacement],
            &[link("ROOT", "A"), link("ROOT", "B")],
        );
        assert_eq!(layout.len(), 3);
        let a = layout.node("A").unwrap();
        assert_eq!(a.name, "renamed.ts");
        assert_eq!(a.position.x, 880.0);
    }

    #[test]
    fn test_nodes_grouped_by_level_in_first_appearance_order() {
        let layout = build(
            &[folder("ROOT"), folder("src"), file("main"), file("readme")],
            &[link("ROOT", "src"), link("src", "main"), link("ROOT", "readme")],
        );
        let order: Vec<&str> = layout.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["ROOT", "src", "readme", "main"]);
        assert_eq!(layout.max_depth(), 2);
        assert_eq!(layout.node("main").unwrap().position.y, 460.0);
    }

    #[test]
    fn test_custom_settings() {
        let settings = LayoutSection {
            sibling_spacing: 50.0,
            level_height: 10.0,
            base_offset: 0.0,
            max_jitter: 0.0,
            canvas_width: 100.0,
            canvas_height: 100.0,
        };
        let layout = LayoutBuilder::new(settings)
            .build(&[folder("ROOT"), file("A")], &[link("ROOT", "A")])
            .unwrap();
        assert_eq!(layout.root().unwrap().position, Point::new(25.0, 0.0));
        assert_eq!(layout.node("A").unwrap().position, Point::new(25.0, 10.0));
        assert_eq!(layout.size(), (100.0, 100.0));
    }

    #[test]
    fn test_deep_chain_on_small_stack() {
        // Tokio worker threads default to 2 MiB, which is where the watcher builds layouts.
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let mut nodes = vec![folder("ROOT")];
                let mut links = Vec::new();
                let mut parent = "ROOT".to_string();
                for i in 0..50_000 {
                    let id = format!("n{}", i);
                    nodes.push(folder(&id));
                    links.push(link(&parent, &id));
                    parent = id;
                }
                // Close the chain back to the root; the guard must still stop it.
                links.push(link(&parent, "ROOT"));
                let layout = build(&nodes, &links);
                (
                    layout.len(),
                    layout.max_depth(),
                    layout.root().unwrap().depth,
                    layout.node("n49999").unwrap().depth,
                )
            })
            .unwrap();

        let (len, max_depth, root_depth, last_depth) = handle.join().unwrap();
        assert_eq!(len, 50_001);
        assert_eq!(max_depth, 50_000);
        assert_eq!(root_depth, 0);
        assert_eq!(last_depth, 50_000);
    }
}
