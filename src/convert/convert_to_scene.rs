//! Current conversion path: optimize the source graph, then convert it node by node.
//!
//! The source hierarchy is kept. Every state set becomes a [`SceneNode::StateGroup`]
//! around what it applies to, transforms become [`SceneNode::MatrixTransform`]s and
//! paged LODs keep their ranges as [`PagedLodTile`]s so the renderer can stream
//! the missing tiles. Defines and transparency are inherited down the graph through
//! a state stack.

use std::{collections::BTreeSet, rc::Rc};

use log::{debug, warn};

use crate::{
    convert::{geometry::convert_geometry, optimize, state::StateConverter},
    data_structures::{
        scene::{BoundingSphere, MaterialState, PagedLod, PagedLodTile, SceneNode},
        source::{Drawable, Node, NodeKind, PagedRange, SharedStateSet},
    },
    options::BuildOptions,
    resources::ImageReader,
};

/// Bin transparent geometry is sorted into.
pub const TRANSPARENT_BIN: i32 = 10;

/// What a node inherits from the state sets above it.
#[derive(Clone, Debug, Default)]
struct InheritedState {
    defines: BTreeSet<String>,
    transparent: bool,
}

pub struct ConvertToScene<'a> {
    build_options: &'a BuildOptions,
    states: StateConverter<'a>,
    state_stack: Vec<InheritedState>,
    /// Paged LODs met by the last conversion.
    pub num_paged_lod: u32,
}

impl<'a> ConvertToScene<'a> {
    pub fn new(build_options: &'a BuildOptions, reader: &'a dyn ImageReader) -> Self {
        Self {
            build_options,
            states: StateConverter::new(build_options, reader, build_options.search_paths()),
            state_stack: Vec::new(),
            num_paged_lod: 0,
        }
    }

    /// Prune and triangulate the source graph before [`ConvertToScene::convert`].
    pub fn optimize(&self, root: &Rc<Node>) -> Option<Rc<Node>> {
        optimize::optimize(root)
    }

    pub fn convert(&mut self, root: &Node) -> Option<SceneNode> {
        self.num_paged_lod = 0;
        self.state_stack.clear();
        self.state_stack.push(InheritedState::default());
        let converted = self.convert_node(root);
        debug!("Converted scene graph with {} paged LODs", self.num_paged_lod);
        converted
    }

    fn inherited(&self) -> InheritedState {
        self.state_stack.last().cloned().unwrap_or_default()
    }

    fn push_state(&mut self, state_set: &SharedStateSet) -> Rc<MaterialState> {
        let state = self.states.convert_state_set(state_set);
        let mut inherited = self.inherited();
        inherited.defines.extend(state.defines.iter().cloned());
        inherited.transparent |= state.transparent;
        self.state_stack.push(inherited);
        state
    }

    /// Run `convert` with `state_set` pushed, wrapping the result in its state group.
    fn with_state<F>(&mut self, state_set: Option<&SharedStateSet>, convert: F) -> Option<SceneNode>
    where
        F: FnOnce(&mut Self) -> Option<SceneNode>,
    {
        let Some(state_set) = state_set else {
            return convert(self);
        };
        let state = self.push_state(state_set);
        let converted = convert(self);
        self.state_stack.pop();
        let child = converted?;
        let transparent = state.transparent;
        let group = SceneNode::StateGroup {
            state,
            children: vec![child],
        };
        Some(self.depth_sorted(group, transparent))
    }

    fn depth_sorted(&self, node: SceneNode, transparent: bool) -> SceneNode {
        if !(transparent && self.build_options.use_depth_sorted) {
            return node;
        }
        match node.bound() {
            Some(bound) => SceneNode::DepthSorted {
                bin: TRANSPARENT_BIN,
                bound,
                child: Box::new(node),
            },
            None => node,
        }
    }

    fn cull_group(&self, node: SceneNode) -> SceneNode {
        if !self.build_options.insert_cull_groups {
            return node;
        }
        match node.bound() {
            Some(bound) => SceneNode::CullGroup {
                bound,
                children: vec![node],
            },
            None => node,
        }
    }

    fn convert_node(&mut self, node: &Node) -> Option<SceneNode> {
        self.with_state(node.state_set.as_ref(), |this| match &node.kind {
            NodeKind::Group { children } => {
                let mut children = this.convert_children(children);
                match children.len() {
                    0 => None,
                    1 => children.pop(),
                    _ => Some(this.cull_group(SceneNode::Group { children })),
                }
            }
            NodeKind::Transform { matrix, children } => {
                let children = this.convert_children(children);
                if children.is_empty() {
                    return None;
                }
                Some(this.cull_group(SceneNode::MatrixTransform {
                    matrix: *matrix,
                    children,
                }))
            }
            NodeKind::PagedLod {
                center,
                radius,
                ranges,
                children,
            } => Some(this.convert_paged_lod(*center, *radius, ranges, children)),
            NodeKind::Geode { drawables } => {
                let mut children = this.convert_drawables(drawables);
                match children.len() {
                    0 => None,
                    1 => children.pop(),
                    _ => Some(SceneNode::Group { children }),
                }
            }
        })
    }

    fn convert_children(&mut self, children: &[Rc<Node>]) -> Vec<SceneNode> {
        children
            .iter()
            .filter_map(|child| self.convert_node(child))
            .collect()
    }

    fn convert_drawables(&mut self, drawables: &[Rc<Drawable>]) -> Vec<SceneNode> {
        drawables
            .iter()
            .filter_map(|drawable| self.convert_drawable(drawable))
            .collect()
    }

    fn convert_drawable(&mut self, drawable: &Drawable) -> Option<SceneNode> {
        self.with_state(drawable.state_set.as_ref(), |this| {
            let inherited = this.inherited();
            let geometry = convert_geometry(
                &drawable.geometry,
                &this.states,
                &inherited.defines,
                inherited.transparent,
            );
            if geometry.is_none() {
                debug!("Skipping drawable '{}': nothing to draw", drawable.name);
            }
            geometry.map(SceneNode::Geometry)
        })
    }

    fn convert_paged_lod(
        &mut self,
        center: [f64; 3],
        radius: f64,
        ranges: &[PagedRange],
        children: &[Rc<Node>],
    ) -> SceneNode {
        self.num_paged_lod += 1;
        if children.len() > ranges.len() {
            warn!(
                "Paged LOD has {} children for {} ranges, ignoring the rest",
                children.len(),
                ranges.len()
            );
        }
        let tiles: Vec<_> = ranges
            .iter()
            .enumerate()
            .map(|(i, range)| PagedLodTile {
                min_range: range.min,
                max_range: range.max,
                file_name: range.file_name.clone(),
                node: children.get(i).and_then(|child| self.convert_node(child)),
            })
            .collect();
        // a negative radius asks for the bound of the loaded tiles
        let bound = if radius >= 0.0 {
            BoundingSphere { center, radius }
        } else {
            tiles
                .iter()
                .filter_map(|tile| tile.node.as_ref().and_then(SceneNode::bound))
                .reduce(|a, b| a.merge(&b))
                .unwrap_or(BoundingSphere {
                    center,
                    radius: 0.0,
                })
        };
        SceneNode::PagedLod(PagedLod { bound, tiles })
    }
}
