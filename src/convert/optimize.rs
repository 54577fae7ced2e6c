//! Source graph clean up run before conversion.
//!
//! Empty groups, geodes and geometries are pruned and triangle fans and quads are
//! rewritten as triangle lists. Paged LODs are never pruned since their children
//! are streamed in later. Subgraphs shared in the input stay shared in the output
//! and untouched nodes are returned as the same `Rc`.

use std::{collections::HashMap, rc::Rc};

use log::debug;

use crate::{
    convert::geometry::triangulate,
    data_structures::source::{Drawable, Node, NodeKind, PrimitiveMode},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub nodes_pruned: usize,
    pub drawables_pruned: usize,
    pub primitive_sets_triangulated: usize,
}

#[derive(Default)]
pub struct Optimizer {
    nodes: HashMap<*const Node, Option<Rc<Node>>>,
    drawables: HashMap<*const Drawable, Option<Rc<Drawable>>>,
    stats: OptimizeStats,
}

/// Optimize the graph below `root`. `None` when nothing drawable is left.
pub fn optimize(root: &Rc<Node>) -> Option<Rc<Node>> {
    let mut optimizer = Optimizer::new();
    let optimized = optimizer.optimize(root);
    debug!("Optimized scene graph: {:?}", optimizer.stats());
    optimized
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> OptimizeStats {
        self.stats
    }

    pub fn optimize(&mut self, node: &Rc<Node>) -> Option<Rc<Node>> {
        let key = Rc::as_ptr(node);
        if let Some(done) = self.nodes.get(&key) {
            return done.clone();
        }
        let optimized = self.optimize_node(node);
        if optimized.is_none() {
            self.stats.nodes_pruned += 1;
        }
        self.nodes.insert(key, optimized.clone());
        optimized
    }

    fn optimize_node(&mut self, node: &Rc<Node>) -> Option<Rc<Node>> {
        let kind = match &node.kind {
            NodeKind::Group { children } => {
                let (children, changed) = self.optimize_children(children)?;
                if !changed {
                    return Some(node.clone());
                }
                NodeKind::Group { children }
            }
            NodeKind::Transform { matrix, children } => {
                let (children, changed) = self.optimize_children(children)?;
                if !changed {
                    return Some(node.clone());
                }
                NodeKind::Transform {
                    matrix: *matrix,
                    children,
                }
            }
            NodeKind::PagedLod {
                center,
                radius,
                ranges,
                children,
            } => {
                // keep one child per range, even when it is empty
                let mut changed = false;
                let children = children
                    .iter()
                    .map(|child| match self.optimize(child) {
                        Some(optimized) => {
                            changed |= !Rc::ptr_eq(&optimized, child);
                            optimized
                        }
                        None => {
                            changed = true;
                            Rc::new(Node::group(Vec::new()))
                        }
                    })
                    .collect();
                if !changed {
                    return Some(node.clone());
                }
                NodeKind::PagedLod {
                    center: *center,
                    radius: *radius,
                    ranges: ranges.clone(),
                    children,
                }
            }
            NodeKind::Geode { drawables } => {
                let mut changed = false;
                let mut kept = Vec::with_capacity(drawables.len());
                for drawable in drawables {
                    match self.optimize_drawable(drawable) {
                        Some(optimized) => {
                            changed |= !Rc::ptr_eq(&optimized, drawable);
                            kept.push(optimized);
                        }
                        None => changed = true,
                    }
                }
                if kept.is_empty() {
                    return None;
                }
                if !changed {
                    return Some(node.clone());
                }
                NodeKind::Geode { drawables: kept }
            }
        };
        Some(Rc::new(Node {
            name: node.name.clone(),
            state_set: node.state_set.clone(),
            kind,
        }))
    }

    /// Optimized children and whether any of them changed. `None` when all were pruned.
    fn optimize_children(&mut self, children: &[Rc<Node>]) -> Option<(Vec<Rc<Node>>, bool)> {
        let mut changed = false;
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match self.optimize(child) {
                Some(optimized) => {
                    changed |= !Rc::ptr_eq(&optimized, child);
                    kept.push(optimized);
                }
                None => changed = true,
            }
        }
        if kept.is_empty() {
            None
        } else {
            Some((kept, changed))
        }
    }

    fn optimize_drawable(&mut self, drawable: &Rc<Drawable>) -> Option<Rc<Drawable>> {
        let key = Rc::as_ptr(drawable);
        if let Some(done) = self.drawables.get(&key) {
            return done.clone();
        }
        let optimized = self.optimize_drawable_uncached(drawable);
        if optimized.is_none() {
            self.stats.drawables_pruned += 1;
        }
        self.drawables.insert(key, optimized.clone());
        optimized
    }

    fn optimize_drawable_uncached(&mut self, drawable: &Rc<Drawable>) -> Option<Rc<Drawable>> {
        let geometry = &drawable.geometry;
        if geometry.is_empty() {
            return None;
        }
        let needs_triangulation =
            |mode: PrimitiveMode| matches!(mode, PrimitiveMode::TriangleFan | PrimitiveMode::Quads);
        let has_empty_sets = geometry
            .primitive_sets
            .iter()
            .any(|set| set.num_indices() == 0);
        let has_polygons = geometry
            .primitive_sets
            .iter()
            .any(|set| needs_triangulation(set.mode()));
        if !has_empty_sets && !has_polygons {
            return Some(drawable.clone());
        }

        let mut optimized = Drawable::clone(drawable);
        optimized.geometry.primitive_sets = geometry
            .primitive_sets
            .iter()
            .filter(|set| set.num_indices() > 0)
            .map(|set| {
                if needs_triangulation(set.mode()) {
                    self.stats.primitive_sets_triangulated += 1;
                    triangulate(set)
                } else {
                    set.clone()
                }
            })
            .filter(|set| set.num_indices() > 0)
            .collect();
        if optimized.geometry.primitive_sets.is_empty() {
            return None;
        }
        Some(Rc::new(optimized))
    }
}
