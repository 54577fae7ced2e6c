//! Legacy conversion path.
//!
//! Optimizes and converts in one pass. Transforms are flattened into the drawables
//! below them and drawables are batched by their accumulated transform and state
//! chain, so the output is a flat group of batches:
//! `Group -> MatrixTransform -> StateGroup.. -> Geometry`. The matrix transform is
//! left out for batches in world space. Paged LODs are not streamed; only their
//! loaded children are converted.

use std::{collections::BTreeSet, rc::Rc};

use cgmath::{Matrix4, SquareMatrix};
use log::{debug, warn};

use crate::{
    convert::{geometry::convert_geometry, optimize::optimize, state::StateConverter},
    data_structures::{
        scene::{MaterialState, SceneNode},
        source::{Drawable, Node, NodeKind, SharedStateSet},
    },
    options::BuildOptions,
    resources::ImageReader,
};

struct Batch {
    matrix: Matrix4<f64>,
    states: Vec<SharedStateSet>,
    drawables: Vec<Rc<Drawable>>,
}

impl Batch {
    fn matches(&self, matrix: &Matrix4<f64>, states: &[SharedStateSet]) -> bool {
        self.matrix == *matrix
            && self.states.len() == states.len()
            && self
                .states
                .iter()
                .zip(states)
                .all(|(a, b)| Rc::ptr_eq(a, b))
    }
}

pub struct SceneBuilder<'a> {
    states: StateConverter<'a>,
    batches: Vec<Batch>,
    pub num_paged_lod: u32,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(build_options: &'a BuildOptions, reader: &'a dyn ImageReader) -> Self {
        Self {
            states: StateConverter::new(build_options, reader, build_options.search_paths()),
            batches: Vec::new(),
            num_paged_lod: 0,
        }
    }

    pub fn optimize_and_convert(&mut self, root: &Rc<Node>) -> Option<SceneNode> {
        self.batches.clear();
        self.num_paged_lod = 0;
        let root = optimize(root)?;
        let mut states = Vec::new();
        self.collect(&root, Matrix4::identity(), &mut states);
        debug!("Batched drawables into {} batches", self.batches.len());

        let batches = std::mem::take(&mut self.batches);
        let children: Vec<_> = batches
            .iter()
            .filter_map(|batch| self.convert_batch(batch))
            .collect();
        if children.is_empty() {
            return None;
        }
        Some(SceneNode::Group { children })
    }

    fn collect(&mut self, node: &Node, matrix: Matrix4<f64>, states: &mut Vec<SharedStateSet>) {
        let pushed = push_state(states, node.state_set.as_ref());
        match &node.kind {
            NodeKind::Group { children } => {
                for child in children {
                    self.collect(child, matrix, states);
                }
            }
            NodeKind::Transform {
                matrix: local,
                children,
            } => {
                let matrix = matrix * Matrix4::from(*local);
                for child in children {
                    self.collect(child, matrix, states);
                }
            }
            NodeKind::PagedLod { children, .. } => {
                self.num_paged_lod += 1;
                warn!("Paged LOD flattened into its {} loaded children", children.len());
                for child in children {
                    self.collect(child, matrix, states);
                }
            }
            NodeKind::Geode { drawables } => {
                for drawable in drawables {
                    let pushed = push_state(states, drawable.state_set.as_ref());
                    self.add_to_batch(matrix, states, drawable.clone());
                    if pushed {
                        states.pop();
                    }
                }
            }
        }
        if pushed {
            states.pop();
        }
    }

    fn add_to_batch(
        &mut self,
        matrix: Matrix4<f64>,
        states: &[SharedStateSet],
        drawable: Rc<Drawable>,
    ) {
        match self
            .batches
            .iter_mut()
            .find(|batch| batch.matches(&matrix, states))
        {
            Some(batch) => batch.drawables.push(drawable),
            None => self.batches.push(Batch {
                matrix,
                states: states.to_vec(),
                drawables: vec![drawable],
            }),
        }
    }

    fn convert_batch(&mut self, batch: &Batch) -> Option<SceneNode> {
        let states: Vec<Rc<MaterialState>> = batch
            .states
            .iter()
            .map(|state_set| self.states.convert_state_set(state_set))
            .collect();
        let defines: BTreeSet<String> = states
            .iter()
            .flat_map(|state| state.defines.iter().cloned())
            .collect();
        let transparent = states.iter().any(|state| state.transparent);

        let mut node = {
            let mut geometries: Vec<_> = batch
                .drawables
                .iter()
                .filter_map(|drawable| {
                    convert_geometry(&drawable.geometry, &self.states, &defines, transparent)
                })
                .map(SceneNode::Geometry)
                .collect();
            match geometries.len() {
                0 => return None,
                1 => geometries.pop()?,
                _ => SceneNode::Group {
                    children: geometries,
                },
            }
        };
        for state in states.into_iter().rev() {
            node = SceneNode::StateGroup {
                state,
                children: vec![node],
            };
        }
        if batch.matrix != Matrix4::identity() {
            node = SceneNode::MatrixTransform {
                matrix: batch.matrix.into(),
                children: vec![node],
            };
        }
        Some(node)
    }
}

/// Push `state_set` unless it is already the innermost state. Returns whether it was pushed.
fn push_state(states: &mut Vec<SharedStateSet>, state_set: Option<&SharedStateSet>) -> bool {
    match state_set {
        Some(state_set) if !states.last().is_some_and(|last| Rc::ptr_eq(last, state_set)) => {
            states.push(state_set.clone());
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::source::StateSet;

    #[test]
    fn repeated_state_is_pushed_once() {
        let state = StateSet::new().shared();
        let mut states = Vec::new();
        assert!(push_state(&mut states, Some(&state)));
        assert!(!push_state(&mut states, Some(&state)));
        assert!(!push_state(&mut states, None));
        assert_eq!(states.len(), 1);
    }
}
