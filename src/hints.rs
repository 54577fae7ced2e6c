//! Resource hints for scenes that stream paged LOD tiles.
//!
//! The renderer sizes its descriptor and memory pools up front. A converted scene
//! only holds the tiles loaded so far, so its requirements are scaled by the number
//! of tiles that may be resident below a single paged LOD at once.

use std::{collections::HashSet, rc::Rc};

use log::debug;

use crate::data_structures::scene::{
    MaterialState, RESOURCE_HINTS_KEY, SceneNode, SceneObject, SceneRoot,
};

/// Deepest paging level assumed when estimating tiles.
pub const MAX_PAGING_LEVEL: u32 = 20;
/// Children per tile of a quad tree paging scheme.
pub const PAGING_BRANCHING: u32 = 4;
/// Upper bound of the estimated tiles below one paged LOD.
pub const MAX_TILES_BELOW: u32 = 1024;

/// `min(sum of branching^level for level in 0..max_level, max_tiles) + 1`.
pub fn tile_multiplier(max_level: u32, branching: u32, max_tiles: u32) -> u32 {
    let mut estimated: u64 = 0;
    let mut tiles_on_level: u64 = 1;
    for _ in 0..max_level {
        estimated = estimated.saturating_add(tiles_on_level);
        if estimated >= max_tiles as u64 {
            break;
        }
        tiles_on_level = tiles_on_level.saturating_mul(branching as u64);
    }
    u32::try_from(estimated.min(max_tiles as u64))
        .unwrap_or(u32::MAX)
        .saturating_add(1)
}

/// Multiplier used for converted scenes.
pub fn default_tile_multiplier() -> u32 {
    tile_multiplier(MAX_PAGING_LEVEL, PAGING_BRANCHING, MAX_TILES_BELOW)
}

/// Counts gathered from a converted scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceRequirements {
    pub num_descriptor_sets: u32,
    pub num_sampled_textures: u32,
    pub num_samplers: u32,
    pub num_uniform_buffers: u32,
    pub num_pipelines: u32,
    pub vertex_memory: u64,
    pub index_memory: u64,
    pub image_memory: u64,
    pub num_paged_lods: u32,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.num_descriptor_sets == 0
            && self.vertex_memory == 0
            && self.index_memory == 0
            && self.image_memory == 0
    }

    /// Requirements scaled by `multiplier`. `None` when there is nothing to scale
    /// or a count overflows.
    pub fn create_resource_hints(&self, multiplier: u32) -> Option<ResourceHints> {
        if self.is_empty() {
            return None;
        }
        let m = multiplier as u64;
        Some(ResourceHints {
            tile_multiplier: multiplier,
            num_descriptor_sets: self.num_descriptor_sets.checked_mul(multiplier)?,
            num_sampled_textures: self.num_sampled_textures.checked_mul(multiplier)?,
            num_samplers: self.num_samplers.checked_mul(multiplier)?,
            num_uniform_buffers: self.num_uniform_buffers.checked_mul(multiplier)?,
            vertex_memory: self.vertex_memory.checked_mul(m)?,
            index_memory: self.index_memory.checked_mul(m)?,
            image_memory: self.image_memory.checked_mul(m)?,
        })
    }
}

/// Pool sizes the renderer should reserve before streaming starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceHints {
    pub tile_multiplier: u32,
    pub num_descriptor_sets: u32,
    pub num_sampled_textures: u32,
    pub num_samplers: u32,
    pub num_uniform_buffers: u32,
    pub vertex_memory: u64,
    pub index_memory: u64,
    pub image_memory: u64,
}

/// Walks a converted scene and sums what the renderer has to allocate for it.
/// State and images shared between nodes are counted once.
#[derive(Default)]
pub struct CollectResourceRequirements {
    requirements: ResourceRequirements,
    states: HashSet<*const MaterialState>,
    images: HashSet<*const u8>,
    pipelines: HashSet<*const u8>,
}

impl CollectResourceRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(mut self, root: &SceneNode) -> ResourceRequirements {
        root.walk(&mut |node: &SceneNode| self.apply(node));
        self.requirements
    }

    fn apply(&mut self, node: &SceneNode) {
        match node {
            SceneNode::StateGroup { state, .. } => self.apply_state(state),
            SceneNode::Geometry(geometry) => {
                self.requirements.vertex_memory += geometry.vertex_bytes();
                self.requirements.index_memory += geometry.index_bytes();
                if self
                    .pipelines
                    .insert(Rc::as_ptr(&geometry.pipeline) as *const u8)
                {
                    self.requirements.num_pipelines += 1;
                }
            }
            SceneNode::PagedLod(_) => self.requirements.num_paged_lods += 1,
            SceneNode::Group { .. }
            | SceneNode::MatrixTransform { .. }
            | SceneNode::CullGroup { .. }
            | SceneNode::DepthSorted { .. } => {}
        }
    }

    fn apply_state(&mut self, state: &Rc<MaterialState>) {
        if !self.states.insert(Rc::as_ptr(state)) {
            return;
        }
        self.requirements.num_descriptor_sets += 1;
        // material parameters
        self.requirements.num_uniform_buffers += 1;
        for binding in state.textures.values() {
            self.requirements.num_sampled_textures += 1;
            self.requirements.num_samplers += 1;
            if self.images.insert(Rc::as_ptr(&binding.image) as *const u8) {
                self.requirements.image_memory += binding.image.data.len() as u64;
            }
        }
    }
}

/// Collect the requirements of `scene`, scale them by [`default_tile_multiplier`]
/// and store the result under [`RESOURCE_HINTS_KEY`].
pub fn attach_resource_hints(scene: &mut SceneRoot) -> Option<ResourceHints> {
    let requirements = CollectResourceRequirements::new().collect(&scene.node);
    debug!("Scene resource requirements: {requirements:?}");
    let hints = requirements.create_resource_hints(default_tile_multiplier())?;
    scene.set_object(RESOURCE_HINTS_KEY, SceneObject::ResourceHints(hints));
    Some(hints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_quad_trees_hit_the_cap() {
        assert_eq!(tile_multiplier(20, 4, 1024), 1025);
        assert_eq!(default_tile_multiplier(), 1025);
    }

    #[test]
    fn unbounded_caps_saturate() {
        assert_eq!(tile_multiplier(20, 4, u32::MAX), u32::MAX);
        assert_eq!(tile_multiplier(u32::MAX, u32::MAX, u32::MAX), u32::MAX);
    }

    #[test]
    fn shallow_trees_sum_every_level() {
        // 1 + 4 + 16
        assert_eq!(tile_multiplier(3, 4, 1024), 22);
        assert_eq!(tile_multiplier(0, 4, 1024), 1);
        assert_eq!(tile_multiplier(5, 1, 1024), 6);
    }

    #[test]
    fn hints_scale_the_baseline() {
        let baseline = ResourceRequirements {
            num_descriptor_sets: 2,
            num_sampled_textures: 3,
            num_samplers: 3,
            num_uniform_buffers: 2,
            vertex_memory: 100,
            image_memory: 64,
            ..Default::default()
        };
        let hints = baseline.create_resource_hints(1025).unwrap();
        assert_eq!(hints.num_descriptor_sets, 2050);
        assert_eq!(hints.num_sampled_textures, 3075);
        assert_eq!(hints.vertex_memory, 102_500);
        assert_eq!(hints.image_memory, 65_600);
        assert_eq!(hints.index_memory, 0);
    }

    #[test]
    fn empty_or_overflowing_baselines_give_no_hints() {
        assert_eq!(ResourceRequirements::default().create_resource_hints(1025), None);
        let huge = ResourceRequirements {
            num_descriptor_sets: u32::MAX,
            ..Default::default()
        };
        assert_eq!(huge.create_resource_hints(2), None);
    }
}
