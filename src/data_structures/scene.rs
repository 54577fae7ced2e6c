//! Renderer-facing scene graph.
//!
//! Everything in here is described in the renderer's own vocabulary: vertex
//! formats, texture formats, sampler modes and primitive topologies come straight
//! from `wgpu`, so the renderer can create its resources without interpreting the
//! source graph's conventions.

use std::{
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use cgmath::{InnerSpace, Matrix4, Point3, Transform, Vector3};

use crate::{data_structures::array::TypedArray, hints::ResourceHints};

/// Key under which [`ResourceHints`] are attached to a [`SceneRoot`].
pub const RESOURCE_HINTS_KEY: &str = "ResourceHints";

/// Layout of the bytes in an [`ImageData`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Bgr8,
    Bgra8,
    R16,
    Rg16,
    Rgb16,
    Rgba16,
    R32Float,
    Rg32Float,
    Rgb32Float,
    Rgba32Float,
    Bc1Rgb,
    Bc1Rgba,
    Bc2Rgba,
    Bc3Rgba,
}

impl DataFormat {
    pub fn channels(&self) -> u8 {
        match self {
            Self::R8 | Self::R16 | Self::R32Float => 1,
            Self::Rg8 | Self::Rg16 | Self::Rg32Float => 2,
            Self::Rgb8 | Self::Bgr8 | Self::Rgb16 | Self::Rgb32Float | Self::Bc1Rgb => 3,
            Self::Rgba8
            | Self::Bgra8
            | Self::Rgba16
            | Self::Rgba32Float
            | Self::Bc1Rgba
            | Self::Bc2Rgba
            | Self::Bc3Rgba => 4,
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            Self::Bc1Rgb | Self::Bc1Rgba | Self::Bc2Rgba | Self::Bc3Rgba
        )
    }

    /// Texture format the renderer samples this data as. Three channel layouts
    /// have no GPU equivalent.
    pub fn texture_format(&self) -> Option<wgpu::TextureFormat> {
        match self {
            Self::R8 => Some(wgpu::TextureFormat::R8Unorm),
            Self::Rg8 => Some(wgpu::TextureFormat::Rg8Unorm),
            Self::Rgba8 => Some(wgpu::TextureFormat::Rgba8Unorm),
            Self::Bgra8 => Some(wgpu::TextureFormat::Bgra8Unorm),
            Self::R16 => Some(wgpu::TextureFormat::R16Unorm),
            Self::Rg16 => Some(wgpu::TextureFormat::Rg16Unorm),
            Self::Rgba16 => Some(wgpu::TextureFormat::Rgba16Unorm),
            Self::R32Float => Some(wgpu::TextureFormat::R32Float),
            Self::Rg32Float => Some(wgpu::TextureFormat::Rg32Float),
            Self::Rgba32Float => Some(wgpu::TextureFormat::Rgba32Float),
            Self::Bc1Rgb | Self::Bc1Rgba => Some(wgpu::TextureFormat::Bc1RgbaUnorm),
            Self::Bc2Rgba => Some(wgpu::TextureFormat::Bc2RgbaUnorm),
            Self::Bc3Rgba => Some(wgpu::TextureFormat::Bc3RgbaUnorm),
            Self::Rgb8 | Self::Bgr8 | Self::Rgb16 | Self::Rgb32Float => None,
        }
    }
}

/// Pixel data blob produced by the image converter.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: DataFormat,
    pub data: Vec<u8>,
    /// Byte offsets of mip levels 1.. into `data`.
    pub mipmap_offsets: Vec<usize>,
}

impl ImageData {
    pub fn channels(&self) -> u8 {
        self.format.channels()
    }

    pub fn texture_format(&self) -> Option<wgpu::TextureFormat> {
        self.format.texture_format()
    }

    pub fn mip_level_count(&self) -> u32 {
        self.mipmap_offsets.len() as u32 + 1
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth,
        }
    }
}

/// Sampler settings in renderer terms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerState {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub address_mode_w: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::FilterMode,
    pub anisotropy_clamp: u16,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 1,
        }
    }
}

impl SamplerState {
    pub fn descriptor<'a>(&self, label: Option<&'a str>) -> wgpu::SamplerDescriptor<'a> {
        wgpu::SamplerDescriptor {
            label,
            address_mode_u: self.address_mode_u,
            address_mode_v: self.address_mode_v,
            address_mode_w: self.address_mode_w,
            mag_filter: self.mag_filter,
            min_filter: self.min_filter,
            mipmap_filter: match self.mipmap_filter {
                wgpu::FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
                wgpu::FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
            },
            anisotropy_clamp: self.anisotropy_clamp,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureBinding {
    pub image: Rc<ImageData>,
    pub sampler: SamplerState,
}

/// Converted material state: the texture bindings per unit and the shader
/// defines they switch on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialState {
    pub textures: BTreeMap<u32, TextureBinding>,
    pub defines: BTreeSet<String>,
    pub transparent: bool,
}

/// Everything needed to build a render pipeline. Shared between geometries
/// through the pipeline cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub defines: BTreeSet<String>,
    pub vertex_formats: Vec<wgpu::VertexFormat>,
    pub blending: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    /// Narrowest index buffer that can address every index.
    pub fn from_indices(indices: Vec<u32>) -> Self {
        if indices.iter().all(|&i| i <= u16::MAX as u32) {
            Self::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            Self::U32(indices)
        }
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            Self::U16(_) => wgpu::IndexFormat::Uint16,
            Self::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Draw {
    Arrays { first: u32, count: u32 },
    Indexed(IndexData),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    pub topology: wgpu::PrimitiveTopology,
    pub draw: Draw,
}

/// Vertex arrays in binding order plus the draws issued over them.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub arrays: Vec<TypedArray>,
    pub commands: Vec<DrawCommand>,
    pub pipeline: Rc<PipelineDescriptor>,
}

impl Geometry {
    pub fn vertex_bytes(&self) -> u64 {
        self.arrays
            .iter()
            .map(|array| array.as_bytes().len() as u64)
            .sum()
    }

    pub fn index_bytes(&self) -> u64 {
        self.commands
            .iter()
            .map(|command| match &command.draw {
                Draw::Indexed(indices) => indices.as_bytes().len() as u64,
                Draw::Arrays { .. } => 0,
            })
            .sum()
    }

    pub fn bound(&self) -> Option<BoundingSphere> {
        self.arrays
            .first()
            .and_then(TypedArray::positions)
            .and_then(|positions| BoundingSphere::from_points(&positions))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: [f64; 3],
    pub radius: f64,
}

impl BoundingSphere {
    /// Sphere around the axis aligned box of `points`.
    pub fn from_points(points: &[[f64; 3]]) -> Option<Self> {
        let first = points.first()?;
        let (min, max) = points.iter().fold((*first, *first), |(mut min, mut max), p| {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
            (min, max)
        });
        let min = Vector3::from(min);
        let max = Vector3::from(max);
        let center = (min + max) * 0.5;
        Some(Self {
            center: center.into(),
            radius: (max - center).magnitude(),
        })
    }

    /// Smallest sphere enclosing both.
    pub fn merge(&self, other: &Self) -> Self {
        let a = Vector3::from(self.center);
        let b = Vector3::from(other.center);
        let distance = (b - a).magnitude();
        if distance + other.radius <= self.radius {
            return *self;
        }
        if distance + self.radius <= other.radius {
            return *other;
        }
        let radius = (distance + self.radius + other.radius) * 0.5;
        let center = a + (b - a) * ((radius - self.radius) / distance);
        Self {
            center: center.into(),
            radius,
        }
    }

    /// The sphere moved into the space of a column-major `matrix`.
    pub fn transform(&self, matrix: &[[f64; 4]; 4]) -> Self {
        let matrix = Matrix4::from(*matrix);
        let center = matrix.transform_point(Point3::from(self.center));
        let scale = [matrix.x.truncate(), matrix.y.truncate(), matrix.z.truncate()]
            .iter()
            .map(|axis| axis.magnitude())
            .fold(0.0, f64::max);
        Self {
            center: center.into(),
            radius: self.radius * scale,
        }
    }
}

/// A streamed child of a [`PagedLod`].
#[derive(Clone, Debug, PartialEq)]
pub struct PagedLodTile {
    pub min_range: f32,
    pub max_range: f32,
    pub file_name: String,
    pub node: Option<SceneNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PagedLod {
    pub bound: BoundingSphere,
    pub tiles: Vec<PagedLodTile>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SceneNode {
    Group {
        children: Vec<SceneNode>,
    },
    MatrixTransform {
        matrix: [[f64; 4]; 4],
        children: Vec<SceneNode>,
    },
    StateGroup {
        state: Rc<MaterialState>,
        children: Vec<SceneNode>,
    },
    CullGroup {
        bound: BoundingSphere,
        children: Vec<SceneNode>,
    },
    /// Drawn after opaque geometry, back to front within `bin`.
    DepthSorted {
        bin: i32,
        bound: BoundingSphere,
        child: Box<SceneNode>,
    },
    PagedLod(PagedLod),
    Geometry(Geometry),
}

impl SceneNode {
    pub fn children(&self) -> Vec<&SceneNode> {
        match self {
            Self::Group { children }
            | Self::MatrixTransform { children, .. }
            | Self::StateGroup { children, .. }
            | Self::CullGroup { children, .. } => children.iter().collect(),
            Self::DepthSorted { child, .. } => vec![child.as_ref()],
            Self::PagedLod(lod) => lod.tiles.iter().filter_map(|t| t.node.as_ref()).collect(),
            Self::Geometry(_) => Vec::new(),
        }
    }

    /// Bounding sphere of everything below this node.
    pub fn bound(&self) -> Option<BoundingSphere> {
        match self {
            Self::Geometry(geometry) => geometry.bound(),
            Self::PagedLod(lod) => Some(lod.bound),
            Self::CullGroup { bound, .. } | Self::DepthSorted { bound, .. } => Some(*bound),
            Self::MatrixTransform { matrix, children } => children
                .iter()
                .filter_map(SceneNode::bound)
                .reduce(|a, b| a.merge(&b))
                .map(|bound| bound.transform(matrix)),
            Self::Group { children } | Self::StateGroup { children, .. } => children
                .iter()
                .filter_map(SceneNode::bound)
                .reduce(|a, b| a.merge(&b)),
        }
    }

    /// Depth first walk calling `f` on every node including `self`.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a SceneNode)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}

/// Objects the renderer looks up by key on the scene root.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneObject {
    ResourceHints(ResourceHints),
}

/// Result of a node graph conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneRoot {
    pub node: SceneNode,
    objects: BTreeMap<String, SceneObject>,
}

impl SceneRoot {
    pub fn new(node: SceneNode) -> Self {
        Self {
            node,
            objects: BTreeMap::new(),
        }
    }

    pub fn set_object(&mut self, key: impl Into<String>, object: SceneObject) {
        self.objects.insert(key.into(), object);
    }

    pub fn object(&self, key: &str) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn resource_hints(&self) -> Option<&ResourceHints> {
        match self.object(RESOURCE_HINTS_KEY)? {
            SceneObject::ResourceHints(hints) => Some(hints),
        }
    }
}
