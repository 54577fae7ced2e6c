//! Source scene graph.
//!
//! The hierarchy the converter reads from: groups, transforms, paged LODs and
//! geodes holding drawables. Nodes, drawables and state sets are reference counted
//! because the source representation allows sharing them between several parents.
//! A shared [`StateSet`] is the same object wherever it appears, which is what the
//! texture augmentation relies on to process it only once.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use log::warn;

use crate::data_structures::array::SourceArray;

pub type SharedStateSet = Rc<RefCell<StateSet>>;

/// Wrap mode of one texture axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    Clamp,
    #[default]
    ClampToEdge,
    ClampToBorder,
    Repeat,
    Mirror,
}

/// Minification or magnification filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

/// Pixel layout of a [`SourceImage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Luminance,
    LuminanceAlpha,
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    CompressedRgbS3tcDxt1,
    CompressedRgbaS3tcDxt1,
    CompressedRgbaS3tcDxt3,
    CompressedRgbaS3tcDxt5,
    /// Raw format code the converter does not know.
    Other(u32),
}

/// Component type of a [`SourceImage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    UnsignedByte,
    UnsignedShort,
    Float,
    Other(u32),
}

/// Pixel buffer with the path it was read from.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub pixel_format: PixelFormat,
    pub data_type: DataType,
    pub data: Vec<u8>,
    /// Byte offsets of mip levels 1.. into `data`. Level 0 starts at 0.
    pub mipmap_offsets: Vec<usize>,
}

impl SourceImage {
    pub fn new(
        file_name: impl Into<String>,
        width: u32,
        height: u32,
        pixel_format: PixelFormat,
        data_type: DataType,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            width,
            height,
            depth: 1,
            pixel_format,
            data_type,
            data,
            mipmap_offsets: Vec::new(),
        }
    }

    /// An image that only knows where it lives; pixels are resolved at conversion.
    pub fn from_file_name(file_name: impl Into<String>) -> Self {
        Self::new(
            file_name,
            0,
            0,
            PixelFormat::Rgba,
            DataType::UnsignedByte,
            Vec::new(),
        )
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.depth > 0 && !self.data.is_empty()
    }

    pub fn num_mipmap_levels(&self) -> u32 {
        self.mipmap_offsets.len() as u32 + 1
    }
}

/// A 2D texture attribute: an image plus its sampler settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture2D {
    pub image: Option<Rc<SourceImage>>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub wrap_r: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub max_anisotropy: f32,
}

impl Default for Texture2D {
    fn default() -> Self {
        Self {
            image: None,
            wrap_s: WrapMode::ClampToEdge,
            wrap_t: WrapMode::ClampToEdge,
            wrap_r: WrapMode::ClampToEdge,
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
            max_anisotropy: 1.0,
        }
    }
}

impl Texture2D {
    pub fn new(image: Rc<SourceImage>) -> Self {
        Self {
            image: Some(image),
            ..Default::default()
        }
    }

    /// A texture for `image` using the wrap, filter and anisotropy settings of `self`.
    pub fn with_sampler_of(&self, image: Rc<SourceImage>) -> Self {
        Self {
            image: Some(image),
            wrap_s: self.wrap_s,
            wrap_t: self.wrap_t,
            wrap_r: self.wrap_r,
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            max_anisotropy: self.max_anisotropy,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderingHint {
    #[default]
    Default,
    Opaque,
    Transparent,
}

/// Material state attached to a node or drawable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateSet {
    textures: BTreeMap<u32, Texture2D>,
    user_values: BTreeMap<String, bool>,
    pub rendering_hint: RenderingHint,
}

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedStateSet {
        Rc::new(RefCell::new(self))
    }

    pub fn texture(&self, unit: u32) -> Option<&Texture2D> {
        self.textures.get(&unit)
    }

    pub fn set_texture(&mut self, unit: u32, texture: Texture2D) {
        self.textures.insert(unit, texture);
    }

    pub fn textures(&self) -> impl Iterator<Item = (u32, &Texture2D)> {
        self.textures.iter().map(|(unit, texture)| (*unit, texture))
    }

    pub fn user_value(&self, name: &str) -> Option<bool> {
        self.user_values.get(name).copied()
    }

    pub fn set_user_value(&mut self, name: impl Into<String>, value: bool) {
        self.user_values.insert(name.into(), value);
    }

    pub fn user_values(&self) -> impl Iterator<Item = (&str, bool)> {
        self.user_values
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    /// Image file name of the texture bound at `unit`, if any.
    pub fn texture_file_name(&self, unit: u32) -> Option<&str> {
        self.texture(unit)
            .and_then(|texture| texture.image.as_deref())
            .map(|image| image.file_name.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// How the vertices of a primitive set are assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveSet {
    DrawArrays {
        mode: PrimitiveMode,
        first: u32,
        count: u32,
    },
    DrawElementsUByte {
        mode: PrimitiveMode,
        indices: Vec<u8>,
    },
    DrawElementsUShort {
        mode: PrimitiveMode,
        indices: Vec<u16>,
    },
    DrawElementsUInt {
        mode: PrimitiveMode,
        indices: Vec<u32>,
    },
}

impl PrimitiveSet {
    pub fn mode(&self) -> PrimitiveMode {
        match self {
            Self::DrawArrays { mode, .. }
            | Self::DrawElementsUByte { mode, .. }
            | Self::DrawElementsUShort { mode, .. }
            | Self::DrawElementsUInt { mode, .. } => *mode,
        }
    }

    pub fn num_indices(&self) -> usize {
        match self {
            Self::DrawArrays { count, .. } => *count as usize,
            Self::DrawElementsUByte { indices, .. } => indices.len(),
            Self::DrawElementsUShort { indices, .. } => indices.len(),
            Self::DrawElementsUInt { indices, .. } => indices.len(),
        }
    }

    /// Vertex indices of the set, widened to `u32`. Empty when a draw range runs
    /// past `u32::MAX`.
    pub fn indices(&self) -> Vec<u32> {
        match self {
            Self::DrawArrays { first, count, .. } => match first.checked_add(*count) {
                Some(end) => (*first..end).collect(),
                None => {
                    warn!("Draw range {first}+{count} overflows the index type");
                    Vec::new()
                }
            },
            Self::DrawElementsUByte { indices, .. } => indices.iter().map(|&i| i as u32).collect(),
            Self::DrawElementsUShort { indices, .. } => {
                indices.iter().map(|&i| i as u32).collect()
            }
            Self::DrawElementsUInt { indices, .. } => indices.clone(),
        }
    }
}

/// Vertex arrays and the primitive sets drawing them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Option<SourceArray>,
    pub normals: Option<SourceArray>,
    pub colors: Option<SourceArray>,
    pub tex_coords: Vec<SourceArray>,
    pub primitive_sets: Vec<PrimitiveSet>,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.vertices.as_ref().is_none_or(SourceArray::is_empty)
            || self.primitive_sets.iter().all(|set| set.num_indices() == 0)
    }
}

/// A leaf drawable with optional state of its own.
#[derive(Clone, Debug, Default)]
pub struct Drawable {
    pub name: String,
    pub state_set: Option<SharedStateSet>,
    pub geometry: Geometry,
}

impl Drawable {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            ..Default::default()
        }
    }

    pub fn with_state_set(mut self, state_set: SharedStateSet) -> Self {
        self.state_set = Some(state_set);
        self
    }
}

/// One entry of a paged LOD: the visible range and the file streaming the child in.
#[derive(Clone, Debug, PartialEq)]
pub struct PagedRange {
    pub min: f32,
    pub max: f32,
    pub file_name: String,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group {
        children: Vec<Rc<Node>>,
    },
    /// Column-major local matrix.
    Transform {
        matrix: [[f64; 4]; 4],
        children: Vec<Rc<Node>>,
    },
    PagedLod {
        center: [f64; 3],
        radius: f64,
        ranges: Vec<PagedRange>,
        /// Children already loaded; index `i` belongs to `ranges[i]`.
        children: Vec<Rc<Node>>,
    },
    Geode {
        drawables: Vec<Rc<Drawable>>,
    },
}

/// A node of the source graph.
#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub state_set: Option<SharedStateSet>,
    pub kind: NodeKind,
}

impl Node {
    pub fn group(children: Vec<Rc<Node>>) -> Self {
        Self::from_kind(NodeKind::Group { children })
    }

    pub fn transform(matrix: [[f64; 4]; 4], children: Vec<Rc<Node>>) -> Self {
        Self::from_kind(NodeKind::Transform { matrix, children })
    }

    pub fn geode(drawables: Vec<Rc<Drawable>>) -> Self {
        Self::from_kind(NodeKind::Geode { drawables })
    }

    pub fn paged_lod(
        center: [f64; 3],
        radius: f64,
        ranges: Vec<PagedRange>,
        children: Vec<Rc<Node>>,
    ) -> Self {
        Self::from_kind(NodeKind::PagedLod {
            center,
            radius,
            ranges,
            children,
        })
    }

    pub fn from_kind(kind: NodeKind) -> Self {
        Self {
            name: String::new(),
            state_set: None,
            kind,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_state_set(mut self, state_set: SharedStateSet) -> Self {
        self.state_set = Some(state_set);
        self
    }

    /// Child nodes. Geodes have drawables instead and return an empty slice.
    pub fn children(&self) -> &[Rc<Node>] {
        match &self.kind {
            NodeKind::Group { children }
            | NodeKind::Transform { children, .. }
            | NodeKind::PagedLod { children, .. } => children,
            NodeKind::Geode { .. } => &[],
        }
    }

    /// Dispatch to the visitor method matching this node's category.
    pub fn accept<V: NodeVisitor + ?Sized>(&self, visitor: &mut V) {
        match &self.kind {
            NodeKind::Geode { drawables } => visitor.apply_geode(self, drawables),
            _ => visitor.apply_node(self),
        }
    }
}

/// Visitor over the source graph with one method per node category.
///
/// The defaults traverse every child and every drawable, so an implementation only
/// overrides the categories it cares about and calls [`NodeVisitor::traverse`] to
/// keep descending.
pub trait NodeVisitor {
    fn apply_node(&mut self, node: &Node) {
        self.traverse(node);
    }

    fn apply_geode(&mut self, _geode: &Node, drawables: &[Rc<Drawable>]) {
        for drawable in drawables {
            self.apply_drawable(drawable);
        }
    }

    fn apply_drawable(&mut self, _drawable: &Drawable) {}

    fn traverse(&mut self, node: &Node) {
        for child in node.children() {
            child.accept(self);
        }
    }
}
