#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::anyhow;
use flow_bridge::{
    data_structures::{
        array::SourceArray,
        source::{
            DataType, Drawable, Geometry, Node, PixelFormat, PrimitiveMode, PrimitiveSet,
            SharedStateSet, SourceImage, StateSet, Texture2D,
        },
    },
    resources::ImageReader,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory image store standing in for the filesystem.
#[derive(Default)]
pub struct FakeImageReader {
    images: RefCell<HashMap<PathBuf, SourceImage>>,
    reads: Cell<usize>,
}

impl FakeImageReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, path: impl Into<PathBuf>, image: SourceImage) -> Self {
        self.images.borrow_mut().insert(path.into(), image);
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl ImageReader for FakeImageReader {
    fn exists(&self, path: &Path) -> bool {
        self.images.borrow().contains_key(path)
    }

    fn read_image(&self, path: &Path) -> anyhow::Result<SourceImage> {
        self.reads.set(self.reads.get() + 1);
        self.images
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("no image at {}", path.display()))
    }
}

pub fn rgba_image(file_name: &str) -> SourceImage {
    SourceImage::new(
        file_name,
        2,
        2,
        PixelFormat::Rgba,
        DataType::UnsignedByte,
        vec![128; 16],
    )
}

pub fn rgb_image(file_name: &str) -> SourceImage {
    SourceImage::new(
        file_name,
        2,
        1,
        PixelFormat::Rgb,
        DataType::UnsignedByte,
        vec![10, 20, 30, 40, 50, 60],
    )
}

/// A state set with `file_name` bound as the diffuse texture.
pub fn textured_state(file_name: &str) -> SharedStateSet {
    let mut state = StateSet::new();
    state.set_texture(0, Texture2D::new(Rc::new(rgba_image(file_name))));
    state.shared()
}

pub fn triangle_geometry(offset: f32) -> Geometry {
    Geometry {
        vertices: Some(SourceArray::Vec3(vec![
            [offset, 0.0, 0.0],
            [offset + 1.0, 0.0, 0.0],
            [offset, 1.0, 0.0],
        ])),
        normals: Some(SourceArray::Vec3(vec![[0.0, 0.0, 1.0]; 3])),
        tex_coords: vec![SourceArray::Vec2(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]])],
        primitive_sets: vec![PrimitiveSet::DrawElementsUShort {
            mode: PrimitiveMode::Triangles,
            indices: vec![0, 1, 2],
        }],
        ..Default::default()
    }
}

pub fn triangle(state_set: Option<SharedStateSet>) -> Rc<Drawable> {
    let drawable = Drawable::new(triangle_geometry(0.0));
    Rc::new(match state_set {
        Some(state_set) => drawable.with_state_set(state_set),
        None => drawable,
    })
}

pub fn geode(drawables: Vec<Rc<Drawable>>) -> Rc<Node> {
    Rc::new(Node::geode(drawables))
}

pub fn translation(x: f64, y: f64, z: f64) -> [[f64; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [x, y, z, 1.0],
    ]
}
