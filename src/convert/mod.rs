/**
 * This module converts source scene graphs, images and arrays into the renderer's
 * scene representation.
 */
use std::{path::Path, rc::Rc, sync::Arc};

use log::{info, warn};

use crate::{
    augment::TextureAugmenter,
    data_structures::{
        array::{SourceArray, TypedArray},
        scene::{ImageData, SceneRoot},
        source::{Node, SourceImage},
    },
    hints::attach_resource_hints,
    options::{
        BuildOptions, ORIGINAL_CONVERTER, Options, PipelineCache, READ_BUILD_OPTIONS,
        WRITE_BUILD_OPTIONS,
    },
    resources::{FsImageReader, ImageReader},
};

pub mod array;
pub mod convert_to_scene;
pub mod geometry;
pub mod image;
pub mod optimize;
pub mod scene_builder;
pub mod state;

use convert_to_scene::ConvertToScene;
use scene_builder::SceneBuilder;

/// Convert an image, adding alpha to RGB data unless `options` turn the hint off.
pub fn convert_image(image: &SourceImage, options: Option<&Options>) -> Option<ImageData> {
    let hint = options.is_none_or(|options| options.map_rgb_to_rgba_hint);
    image::to_image_data(image, hint)
}

pub fn convert_array(array: &SourceArray, _options: Option<&Options>) -> Option<TypedArray> {
    array::to_typed_array(array)
}

/// Convert the graph below `root` read from `file_path`, loading companion
/// textures from the filesystem.
pub fn convert_node(
    root: &Rc<Node>,
    options: Option<Arc<Options>>,
    file_path: impl AsRef<Path>,
) -> Option<SceneRoot> {
    Converter::new(options).convert(root, file_path)
}

/// Runs a node graph conversion: build options, texture augmentation, one of the
/// two conversion paths and resource hints.
pub struct Converter<'r> {
    options: Option<Arc<Options>>,
    reader: &'r dyn ImageReader,
}

impl Converter<'static> {
    pub fn new(options: Option<Arc<Options>>) -> Self {
        Self {
            options,
            reader: &FsImageReader,
        }
    }
}

impl<'r> Converter<'r> {
    pub fn with_image_reader(options: Option<Arc<Options>>, reader: &'r dyn ImageReader) -> Self {
        Self { options, reader }
    }

    fn option_bool(&self, key: &str) -> bool {
        self.options
            .as_ref()
            .and_then(|options| options.get_bool(key))
            .unwrap_or(false)
    }

    fn option_string(&self, key: &str) -> Option<&str> {
        self.options.as_ref()?.get_string(key)
    }

    /// Build options from the file named by [`READ_BUILD_OPTIONS`], or defaults
    /// carrying the caller's RGB to RGBA hint. Written back to
    /// [`WRITE_BUILD_OPTIONS`] when set.
    pub fn resolve_build_options(&self) -> BuildOptions {
        let hint = self
            .options
            .as_ref()
            .is_none_or(|options| options.map_rgb_to_rgba_hint);
        let mut build_options = match self.option_string(READ_BUILD_OPTIONS) {
            Some(path) => BuildOptions::read(path).unwrap_or_else(|e| {
                warn!("Using default build options: {e:#}");
                BuildOptions::new(hint)
            }),
            None => BuildOptions::new(hint),
        };
        if let Some(path) = self.option_string(WRITE_BUILD_OPTIONS) {
            match build_options.write(path) {
                Ok(()) => info!("Wrote build options to {path}"),
                Err(e) => warn!("{e:#}"),
            }
        }
        build_options.options = self.options.clone();
        build_options.pipeline_cache = Some(Rc::new(PipelineCache::new()));
        build_options
    }

    pub fn convert(&self, root: &Rc<Node>, file_path: impl AsRef<Path>) -> Option<SceneRoot> {
        let build_options = self.resolve_build_options();

        let file_path = file_path.as_ref().to_string_lossy();
        let stats = TextureAugmenter::new(&file_path, self.reader).run(root);
        info!(
            "Augmented {} state sets with {} companion maps",
            stats.state_sets, stats.maps_loaded
        );

        if self.option_bool(ORIGINAL_CONVERTER) {
            let node = SceneBuilder::new(&build_options, self.reader).optimize_and_convert(root);
            if node.is_none() {
                warn!("Nothing to convert in {file_path}");
            }
            return node.map(SceneRoot::new);
        }

        let mut converter = ConvertToScene::new(&build_options, self.reader);
        let Some(optimized) = converter.optimize(root) else {
            warn!("Nothing to convert in {file_path}");
            return None;
        };
        let node = converter.convert(&optimized)?;
        let mut scene = SceneRoot::new(node);
        if converter.num_paged_lod > 0 {
            match attach_resource_hints(&mut scene) {
                Some(hints) => info!("Attached resource hints: {hints:?}"),
                None => warn!("No resource hints for a paged scene"),
            }
        }
        Some(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{
        array::SourceArray,
        source::{DataType, PixelFormat},
    };

    #[test]
    fn image_hint_defaults_to_on() {
        let image = SourceImage::new(
            "a.png",
            1,
            1,
            PixelFormat::Rgb,
            DataType::UnsignedByte,
            vec![1, 2, 3],
        );
        assert_eq!(convert_image(&image, None).unwrap().data, vec![1, 2, 3, 255]);
        let options = Options {
            map_rgb_to_rgba_hint: false,
            ..Default::default()
        };
        assert_eq!(convert_image(&image, Some(&options)).unwrap().data, vec![1, 2, 3]);
    }

    #[test]
    fn arrays_ignore_options() {
        let array = SourceArray::Vec3ui(vec![[1, 2, 3]]);
        assert_eq!(
            convert_array(&array, Some(&Options::new())),
            convert_array(&array, None)
        );
    }
}
