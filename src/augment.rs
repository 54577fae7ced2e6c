//! Companion texture discovery.
//!
//! A material usually ships more maps than the source scene binds. Given the
//! diffuse texture `rock_diffuse.dds`, the normal map is expected next to the scene
//! file as `rock_NML.dds`. [`TextureAugmenter`] walks the source graph, finds those
//! companion files and binds them to the state sets, copying the sampler settings
//! of the diffuse texture.
//!
//! Each state set is processed at most once: the `processed` user value is set
//! before any file is touched, so state shared between several nodes or drawables
//! is skipped on every later visit, including later traversals.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, info, trace};

use crate::{
    convert::image::to_image_data,
    data_structures::source::{Drawable, Node, NodeVisitor, SharedStateSet},
    resources::ImageReader,
};

/// User value marking a state set as handled.
pub const PROCESSED: &str = "processed";

/// Unit holding the diffuse texture the companion names are derived from.
pub const BASE_TEXTURE_UNIT: u32 = 0;
pub const NORMAL_TEXTURE_UNIT: u32 = 5;
pub const AORM_TEXTURE_UNIT: u32 = 3;
pub const EMISSIVE_TEXTURE_UNIT: u32 = 7;
pub const HEIGHT_TEXTURE_UNIT: u32 = 9;

/// Diffuse naming variants, stripped in this order. Only the first match is removed.
pub const DIFFUSE_SUFFIXES: [&str; 3] = ["_diffuse", "_Diffuse", "_DIFFUSE"];

/// Extensions of formats stored upside down relative to the renderer.
const FLIPPED_EXTENSIONS: [&str; 1] = ["dds"];

/// One kind of companion map: the file name suffix, the unit it is bound to and
/// the user value recording that it was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompanionMap {
    pub suffix: &'static str,
    pub unit: u32,
    pub flag: &'static str,
    pub enabled: bool,
}

impl CompanionMap {
    pub const fn new(suffix: &'static str, unit: u32, flag: &'static str) -> Self {
        Self {
            suffix,
            unit,
            flag,
            enabled: true,
        }
    }

    pub const fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }

    /// User value telling consumers to flip V when sampling this map.
    pub fn flip_flag(&self) -> String {
        format!("{}NeedsFlip", self.flag)
    }
}

pub const NORMAL_MAP: CompanionMap = CompanionMap::new("_NML", NORMAL_TEXTURE_UNIT, "norm");
pub const AORM_MAP: CompanionMap = CompanionMap::new("_AORM", AORM_TEXTURE_UNIT, "aorm");
pub const EMISSIVE_MAP: CompanionMap =
    CompanionMap::new("_EMISS", EMISSIVE_TEXTURE_UNIT, "emiss");
pub const HEIGHT_MAP: CompanionMap = CompanionMap::new("_HEIGHT", HEIGHT_TEXTURE_UNIT, "height");

/// The naming convention table. Only normal maps are looked up by default.
pub const COMPANION_MAPS: [CompanionMap; 4] = [
    NORMAL_MAP,
    AORM_MAP.disabled(),
    EMISSIVE_MAP.disabled(),
    HEIGHT_MAP.disabled(),
];

fn last_separator(path: &str) -> Option<usize> {
    path.rfind(['/', '\\'])
}

/// Index of the extension dot, ignoring dots inside directory names.
fn extension_dot(file_name: &str) -> Option<usize> {
    let dot = file_name.rfind('.')?;
    match last_separator(file_name) {
        Some(separator) if separator > dot => None,
        _ => Some(dot),
    }
}

/// Extension of `file_name` without the dot, empty when there is none.
pub fn file_extension(file_name: &str) -> &str {
    extension_dot(file_name).map_or("", |dot| &file_name[dot + 1..])
}

/// `file_name` without its extension and without one trailing diffuse suffix.
pub fn base_name(file_name: &str) -> &str {
    let stem = extension_dot(file_name).map_or(file_name, |dot| &file_name[..dot]);
    DIFFUSE_SUFFIXES
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .unwrap_or(stem)
}

/// Everything before the last path separator of `path`; empty without one.
pub fn scene_directory(path: &str) -> &str {
    last_separator(path).map_or("", |separator| &path[..separator])
}

fn needs_flip(extension: &str) -> bool {
    FLIPPED_EXTENSIONS
        .iter()
        .any(|flipped| flipped.eq_ignore_ascii_case(extension))
}

/// Counters of one or more augmentation passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AugmentStats {
    pub state_sets: usize,
    pub maps_loaded: usize,
}

/// Graph visitor binding companion texture maps to every state set it meets.
pub struct TextureAugmenter<'r> {
    directory: String,
    maps: Vec<CompanionMap>,
    reader: &'r dyn ImageReader,
    stats: AugmentStats,
}

impl<'r> TextureAugmenter<'r> {
    /// `scene_path` is the file being converted; companions are looked up in its
    /// directory.
    pub fn new(scene_path: &str, reader: &'r dyn ImageReader) -> Self {
        Self {
            directory: scene_directory(scene_path).to_string(),
            maps: COMPANION_MAPS.to_vec(),
            reader,
            stats: AugmentStats::default(),
        }
    }

    pub fn with_maps(mut self, maps: Vec<CompanionMap>) -> Self {
        self.maps = maps;
        self
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn stats(&self) -> AugmentStats {
        self.stats
    }

    /// Visit `root` and everything below it.
    pub fn run(&mut self, root: &Node) -> AugmentStats {
        root.accept(self);
        self.stats
    }

    /// `<directory>/<base><suffix>.<extension>`, relative when the directory is empty.
    pub fn candidate_path(&self, base: &str, suffix: &str, extension: &str) -> PathBuf {
        let file_name = if extension.is_empty() {
            format!("{base}{suffix}")
        } else {
            format!("{base}{suffix}.{extension}")
        };
        if self.directory.is_empty() {
            PathBuf::from(file_name)
        } else {
            Path::new(&self.directory).join(file_name)
        }
    }

    fn process_state_set(&mut self, state_set: Option<&SharedStateSet>) {
        let Some(state_set) = state_set else {
            return;
        };
        let mut state = state_set.borrow_mut();
        if state.user_value(PROCESSED) == Some(true) {
            return;
        }
        state.set_user_value(PROCESSED, true);
        self.stats.state_sets += 1;
        trace!("Processing state set");

        let Some(base_texture) = state.texture(BASE_TEXTURE_UNIT).cloned() else {
            return;
        };
        let Some(file_name) = state
            .texture_file_name(BASE_TEXTURE_UNIT)
            .map(str::to_string)
        else {
            return;
        };
        let base = base_name(&file_name);
        let extension = file_extension(&file_name);

        for map in self.maps.iter().filter(|map| map.enabled) {
            let path = self.candidate_path(base, map.suffix, extension);
            if !self.reader.exists(&path) {
                trace!("No {} map at {}", map.flag, path.display());
                continue;
            }
            let image = match self.reader.read_image(&path) {
                Ok(image) => image,
                Err(e) => {
                    debug!("Skipping {}: {e:#}", path.display());
                    continue;
                }
            };
            if !image.is_valid() || to_image_data(&image, false).is_none() {
                debug!("Skipping {}: not a usable image", path.display());
                continue;
            }

            state.set_texture(map.unit, base_texture.with_sampler_of(Rc::new(image)));
            state.set_user_value(map.flag, true);
            if needs_flip(extension) {
                state.set_user_value(map.flip_flag(), true);
            }
            self.stats.maps_loaded += 1;
            info!("Loaded {}", path.display());
        }
    }
}

impl NodeVisitor for TextureAugmenter<'_> {
    fn apply_node(&mut self, node: &Node) {
        self.process_state_set(node.state_set.as_ref());
        self.traverse(node);
    }

    fn apply_geode(&mut self, geode: &Node, drawables: &[Rc<Drawable>]) {
        self.process_state_set(geode.state_set.as_ref());
        for drawable in drawables {
            self.apply_drawable(drawable);
        }
    }

    fn apply_drawable(&mut self, drawable: &Drawable) {
        self.process_state_set(drawable.state_set.as_ref());
    }
}
