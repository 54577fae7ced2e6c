//! Conversion configuration.
//!
//! [`Options`] is what a caller hands to the conversion entry points. The node
//! conversion resolves it into [`BuildOptions`], which can be persisted to and
//! restored from a RON file so a conversion setup can be replayed.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::data_structures::scene::PipelineDescriptor;

/// Names a build options file to read before converting.
pub const READ_BUILD_OPTIONS: &str = "read_build_options";
/// Names a file the resolved build options are written to.
pub const WRITE_BUILD_OPTIONS: &str = "write_build_options";
/// Selects the legacy single-step converter when `true`.
pub const ORIGINAL_CONVERTER: &str = "original_converter";

/// Environment variable holding search paths when no options are given.
pub const FILE_PATH_ENV: &str = "FLOW_FILE_PATH";

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    String(String),
}

/// Caller supplied options.
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub map_rgb_to_rgba_hint: bool,
    pub paths: Vec<PathBuf>,
    pub values: HashMap<String, OptionValue>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            map_rgb_to_rgba_hint: true,
            paths: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: OptionValue) {
        self.values.insert(key.into(), value);
    }

    pub fn with_bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.set_value(key, OptionValue::Bool(value));
        self
    }

    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_value(key, OptionValue::String(value.into()));
        self
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key)? {
            OptionValue::Bool(value) => Some(*value),
            OptionValue::String(_) => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            OptionValue::String(value) => Some(value.as_str()),
            OptionValue::Bool(_) => None,
        }
    }
}

/// Search paths from `options`, or from [`FILE_PATH_ENV`] when there are none.
pub fn search_paths(options: Option<&Options>) -> Vec<PathBuf> {
    match options {
        Some(options) => options.paths.clone(),
        None => std::env::var_os(FILE_PATH_ENV)
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default(),
    }
}

/// First file named `file_name` that `exists`, either as given or below a search path.
pub fn find_file(
    file_name: &str,
    paths: &[PathBuf],
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    let path = Path::new(file_name);
    if exists(path) {
        return Some(path.to_path_buf());
    }
    if path.is_absolute() {
        return None;
    }
    paths
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| exists(candidate))
}

/// Deduplicates pipeline descriptions across the converted scene.
#[derive(Debug, Default)]
pub struct PipelineCache {
    pipelines: RefCell<HashMap<PipelineDescriptor, Rc<PipelineDescriptor>>>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared instance equal to `descriptor`, inserting it on first use.
    pub fn get_or_insert(&self, descriptor: PipelineDescriptor) -> Rc<PipelineDescriptor> {
        let mut pipelines = self.pipelines.borrow_mut();
        pipelines
            .entry(descriptor.clone())
            .or_insert_with(|| Rc::new(descriptor))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.pipelines.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolved settings for one node graph conversion.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub map_rgb_to_rgba_hint: bool,
    /// Wrap subgraphs with a bounding sphere in cull groups.
    pub insert_cull_groups: bool,
    /// Route transparent state into depth sorted bins.
    pub use_depth_sorted: bool,
    pub vertex_shader_path: String,
    pub fragment_shader_path: String,
    /// Extension used when the build options are written without one.
    pub extension: String,
    #[serde(skip)]
    pub pipeline_cache: Option<Rc<PipelineCache>>,
    #[serde(skip)]
    pub options: Option<Arc<Options>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            map_rgb_to_rgba_hint: true,
            insert_cull_groups: true,
            use_depth_sorted: true,
            vertex_shader_path: "shaders/pbr.vert.wgsl".to_string(),
            fragment_shader_path: "shaders/pbr.frag.wgsl".to_string(),
            extension: "ron".to_string(),
            pipeline_cache: None,
            options: None,
        }
    }
}

impl BuildOptions {
    pub fn new(map_rgb_to_rgba_hint: bool) -> Self {
        Self {
            map_rgb_to_rgba_hint,
            ..Default::default()
        }
    }

    pub fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading build options from {}", path.display()))?;
        let options = ron::from_str(&text)
            .with_context(|| format!("parsing build options in {}", path.display()))?;
        Ok(options)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut path = path.as_ref().to_path_buf();
        if path.extension().is_none() {
            path.set_extension(&self.extension);
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(&path, text)
            .with_context(|| format!("writing build options to {}", path.display()))?;
        Ok(())
    }

    pub fn pipeline_cache(&self) -> Rc<PipelineCache> {
        self.pipeline_cache.clone().unwrap_or_default()
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        search_paths(self.options.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_lookups_do_not_cross_types() {
        let options = Options::new()
            .with_bool(ORIGINAL_CONVERTER, true)
            .with_string(READ_BUILD_OPTIONS, "build.ron");
        assert_eq!(options.get_bool(ORIGINAL_CONVERTER), Some(true));
        assert_eq!(options.get_string(ORIGINAL_CONVERTER), None);
        assert_eq!(options.get_string(READ_BUILD_OPTIONS), Some("build.ron"));
        assert_eq!(options.get_bool(WRITE_BUILD_OPTIONS), None);
    }

    #[test]
    fn find_file_walks_search_paths() {
        let paths = vec![PathBuf::from("a"), PathBuf::from("b")];
        let found = find_file("tex.png", &paths, |p| p == Path::new("b/tex.png"));
        assert_eq!(found, Some(PathBuf::from("b/tex.png")));
        assert_eq!(find_file("tex.png", &paths, |_| false), None);
    }

    #[test]
    fn pipeline_cache_shares_equal_descriptors() {
        let cache = PipelineCache::new();
        let descriptor = PipelineDescriptor {
            vertex_shader: "v".into(),
            fragment_shader: "f".into(),
            defines: Default::default(),
            vertex_formats: vec![wgpu::VertexFormat::Float32x3],
            blending: false,
        };
        let a = cache.get_or_insert(descriptor.clone());
        let b = cache.get_or_insert(descriptor);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }
}
