//! State set, texture and pipeline conversion shared by both scene converters.

use std::{
    cell::RefCell,
    collections::{BTreeSet, HashMap},
    path::PathBuf,
    rc::Rc,
};

use log::{debug, warn};

use crate::{
    augment::{BASE_TEXTURE_UNIT, COMPANION_MAPS},
    convert::image::to_image_data,
    data_structures::{
        scene::{ImageData, MaterialState, PipelineDescriptor, SamplerState, TextureBinding},
        source::{FilterMode, RenderingHint, SharedStateSet, SourceImage, StateSet, Texture2D, WrapMode},
    },
    options::{BuildOptions, PipelineCache, find_file},
    resources::ImageReader,
};

pub const DIFFUSE_MAP_DEFINE: &str = "DIFFUSE_MAP";

pub fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Clamp | WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::ClampToBorder => wgpu::AddressMode::ClampToBorder,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::Mirror => wgpu::AddressMode::MirrorRepeat,
    }
}

/// Texel filter and mipmap filter of a minification filter.
pub fn min_filter(filter: FilterMode) -> (wgpu::FilterMode, wgpu::FilterMode) {
    use wgpu::FilterMode::{Linear, Nearest};
    match filter {
        FilterMode::Nearest | FilterMode::NearestMipmapNearest => (Nearest, Nearest),
        FilterMode::NearestMipmapLinear => (Nearest, Linear),
        FilterMode::Linear | FilterMode::LinearMipmapNearest => (Linear, Nearest),
        FilterMode::LinearMipmapLinear => (Linear, Linear),
    }
}

pub fn mag_filter(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest | FilterMode::NearestMipmapNearest | FilterMode::NearestMipmapLinear => {
            wgpu::FilterMode::Nearest
        }
        _ => wgpu::FilterMode::Linear,
    }
}

pub fn sampler_state(texture: &Texture2D) -> SamplerState {
    let (min_filter, mipmap_filter) = min_filter(texture.min_filter);
    let mag_filter = mag_filter(texture.mag_filter);
    let all_linear = min_filter == wgpu::FilterMode::Linear
        && mag_filter == wgpu::FilterMode::Linear
        && mipmap_filter == wgpu::FilterMode::Linear;
    // anisotropic filtering is only valid with linear filtering everywhere
    let anisotropy_clamp = if all_linear {
        (texture.max_anisotropy.clamp(1.0, 16.0) as u16).max(1)
    } else {
        1
    };
    SamplerState {
        address_mode_u: address_mode(texture.wrap_s),
        address_mode_v: address_mode(texture.wrap_t),
        address_mode_w: address_mode(texture.wrap_r),
        mag_filter,
        min_filter,
        mipmap_filter,
        anisotropy_clamp,
    }
}

/// Shader defines switched on by the textures and flags of `state`.
pub fn state_defines(state: &StateSet) -> BTreeSet<String> {
    let mut defines = BTreeSet::new();
    if state.texture(BASE_TEXTURE_UNIT).is_some() {
        defines.insert(DIFFUSE_MAP_DEFINE.to_string());
    }
    for map in COMPANION_MAPS.iter() {
        let define = format!("{}_MAP", map.flag.to_uppercase());
        if state.texture(map.unit).is_some() {
            defines.insert(define.clone());
        }
        if state.user_value(&map.flip_flag()) == Some(true) {
            defines.insert(format!("{define}_FLIP_V"));
        }
    }
    defines
}

/// Converts state sets once per instance and resolves their images.
pub struct StateConverter<'a> {
    build_options: &'a BuildOptions,
    reader: &'a dyn ImageReader,
    search_paths: Vec<PathBuf>,
    pipeline_cache: Rc<PipelineCache>,
    states: HashMap<*const RefCell<StateSet>, (SharedStateSet, Rc<MaterialState>)>,
    images: HashMap<*const SourceImage, (Rc<SourceImage>, Option<Rc<ImageData>>)>,
}

impl<'a> StateConverter<'a> {
    pub fn new(
        build_options: &'a BuildOptions,
        reader: &'a dyn ImageReader,
        search_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            build_options,
            reader,
            search_paths,
            pipeline_cache: build_options.pipeline_cache(),
            states: HashMap::new(),
            images: HashMap::new(),
        }
    }

    pub fn convert_state_set(&mut self, state_set: &SharedStateSet) -> Rc<MaterialState> {
        let key = Rc::as_ptr(state_set);
        if let Some((_, state)) = self.states.get(&key) {
            return state.clone();
        }

        let source = state_set.borrow();
        let mut state = MaterialState {
            defines: state_defines(&source),
            transparent: source.rendering_hint == RenderingHint::Transparent,
            ..Default::default()
        };
        for (unit, texture) in source.textures() {
            match self.convert_texture(texture) {
                Some(binding) => {
                    state.textures.insert(unit, binding);
                }
                None => warn!("Dropping texture on unit {unit}: image could not be converted"),
            }
        }
        drop(source);

        let state = Rc::new(state);
        self.states
            .insert(key, (state_set.clone(), state.clone()));
        state
    }

    pub fn convert_texture(&mut self, texture: &Texture2D) -> Option<TextureBinding> {
        let image = texture.image.as_ref()?;
        let image = self.image_data(image)?;
        Some(TextureBinding {
            image,
            sampler: sampler_state(texture),
        })
    }

    /// Converted pixels of `image`, reading them through the search paths when the
    /// source only carries a file name.
    fn image_data(&mut self, image: &Rc<SourceImage>) -> Option<Rc<ImageData>> {
        let key = Rc::as_ptr(image);
        if let Some((_, data)) = self.images.get(&key) {
            return data.clone();
        }
        let hint = self.build_options.map_rgb_to_rgba_hint;
        let data = if image.is_valid() {
            to_image_data(image, hint)
        } else {
            self.read_image(&image.file_name)
                .and_then(|loaded| to_image_data(&loaded, hint))
        }
        .map(Rc::new);
        self.images.insert(key, (image.clone(), data.clone()));
        data
    }

    fn read_image(&self, file_name: &str) -> Option<SourceImage> {
        if file_name.is_empty() {
            return None;
        }
        let Some(path) = find_file(file_name, &self.search_paths, |p| self.reader.exists(p)) else {
            debug!("Image '{file_name}' not found in search paths");
            return None;
        };
        self.reader
            .read_image(&path)
            .map_err(|e| warn!("{e:#}"))
            .ok()
    }

    pub fn pipeline(
        &self,
        defines: BTreeSet<String>,
        vertex_formats: Vec<wgpu::VertexFormat>,
        blending: bool,
    ) -> Rc<PipelineDescriptor> {
        self.pipeline_cache.get_or_insert(PipelineDescriptor {
            vertex_shader: self.build_options.vertex_shader_path.clone(),
            fragment_shader: self.build_options.fragment_shader_path.clone(),
            defines,
            vertex_formats,
            blending,
        })
    }
}
