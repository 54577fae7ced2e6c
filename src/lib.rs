//! flow-bridge
//!
//! Converts hierarchical source scene graphs (groups, transforms, paged LODs and
//! geodes with textured drawables) into a scene description the wgpu renderer can
//! consume directly. Before converting, companion texture maps such as normal maps
//! are discovered next to the scene file and bound to the materials that use them.
//! Scenes streaming paged LOD tiles get resource hints so the renderer can size its
//! pools up front.
//!
//! High-level modules
//! - `augment`: companion texture discovery over the source graph
//! - `convert`: entry points and the two conversion paths (legacy and current)
//! - `data_structures`: source graph, array types and the converted scene
//! - `hints`: resource requirement collection and tile scaling
//! - `options`: caller options and persisted build options
//! - `resources`: image loading from files
//!

pub mod augment;
pub mod convert;
pub mod data_structures;
pub mod hints;
pub mod options;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use convert::{Converter, convert_array, convert_image, convert_node};
pub use data_structures::scene::{SceneNode, SceneRoot};
pub use options::{BuildOptions, Options};
