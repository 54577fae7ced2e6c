//! Scene data on both sides of the conversion.
//!
//! - `source` is the scene graph being converted: nodes, drawables and state sets
//! - `array` holds the tagged source arrays and the typed arrays they become
//! - `scene` is the renderer-facing scene graph produced by the conversion

pub mod array;
pub mod scene;
pub mod source;
