//! Drawable geometry conversion.

use std::collections::BTreeSet;

use log::warn;

use crate::{
    convert::{array::to_typed_array, state::StateConverter},
    data_structures::{
        array::{SourceArray, TypedArray},
        scene::{Draw, DrawCommand, Geometry, IndexData},
        source::{self, PrimitiveMode, PrimitiveSet},
    },
};

pub fn topology(mode: PrimitiveMode) -> Option<wgpu::PrimitiveTopology> {
    match mode {
        PrimitiveMode::Points => Some(wgpu::PrimitiveTopology::PointList),
        PrimitiveMode::Lines => Some(wgpu::PrimitiveTopology::LineList),
        PrimitiveMode::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
        PrimitiveMode::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
        PrimitiveMode::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
        PrimitiveMode::TriangleFan | PrimitiveMode::Quads => None,
    }
}

/// Rewrites triangle fans and quads as triangle lists; other sets are returned as is.
pub fn triangulate(set: &PrimitiveSet) -> PrimitiveSet {
    let indices = match set.mode() {
        PrimitiveMode::TriangleFan => {
            let fan = set.indices();
            match fan.split_first() {
                Some((&center, rim)) => rim
                    .windows(2)
                    .flat_map(|edge| [center, edge[0], edge[1]])
                    .collect(),
                None => Vec::new(),
            }
        }
        PrimitiveMode::Quads => set
            .indices()
            .chunks_exact(4)
            .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
            .collect(),
        _ => return set.clone(),
    };
    // an overflowing range triangulates to nothing and is dropped later
    PrimitiveSet::DrawElementsUInt {
        mode: PrimitiveMode::Triangles,
        indices,
    }
}

fn draw_command(set: &PrimitiveSet, num_vertices: usize) -> Option<DrawCommand> {
    let set = triangulate(set);
    let topology = topology(set.mode())?;
    let draw = match &set {
        PrimitiveSet::DrawArrays { first, count, .. } => {
            if *first as u64 + *count as u64 > num_vertices as u64 {
                warn!("Draw range {first}+{count} exceeds {num_vertices} vertices");
                return None;
            }
            Draw::Arrays {
                first: *first,
                count: *count,
            }
        }
        _ => {
            let indices = set.indices();
            if let Some(out_of_range) = indices.iter().find(|&&i| i as usize >= num_vertices) {
                warn!("Index {out_of_range} exceeds {num_vertices} vertices");
                return None;
            }
            Draw::Indexed(IndexData::from_indices(indices))
        }
    };
    if set.num_indices() == 0 {
        return None;
    }
    Some(DrawCommand { topology, draw })
}

/// A converted vertex attribute, `None` when it has no usable vertex format.
fn attribute(array: Option<&SourceArray>, name: &str) -> Option<TypedArray> {
    let array = array?;
    let Some(typed) = to_typed_array(array) else {
        warn!("Dropping {name} array: unsupported element type");
        return None;
    };
    if typed.vertex_format().is_none() {
        warn!(
            "Dropping {name} array: {:?} is not a vertex format",
            typed.element_type()
        );
        return None;
    }
    Some(typed)
}

/// Convert `geometry` drawn with the given inherited state defines.
///
/// Returns `None` when there are no usable vertices or no drawable primitives.
pub fn convert_geometry(
    geometry: &source::Geometry,
    states: &StateConverter,
    state_defines: &BTreeSet<String>,
    blending: bool,
) -> Option<Geometry> {
    let vertices = attribute(geometry.vertices.as_ref(), "vertex")?;
    let num_vertices = vertices.len();

    let mut defines = state_defines.clone();
    let mut arrays = vec![vertices];
    let per_vertex = |array: &TypedArray, name: &str| {
        if array.len() == num_vertices {
            true
        } else {
            warn!(
                "Dropping {name} array: {} elements for {num_vertices} vertices",
                array.len()
            );
            false
        }
    };
    if let Some(normals) = attribute(geometry.normals.as_ref(), "normal") {
        if per_vertex(&normals, "normal") {
            arrays.push(normals);
            defines.insert("VERTEX_NORMALS".to_string());
        }
    }
    if let Some(colors) = attribute(geometry.colors.as_ref(), "color") {
        if per_vertex(&colors, "color") {
            arrays.push(colors);
            defines.insert("VERTEX_COLORS".to_string());
        }
    }
    for (unit, tex_coords) in geometry.tex_coords.iter().enumerate() {
        if let Some(tex_coords) = attribute(Some(tex_coords), "texture coordinate") {
            if per_vertex(&tex_coords, "texture coordinate") {
                arrays.push(tex_coords);
                defines.insert(format!("TEXCOORD{unit}"));
            }
        }
    }

    let commands: Vec<_> = geometry
        .primitive_sets
        .iter()
        .filter_map(|set| draw_command(set, num_vertices))
        .collect();
    if commands.is_empty() {
        return None;
    }

    let vertex_formats = arrays
        .iter()
        .filter_map(TypedArray::vertex_format)
        .collect();
    Some(Geometry {
        arrays,
        commands,
        pipeline: states.pipeline(defines, vertex_formats, blending),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fans_become_triangle_lists() {
        let fan = PrimitiveSet::DrawArrays {
            mode: PrimitiveMode::TriangleFan,
            first: 0,
            count: 5,
        };
        assert_eq!(
            triangulate(&fan),
            PrimitiveSet::DrawElementsUInt {
                mode: PrimitiveMode::Triangles,
                indices: vec![0, 1, 2, 0, 2, 3, 0, 3, 4],
            }
        );
    }

    #[test]
    fn quads_split_into_two_triangles() {
        let quads = PrimitiveSet::DrawElementsUShort {
            mode: PrimitiveMode::Quads,
            indices: vec![0, 1, 2, 3],
        };
        assert_eq!(
            triangulate(&quads).indices(),
            vec![0, 1, 2, 0, 2, 3]
        );
    }

    #[test]
    fn overflowing_fans_triangulate_to_nothing() {
        let fan = PrimitiveSet::DrawArrays {
            mode: PrimitiveMode::TriangleFan,
            first: u32::MAX - 1,
            count: 3,
        };
        assert_eq!(triangulate(&fan).num_indices(), 0);
        assert!(draw_command(&fan, 4).is_none());
        let strip = PrimitiveSet::DrawArrays {
            mode: PrimitiveMode::TriangleStrip,
            first: u32::MAX - 1,
            count: 3,
        };
        assert!(draw_command(&strip, 4).is_none());
    }

    #[test]
    fn out_of_range_indices_drop_the_command() {
        let set = PrimitiveSet::DrawElementsUByte {
            mode: PrimitiveMode::Triangles,
            indices: vec![0, 1, 9],
        };
        assert!(draw_command(&set, 3).is_none());
        let set = PrimitiveSet::DrawElementsUByte {
            mode: PrimitiveMode::Triangles,
            indices: vec![0, 1, 2],
        };
        let command = draw_command(&set, 3).unwrap();
        assert_eq!(command.topology, wgpu::PrimitiveTopology::TriangleList);
        assert_eq!(command.draw, Draw::Indexed(IndexData::U16(vec![0, 1, 2])));
    }
}
