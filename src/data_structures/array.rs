//! Source and destination numeric arrays.
//!
//! [`SourceArray`] is the tagged array handed over by the source scene graph: the
//! variant is the type tag and the payload is the contiguous element buffer.
//! [`TypedArray`] is the strongly-typed buffer the renderer consumes. Which source
//! tags have a destination counterpart is decided in [`crate::convert::array`].

/// Tagged source array. The variant names follow the source library's array types.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceArray {
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),

    UByte(Vec<u8>),
    UShort(Vec<u16>),
    UInt(Vec<u32>),

    Float(Vec<f32>),
    Double(Vec<f64>),

    Vec2b(Vec<[i8; 2]>),
    Vec3b(Vec<[i8; 3]>),
    Vec4b(Vec<[i8; 4]>),

    Vec2s(Vec<[i16; 2]>),
    Vec3s(Vec<[i16; 3]>),
    Vec4s(Vec<[i16; 4]>),

    Vec2i(Vec<[i32; 2]>),
    Vec3i(Vec<[i32; 3]>),
    Vec4i(Vec<[i32; 4]>),

    Vec2ub(Vec<[u8; 2]>),
    Vec3ub(Vec<[u8; 3]>),
    Vec4ub(Vec<[u8; 4]>),

    Vec2us(Vec<[u16; 2]>),
    Vec3us(Vec<[u16; 3]>),
    Vec4us(Vec<[u16; 4]>),

    Vec2ui(Vec<[u32; 2]>),
    Vec3ui(Vec<[u32; 3]>),
    Vec4ui(Vec<[u32; 4]>),

    Vec2(Vec<[f32; 2]>),
    Vec3(Vec<[f32; 3]>),
    Vec4(Vec<[f32; 4]>),

    Vec2d(Vec<[f64; 2]>),
    Vec3d(Vec<[f64; 3]>),
    Vec4d(Vec<[f64; 4]>),

    Matrix(Vec<[[f32; 4]; 4]>),
    Matrixd(Vec<[[f64; 4]; 4]>),

    Quat(Vec<[f64; 4]>),
    UInt64(Vec<u64>),
    Int64(Vec<i64>),
}

impl SourceArray {
    pub fn len(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::UByte(v) => v.len(),
            Self::UShort(v) => v.len(),
            Self::UInt(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Vec2b(v) => v.len(),
            Self::Vec3b(v) => v.len(),
            Self::Vec4b(v) => v.len(),
            Self::Vec2s(v) => v.len(),
            Self::Vec3s(v) => v.len(),
            Self::Vec4s(v) => v.len(),
            Self::Vec2i(v) => v.len(),
            Self::Vec3i(v) => v.len(),
            Self::Vec4i(v) => v.len(),
            Self::Vec2ub(v) => v.len(),
            Self::Vec3ub(v) => v.len(),
            Self::Vec4ub(v) => v.len(),
            Self::Vec2us(v) => v.len(),
            Self::Vec3us(v) => v.len(),
            Self::Vec4us(v) => v.len(),
            Self::Vec2ui(v) => v.len(),
            Self::Vec3ui(v) => v.len(),
            Self::Vec4ui(v) => v.len(),
            Self::Vec2(v) => v.len(),
            Self::Vec3(v) => v.len(),
            Self::Vec4(v) => v.len(),
            Self::Vec2d(v) => v.len(),
            Self::Vec3d(v) => v.len(),
            Self::Vec4d(v) => v.len(),
            Self::Matrix(v) => v.len(),
            Self::Matrixd(v) => v.len(),
            Self::Quat(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Element type of a [`TypedArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    UByte,
    UShort,
    UInt,
    Float,
    Double,
    UbVec2,
    UbVec3,
    UbVec4,
    UsVec2,
    UsVec3,
    UsVec4,
    UiVec2,
    UiVec3,
    UiVec4,
    Vec2,
    Vec3,
    Vec4,
    DVec2,
    DVec3,
    DVec4,
    Mat4,
    DMat4,
}

/// Destination array. Every variant owns a contiguous buffer of one element type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedArray {
    UByte(Vec<u8>),
    UShort(Vec<u16>),
    UInt(Vec<u32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    UbVec2(Vec<[u8; 2]>),
    UbVec3(Vec<[u8; 3]>),
    UbVec4(Vec<[u8; 4]>),
    UsVec2(Vec<[u16; 2]>),
    UsVec3(Vec<[u16; 3]>),
    UsVec4(Vec<[u16; 4]>),
    UiVec2(Vec<[u32; 2]>),
    UiVec3(Vec<[u32; 3]>),
    UiVec4(Vec<[u32; 4]>),
    Vec2(Vec<[f32; 2]>),
    Vec3(Vec<[f32; 3]>),
    Vec4(Vec<[f32; 4]>),
    DVec2(Vec<[f64; 2]>),
    DVec3(Vec<[f64; 3]>),
    DVec4(Vec<[f64; 4]>),
    Mat4(Vec<[[f32; 4]; 4]>),
    DMat4(Vec<[[f64; 4]; 4]>),
}

impl TypedArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::UByte(_) => ElementType::UByte,
            Self::UShort(_) => ElementType::UShort,
            Self::UInt(_) => ElementType::UInt,
            Self::Float(_) => ElementType::Float,
            Self::Double(_) => ElementType::Double,
            Self::UbVec2(_) => ElementType::UbVec2,
            Self::UbVec3(_) => ElementType::UbVec3,
            Self::UbVec4(_) => ElementType::UbVec4,
            Self::UsVec2(_) => ElementType::UsVec2,
            Self::UsVec3(_) => ElementType::UsVec3,
            Self::UsVec4(_) => ElementType::UsVec4,
            Self::UiVec2(_) => ElementType::UiVec2,
            Self::UiVec3(_) => ElementType::UiVec3,
            Self::UiVec4(_) => ElementType::UiVec4,
            Self::Vec2(_) => ElementType::Vec2,
            Self::Vec3(_) => ElementType::Vec3,
            Self::Vec4(_) => ElementType::Vec4,
            Self::DVec2(_) => ElementType::DVec2,
            Self::DVec3(_) => ElementType::DVec3,
            Self::DVec4(_) => ElementType::DVec4,
            Self::Mat4(_) => ElementType::Mat4,
            Self::DMat4(_) => ElementType::DMat4,
        }
    }

    /// Raw bytes of the buffer, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::UByte(v) => bytemuck::cast_slice(v),
            Self::UShort(v) => bytemuck::cast_slice(v),
            Self::UInt(v) => bytemuck::cast_slice(v),
            Self::Float(v) => bytemuck::cast_slice(v),
            Self::Double(v) => bytemuck::cast_slice(v),
            Self::UbVec2(v) => bytemuck::cast_slice(v),
            Self::UbVec3(v) => bytemuck::cast_slice(v),
            Self::UbVec4(v) => bytemuck::cast_slice(v),
            Self::UsVec2(v) => bytemuck::cast_slice(v),
            Self::UsVec3(v) => bytemuck::cast_slice(v),
            Self::UsVec4(v) => bytemuck::cast_slice(v),
            Self::UiVec2(v) => bytemuck::cast_slice(v),
            Self::UiVec3(v) => bytemuck::cast_slice(v),
            Self::UiVec4(v) => bytemuck::cast_slice(v),
            Self::Vec2(v) => bytemuck::cast_slice(v),
            Self::Vec3(v) => bytemuck::cast_slice(v),
            Self::Vec4(v) => bytemuck::cast_slice(v),
            Self::DVec2(v) => bytemuck::cast_slice(v),
            Self::DVec3(v) => bytemuck::cast_slice(v),
            Self::DVec4(v) => bytemuck::cast_slice(v),
            Self::Mat4(v) => bytemuck::cast_slice(v),
            Self::DMat4(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len() / self.element_size()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        match self.element_type() {
            ElementType::UByte => 1,
            ElementType::UShort | ElementType::UbVec2 => 2,
            ElementType::UbVec3 => 3,
            ElementType::UInt | ElementType::Float | ElementType::UbVec4 | ElementType::UsVec2 => 4,
            ElementType::UsVec3 => 6,
            ElementType::Double
            | ElementType::UsVec4
            | ElementType::UiVec2
            | ElementType::Vec2 => 8,
            ElementType::UiVec3 | ElementType::Vec3 => 12,
            ElementType::UiVec4 | ElementType::Vec4 | ElementType::DVec2 => 16,
            ElementType::DVec3 => 24,
            ElementType::DVec4 => 32,
            ElementType::Mat4 => 64,
            ElementType::DMat4 => 128,
        }
    }

    /// The vertex attribute format matching this array, if the renderer has one.
    ///
    /// Three component byte/short vectors and matrices have no vertex format and
    /// can only be bound as storage data.
    pub fn vertex_format(&self) -> Option<wgpu::VertexFormat> {
        match self.element_type() {
            ElementType::UInt => Some(wgpu::VertexFormat::Uint32),
            ElementType::Float => Some(wgpu::VertexFormat::Float32),
            ElementType::Double => Some(wgpu::VertexFormat::Float64),
            ElementType::UbVec2 => Some(wgpu::VertexFormat::Uint8x2),
            ElementType::UbVec4 => Some(wgpu::VertexFormat::Unorm8x4),
            ElementType::UsVec2 => Some(wgpu::VertexFormat::Uint16x2),
            ElementType::UsVec4 => Some(wgpu::VertexFormat::Uint16x4),
            ElementType::UiVec2 => Some(wgpu::VertexFormat::Uint32x2),
            ElementType::UiVec3 => Some(wgpu::VertexFormat::Uint32x3),
            ElementType::UiVec4 => Some(wgpu::VertexFormat::Uint32x4),
            ElementType::Vec2 => Some(wgpu::VertexFormat::Float32x2),
            ElementType::Vec3 => Some(wgpu::VertexFormat::Float32x3),
            ElementType::Vec4 => Some(wgpu::VertexFormat::Float32x4),
            ElementType::DVec2 => Some(wgpu::VertexFormat::Float64x2),
            ElementType::DVec3 => Some(wgpu::VertexFormat::Float64x3),
            ElementType::DVec4 => Some(wgpu::VertexFormat::Float64x4),
            ElementType::UByte
            | ElementType::UShort
            | ElementType::UbVec3
            | ElementType::UsVec3
            | ElementType::Mat4
            | ElementType::DMat4 => None,
        }
    }

    /// Positions as `f64` triples, used for bounds computation.
    pub fn positions(&self) -> Option<Vec<[f64; 3]>> {
        match self {
            Self::Vec3(v) => Some(
                v.iter()
                    .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
                    .collect(),
            ),
            Self::DVec3(v) => Some(v.clone()),
            Self::Vec4(v) => Some(
                v.iter()
                    .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
                    .collect(),
            ),
            Self::DVec4(v) => Some(v.iter().map(|p| [p[0], p[1], p[2]]).collect()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_view_covers_every_element() {
        let array = TypedArray::UsVec3(vec![[1, 2, 3], [4, 5, 6]]);
        assert_eq!(array.as_bytes().len(), 12);
        assert_eq!(array.len(), 2);
        assert_eq!(array.element_size(), 6);
    }

    #[test]
    fn matrices_have_no_vertex_format() {
        let array = TypedArray::Mat4(vec![[[0.0; 4]; 4]]);
        assert_eq!(array.vertex_format(), None);
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn double_vectors_map_to_float64_formats() {
        let array = TypedArray::DVec3(vec![[1.0, 2.0, 3.0]]);
        assert_eq!(array.vertex_format(), Some(wgpu::VertexFormat::Float64x3));
    }
}
