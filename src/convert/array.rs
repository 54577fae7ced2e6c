//! Source array to destination array dispatch.
//!
//! The mapping is a closed table over [`SourceArray`]. Signed integer arrays,
//! quaternions and 64-bit integers have no destination type and yield `None`
//! instead of a reinterpreted buffer.

use crate::data_structures::array::{SourceArray, TypedArray};

/// Element-wise copy. Source and destination element types are identical for
/// every supported tag, so the copy is index for index with no rescaling.
pub fn copy_elements<T: Copy>(src: &[T]) -> Vec<T> {
    src.to_vec()
}

pub fn to_typed_array(src: &SourceArray) -> Option<TypedArray> {
    let array = match src {
        SourceArray::Byte(_) | SourceArray::Short(_) | SourceArray::Int(_) => return None,

        SourceArray::UByte(v) => TypedArray::UByte(copy_elements(v)),
        SourceArray::UShort(v) => TypedArray::UShort(copy_elements(v)),
        SourceArray::UInt(v) => TypedArray::UInt(copy_elements(v)),

        SourceArray::Float(v) => TypedArray::Float(copy_elements(v)),
        SourceArray::Double(v) => TypedArray::Double(copy_elements(v)),

        SourceArray::Vec2b(_) | SourceArray::Vec3b(_) | SourceArray::Vec4b(_) => return None,
        SourceArray::Vec2s(_) | SourceArray::Vec3s(_) | SourceArray::Vec4s(_) => return None,
        SourceArray::Vec2i(_) | SourceArray::Vec3i(_) | SourceArray::Vec4i(_) => return None,

        SourceArray::Vec2ub(v) => TypedArray::UbVec2(copy_elements(v)),
        SourceArray::Vec3ub(v) => TypedArray::UbVec3(copy_elements(v)),
        SourceArray::Vec4ub(v) => TypedArray::UbVec4(copy_elements(v)),

        SourceArray::Vec2us(v) => TypedArray::UsVec2(copy_elements(v)),
        SourceArray::Vec3us(v) => TypedArray::UsVec3(copy_elements(v)),
        SourceArray::Vec4us(v) => TypedArray::UsVec4(copy_elements(v)),

        SourceArray::Vec2ui(v) => TypedArray::UiVec2(copy_elements(v)),
        SourceArray::Vec3ui(v) => TypedArray::UiVec3(copy_elements(v)),
        SourceArray::Vec4ui(v) => TypedArray::UiVec4(copy_elements(v)),

        SourceArray::Vec2(v) => TypedArray::Vec2(copy_elements(v)),
        SourceArray::Vec3(v) => TypedArray::Vec3(copy_elements(v)),
        SourceArray::Vec4(v) => TypedArray::Vec4(copy_elements(v)),

        SourceArray::Vec2d(v) => TypedArray::DVec2(copy_elements(v)),
        SourceArray::Vec3d(v) => TypedArray::DVec3(copy_elements(v)),
        SourceArray::Vec4d(v) => TypedArray::DVec4(copy_elements(v)),

        SourceArray::Matrix(v) => TypedArray::Mat4(copy_elements(v)),
        SourceArray::Matrixd(v) => TypedArray::DMat4(copy_elements(v)),

        SourceArray::Quat(_) | SourceArray::UInt64(_) | SourceArray::Int64(_) => return None,
    };
    Some(array)
}
