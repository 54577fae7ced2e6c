//! Source image to renderer image data.

use log::debug;

use crate::{
    convert::array::copy_elements,
    data_structures::{
        scene::{DataFormat, ImageData},
        source::{DataType, PixelFormat, SourceImage},
    },
};

fn data_format(pixel_format: PixelFormat, data_type: DataType) -> Option<DataFormat> {
    let format = match (pixel_format, data_type) {
        (PixelFormat::CompressedRgbS3tcDxt1, _) => DataFormat::Bc1Rgb,
        (PixelFormat::CompressedRgbaS3tcDxt1, _) => DataFormat::Bc1Rgba,
        (PixelFormat::CompressedRgbaS3tcDxt3, _) => DataFormat::Bc2Rgba,
        (PixelFormat::CompressedRgbaS3tcDxt5, _) => DataFormat::Bc3Rgba,

        (PixelFormat::Luminance, DataType::UnsignedByte) => DataFormat::R8,
        (PixelFormat::LuminanceAlpha, DataType::UnsignedByte) => DataFormat::Rg8,
        (PixelFormat::Rgb, DataType::UnsignedByte) => DataFormat::Rgb8,
        (PixelFormat::Rgba, DataType::UnsignedByte) => DataFormat::Rgba8,
        (PixelFormat::Bgr, DataType::UnsignedByte) => DataFormat::Bgr8,
        (PixelFormat::Bgra, DataType::UnsignedByte) => DataFormat::Bgra8,

        (PixelFormat::Luminance, DataType::UnsignedShort) => DataFormat::R16,
        (PixelFormat::LuminanceAlpha, DataType::UnsignedShort) => DataFormat::Rg16,
        (PixelFormat::Rgb, DataType::UnsignedShort) => DataFormat::Rgb16,
        (PixelFormat::Rgba, DataType::UnsignedShort) => DataFormat::Rgba16,

        (PixelFormat::Luminance, DataType::Float) => DataFormat::R32Float,
        (PixelFormat::LuminanceAlpha, DataType::Float) => DataFormat::Rg32Float,
        (PixelFormat::Rgb, DataType::Float) => DataFormat::Rgb32Float,
        (PixelFormat::Rgba, DataType::Float) => DataFormat::Rgba32Float,

        _ => return None,
    };
    Some(format)
}

/// Bytes per pixel for uncompressed formats, bytes per 4x4 block otherwise.
fn unit_size(format: DataFormat) -> usize {
    match format {
        DataFormat::Bc1Rgb | DataFormat::Bc1Rgba => 8,
        DataFormat::Bc2Rgba | DataFormat::Bc3Rgba => 16,
        _ => format.channels() as usize * component_size(format),
    }
}

fn component_size(format: DataFormat) -> usize {
    match format {
        DataFormat::R16 | DataFormat::Rg16 | DataFormat::Rgb16 | DataFormat::Rgba16 => 2,
        DataFormat::R32Float
        | DataFormat::Rg32Float
        | DataFormat::Rgb32Float
        | DataFormat::Rgba32Float => 4,
        _ => 1,
    }
}

/// Size in bytes of mip level 0.
fn base_level_size(image: &SourceImage, format: DataFormat) -> usize {
    let (w, h, d) = (
        image.width as usize,
        image.height as usize,
        image.depth as usize,
    );
    if format.is_compressed() {
        w.div_ceil(4) * h.div_ceil(4) * d * unit_size(format)
    } else {
        w * h * d * unit_size(format)
    }
}

/// Promoted format and the bytes of a fully opaque alpha component.
fn with_alpha(format: DataFormat) -> Option<(DataFormat, Vec<u8>)> {
    match format {
        DataFormat::Rgb8 => Some((DataFormat::Rgba8, vec![u8::MAX])),
        DataFormat::Bgr8 => Some((DataFormat::Bgra8, vec![u8::MAX])),
        DataFormat::Rgb16 => Some((DataFormat::Rgba16, u16::MAX.to_ne_bytes().to_vec())),
        DataFormat::Rgb32Float => Some((DataFormat::Rgba32Float, 1.0f32.to_ne_bytes().to_vec())),
        _ => None,
    }
}

/// Convert `image`, appending an opaque alpha channel to three channel data when
/// `map_rgb_to_rgba_hint` is set.
///
/// Returns `None` for unknown formats and for buffers that do not match the
/// declared dimensions.
pub fn to_image_data(image: &SourceImage, map_rgb_to_rgba_hint: bool) -> Option<ImageData> {
    let Some(format) = data_format(image.pixel_format, image.data_type) else {
        debug!(
            "No destination format for {:?}/{:?} in '{}'",
            image.pixel_format, image.data_type, image.file_name
        );
        return None;
    };

    let required = base_level_size(image, format);
    if required == 0 || image.data.len() < required {
        debug!(
            "Image '{}' holds {} bytes, {} expected for {}x{}x{}",
            image.file_name,
            image.data.len(),
            required,
            image.width,
            image.height,
            image.depth
        );
        return None;
    }
    let offsets_valid = image
        .mipmap_offsets
        .windows(2)
        .all(|pair| pair[0] < pair[1])
        && image
            .mipmap_offsets
            .iter()
            .all(|&offset| offset >= required && offset < image.data.len());
    if !offsets_valid {
        debug!("Image '{}' has invalid mipmap offsets", image.file_name);
        return None;
    }

    let promotion = if map_rgb_to_rgba_hint {
        with_alpha(format)
    } else {
        None
    };

    let (format, data, mipmap_offsets) = match promotion {
        Some((promoted, alpha)) => {
            let pixel_size = unit_size(format);
            if image.data.len() % pixel_size != 0 {
                return None;
            }
            let mut data =
                Vec::with_capacity(image.data.len() / pixel_size * unit_size(promoted));
            for pixel in image.data.chunks_exact(pixel_size) {
                data.extend_from_slice(pixel);
                data.extend_from_slice(&alpha);
            }
            let offsets = image
                .mipmap_offsets
                .iter()
                .map(|offset| offset / pixel_size * unit_size(promoted))
                .collect();
            (promoted, data, offsets)
        }
        None => (
            format,
            copy_elements(&image.data),
            image.mipmap_offsets.clone(),
        ),
    };

    Some(ImageData {
        width: image.width,
        height: image.height,
        depth: image.depth,
        format,
        data,
        mipmap_offsets,
    })
}
