/**
 * This module contains all logic for loading images from external files.
 */
use std::path::Path;

use anyhow::Context as _;
use image::DynamicImage;

use crate::data_structures::source::{DataType, PixelFormat, SourceImage};

/// File access used while augmenting and converting textures.
pub trait ImageReader {
    fn exists(&self, path: &Path) -> bool;

    fn read_image(&self, path: &Path) -> anyhow::Result<SourceImage>;
}

/// Reads images from the local filesystem through the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageReader;

impl ImageReader for FsImageReader {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_image(&self, path: &Path) -> anyhow::Result<SourceImage> {
        let img = image::open(path).with_context(|| format!("loading {}", path.display()))?;
        Ok(from_dynamic_image(&img, &path.to_string_lossy()))
    }
}

/// Wraps decoded pixels into a [`SourceImage`] without changing their layout.
pub fn from_dynamic_image(img: &DynamicImage, file_name: &str) -> SourceImage {
    let (pixel_format, data_type, data): (_, _, Vec<u8>) = match img {
        DynamicImage::ImageLuma8(buf) => {
            (PixelFormat::Luminance, DataType::UnsignedByte, buf.as_raw().clone())
        }
        DynamicImage::ImageLumaA8(buf) => (
            PixelFormat::LuminanceAlpha,
            DataType::UnsignedByte,
            buf.as_raw().clone(),
        ),
        DynamicImage::ImageRgb8(buf) => {
            (PixelFormat::Rgb, DataType::UnsignedByte, buf.as_raw().clone())
        }
        DynamicImage::ImageRgba8(buf) => {
            (PixelFormat::Rgba, DataType::UnsignedByte, buf.as_raw().clone())
        }
        DynamicImage::ImageLuma16(buf) => (
            PixelFormat::Luminance,
            DataType::UnsignedShort,
            bytemuck::cast_slice::<_, u8>(buf.as_raw().as_slice()).to_vec(),
        ),
        DynamicImage::ImageLumaA16(buf) => (
            PixelFormat::LuminanceAlpha,
            DataType::UnsignedShort,
            bytemuck::cast_slice::<_, u8>(buf.as_raw().as_slice()).to_vec(),
        ),
        DynamicImage::ImageRgb16(buf) => (
            PixelFormat::Rgb,
            DataType::UnsignedShort,
            bytemuck::cast_slice::<_, u8>(buf.as_raw().as_slice()).to_vec(),
        ),
        DynamicImage::ImageRgba16(buf) => (
            PixelFormat::Rgba,
            DataType::UnsignedShort,
            bytemuck::cast_slice::<_, u8>(buf.as_raw().as_slice()).to_vec(),
        ),
        DynamicImage::ImageRgb32F(buf) => (
            PixelFormat::Rgb,
            DataType::Float,
            bytemuck::cast_slice::<_, u8>(buf.as_raw().as_slice()).to_vec(),
        ),
        DynamicImage::ImageRgba32F(buf) => (
            PixelFormat::Rgba,
            DataType::Float,
            bytemuck::cast_slice::<_, u8>(buf.as_raw().as_slice()).to_vec(),
        ),
        // DynamicImage is non-exhaustive
        other => (
            PixelFormat::Rgba,
            DataType::UnsignedByte,
            other.to_rgba8().into_raw(),
        ),
    };
    SourceImage::new(
        file_name,
        img.width(),
        img.height(),
        pixel_format,
        data_type,
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_images_keep_three_channels() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(2, 1, image::Rgb([1, 2, 3])));
        let source = from_dynamic_image(&img, "a.png");
        assert_eq!(source.pixel_format, PixelFormat::Rgb);
        assert_eq!(source.data, vec![1, 2, 3, 1, 2, 3]);
        assert_eq!((source.width, source.height), (2, 1));
        assert_eq!(source.file_name, "a.png");
    }
}
