use flow_bridge::{
    Options, convert_image,
    data_structures::{
        scene::DataFormat,
        source::{DataType, PixelFormat, SourceImage},
    },
};

use crate::common::test_utils::rgb_image;

mod common;

#[test]
fn rgb_gains_an_opaque_alpha() {
    common::test_utils::init_logger();
    let converted = convert_image(&rgb_image("a.png"), None).unwrap();
    assert_eq!(converted.format, DataFormat::Rgba8);
    assert_eq!((converted.width, converted.height), (2, 1));
    assert_eq!(converted.data, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    assert_eq!(converted.texture_format(), Some(wgpu::TextureFormat::Rgba8Unorm));
}

#[test]
fn hint_off_keeps_three_channels() {
    let options = Options {
        map_rgb_to_rgba_hint: false,
        ..Default::default()
    };
    let converted = convert_image(&rgb_image("a.png"), Some(&options)).unwrap();
    assert_eq!(converted.format, DataFormat::Rgb8);
    assert_eq!(converted.channels(), 3);
    assert_eq!(converted.texture_format(), None);
}

#[test]
fn sixteen_bit_alpha_is_max() {
    let data: Vec<u8> = [1u16, 2, 3]
        .iter()
        .flat_map(|c| c.to_ne_bytes())
        .collect();
    let image = SourceImage::new("a.png", 1, 1, PixelFormat::Rgb, DataType::UnsignedShort, data);
    let converted = convert_image(&image, None).unwrap();
    assert_eq!(converted.data.len(), 8);
    assert_eq!(&converted.data[6..], &u16::MAX.to_ne_bytes());
}

#[test]
fn unknown_formats_are_rejected() {
    let mut image = rgb_image("a.png");
    image.pixel_format = PixelFormat::Other(0x8000);
    assert!(convert_image(&image, None).is_none());

    let mut image = rgb_image("a.png");
    image.data_type = DataType::Other(0x140A);
    assert!(convert_image(&image, None).is_none());
}

#[test]
fn rgba_passes_through() {
    let image = SourceImage::new(
        "a.png",
        1,
        1,
        PixelFormat::Rgba,
        DataType::UnsignedByte,
        vec![1, 2, 3, 4],
    );
    assert_eq!(convert_image(&image, None).unwrap().data, vec![1, 2, 3, 4]);
}
