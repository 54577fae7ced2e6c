use std::{path::PathBuf, rc::Rc, sync::Arc};

use flow_bridge::{
    BuildOptions, Converter, Options, SceneNode,
    data_structures::{
        scene::{DataFormat, Geometry, MaterialState},
        source::{
            Drawable, Node, PagedRange, PrimitiveMode, PrimitiveSet, RenderingHint, SourceImage,
            StateSet, Texture2D,
        },
    },
    options::{ORIGINAL_CONVERTER, READ_BUILD_OPTIONS, WRITE_BUILD_OPTIONS},
};

use crate::common::test_utils::{
    FakeImageReader, geode, init_logger, rgb_image, rgba_image, textured_state, translation,
    triangle, triangle_geometry,
};

mod common;

fn nodes(root: &SceneNode) -> Vec<&SceneNode> {
    let mut nodes = Vec::new();
    root.walk(&mut |node| nodes.push(node));
    nodes
}

fn states(root: &SceneNode) -> Vec<Rc<MaterialState>> {
    nodes(root)
        .into_iter()
        .filter_map(|node| match node {
            SceneNode::StateGroup { state, .. } => Some(state.clone()),
            _ => None,
        })
        .collect()
}

fn geometries(root: &SceneNode) -> Vec<&Geometry> {
    nodes(root)
        .into_iter()
        .filter_map(|node| match node {
            SceneNode::Geometry(geometry) => Some(geometry),
            _ => None,
        })
        .collect()
}

fn paged_scene() -> Rc<Node> {
    let state = textured_state("rock_diffuse.png");
    let ranges = vec![
        PagedRange {
            min: 0.0,
            max: 500.0,
            file_name: "tile_0_0.osgb".into(),
        },
        PagedRange {
            min: 500.0,
            max: 1e6,
            file_name: "tile_1_0.osgb".into(),
        },
    ];
    let lod = Node::paged_lod(
        [0.0; 3],
        50.0,
        ranges,
        vec![geode(vec![triangle(Some(state))])],
    );
    Rc::new(Node::group(vec![Rc::new(lod)]))
}

#[test]
fn shared_state_converts_to_one_material() {
    init_logger();
    let reader = FakeImageReader::new().with_image("D/rock_NML.dds", rgba_image("rock_NML.dds"));
    let state = textured_state("rock_diffuse.dds");
    let root = Rc::new(Node::group(vec![
        geode(vec![triangle(Some(state.clone()))]),
        geode(vec![triangle(Some(state))]),
    ]));

    let scene = Converter::with_image_reader(None, &reader)
        .convert(&root, "D/scene.osgt")
        .unwrap();

    let states = states(&scene.node);
    assert_eq!(states.len(), 2);
    assert!(Rc::ptr_eq(&states[0], &states[1]));
    assert!(states[0].textures.contains_key(&5));

    let geometries = geometries(&scene.node);
    assert_eq!(geometries.len(), 2);
    assert!(Rc::ptr_eq(&geometries[0].pipeline, &geometries[1].pipeline));
    let defines = &geometries[0].pipeline.defines;
    for define in ["DIFFUSE_MAP", "NORM_MAP", "NORM_MAP_FLIP_V", "VERTEX_NORMALS", "TEXCOORD0"] {
        assert!(defines.contains(define), "missing {define}");
    }
    assert_eq!(
        geometries[0].pipeline.vertex_formats,
        vec![
            wgpu::VertexFormat::Float32x3,
            wgpu::VertexFormat::Float32x3,
            wgpu::VertexFormat::Float32x2
        ]
    );
    assert!(scene.resource_hints().is_none());
}

#[test]
fn groups_get_cull_bounds() {
    let reader = FakeImageReader::new();
    let root = Rc::new(Node::group(vec![
        geode(vec![triangle(None)]),
        geode(vec![triangle(None)]),
    ]));

    let scene = Converter::with_image_reader(None, &reader)
        .convert(&root, "scene.osgt")
        .unwrap();

    let SceneNode::CullGroup { bound, children } = &scene.node else {
        panic!("expected a cull group, got {:?}", scene.node);
    };
    assert!(bound.radius > 0.0);
    assert!(matches!(&children[0], SceneNode::Group { children } if children.len() == 2));
}

#[test]
fn paged_scenes_get_resource_hints() {
    init_logger();
    let reader = FakeImageReader::new();

    let scene = Converter::with_image_reader(None, &reader)
        .convert(&paged_scene(), "scene.osgb")
        .unwrap();

    let SceneNode::PagedLod(lod) = &scene.node else {
        panic!("expected a paged LOD, got {:?}", scene.node);
    };
    assert_eq!(lod.tiles.len(), 2);
    assert!(lod.tiles[0].node.is_some());
    assert!(lod.tiles[1].node.is_none());
    assert_eq!(lod.tiles[1].file_name, "tile_1_0.osgb");
    assert_eq!(lod.bound.radius, 50.0);

    let hints = scene.resource_hints().unwrap();
    assert_eq!(hints.tile_multiplier, 1025);
    assert_eq!(hints.num_descriptor_sets, 1025);
    assert_eq!(hints.num_sampled_textures, 1025);
    // positions, normals and texture coordinates of one triangle
    assert_eq!(hints.vertex_memory, (36 + 36 + 24) * 1025);
    assert_eq!(hints.index_memory, 6 * 1025);
    assert_eq!(hints.image_memory, 16 * 1025);
}

#[test]
fn legacy_converter_batches_and_skips_hints() {
    let reader = FakeImageReader::new();
    let options = Arc::new(Options::new().with_bool(ORIGINAL_CONVERTER, true));
    let state = textured_state("rock.png");
    let moved = Rc::new(Node::transform(
        translation(1.0, 0.0, 0.0),
        vec![
            geode(vec![triangle(Some(state.clone()))]),
            geode(vec![triangle(Some(state.clone()))]),
        ],
    ));
    let root = Rc::new(Node::group(vec![moved, geode(vec![triangle(Some(state))])]));

    let scene = Converter::with_image_reader(Some(options.clone()), &reader)
        .convert(&root, "scene.osgt")
        .unwrap();

    let SceneNode::Group { children } = &scene.node else {
        panic!("expected a group, got {:?}", scene.node);
    };
    assert_eq!(children.len(), 2);
    let SceneNode::MatrixTransform { matrix, children: moved } = &children[0] else {
        panic!("expected a transform, got {:?}", children[0]);
    };
    assert_eq!(*matrix, translation(1.0, 0.0, 0.0));
    let SceneNode::StateGroup { children: batch, .. } = &moved[0] else {
        panic!("expected a state group, got {:?}", moved[0]);
    };
    assert!(matches!(&batch[0], SceneNode::Group { children } if children.len() == 2));
    assert!(matches!(&children[1], SceneNode::StateGroup { .. }));

    let scene = Converter::with_image_reader(Some(options), &reader)
        .convert(&paged_scene(), "scene.osgb")
        .unwrap();
    assert!(scene.resource_hints().is_none());
}

#[test]
fn transparent_state_is_depth_sorted() {
    let reader = FakeImageReader::new();
    let mut state = StateSet::new();
    state.rendering_hint = RenderingHint::Transparent;
    let root = Rc::new(Node::geode(vec![triangle(Some(state.shared()))]));

    let scene = Converter::with_image_reader(None, &reader)
        .convert(&root, "scene.osgt")
        .unwrap();

    let SceneNode::DepthSorted { child, .. } = &scene.node else {
        panic!("expected a depth sorted node, got {:?}", scene.node);
    };
    assert!(matches!(child.as_ref(), SceneNode::StateGroup { state, .. } if state.transparent));
    assert!(geometries(&scene.node)[0].pipeline.blending);
}

#[test]
fn file_name_only_textures_use_search_paths() {
    let reader = FakeImageReader::new().with_image("assets/wood.png", rgb_image("wood.png"));
    let mut state = StateSet::new();
    state.set_texture(0, Texture2D::new(Rc::new(SourceImage::from_file_name("wood.png"))));
    let root = Rc::new(Node::geode(vec![triangle(Some(state.shared()))]));
    let options = Options {
        paths: vec![PathBuf::from("assets")],
        ..Default::default()
    };

    let scene = Converter::with_image_reader(Some(Arc::new(options)), &reader)
        .convert(&root, "scene.osgt")
        .unwrap();

    let states = states(&scene.node);
    let binding = &states[0].textures[&0];
    assert_eq!(binding.image.format, DataFormat::Rgba8);
    assert_eq!(binding.image.data, vec![10, 20, 30, 255, 40, 50, 60, 255]);
}

#[test]
fn overflowing_fan_ranges_are_dropped() {
    init_logger();
    let mut geometry = triangle_geometry(0.0);
    geometry.primitive_sets = vec![PrimitiveSet::DrawArrays {
        mode: PrimitiveMode::TriangleFan,
        first: u32::MAX - 1,
        count: 3,
    }];
    let fan = Rc::new(Drawable::new(geometry));
    let reader = FakeImageReader::new();

    let root = Rc::new(Node::geode(vec![fan.clone()]));
    assert!(
        Converter::with_image_reader(None, &reader)
            .convert(&root, "scene.osgt")
            .is_none()
    );

    let root = Rc::new(Node::group(vec![geode(vec![fan]), geode(vec![triangle(None)])]));
    for legacy in [false, true] {
        let options = Arc::new(Options::new().with_bool(ORIGINAL_CONVERTER, legacy));
        let scene = Converter::with_image_reader(Some(options), &reader)
            .convert(&root, "scene.osgt")
            .unwrap();
        assert_eq!(geometries(&scene.node).len(), 1);
    }
}

#[test]
fn empty_graphs_convert_to_nothing() {
    let reader = FakeImageReader::new();
    let root = Rc::new(Node::group(vec![Rc::new(Node::group(Vec::new()))]));
    assert!(
        Converter::with_image_reader(None, &reader)
            .convert(&root, "scene.osgt")
            .is_none()
    );
}

#[test]
fn build_options_round_trip_through_a_file() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("build");
    let options = Options::new().with_string(WRITE_BUILD_OPTIONS, target.to_string_lossy());
    let reader = FakeImageReader::new();

    let written = Converter::with_image_reader(Some(Arc::new(options)), &reader)
        .resolve_build_options();

    let read = BuildOptions::read(dir.path().join("build.ron")).unwrap();
    assert_eq!(read.map_rgb_to_rgba_hint, written.map_rgb_to_rgba_hint);
    assert_eq!(read.vertex_shader_path, written.vertex_shader_path);
    assert_eq!(read.extension, "ron");
    assert!(read.pipeline_cache.is_none());
}

#[test]
fn read_build_options_drive_the_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_culling.ron");
    let build_options = BuildOptions {
        insert_cull_groups: false,
        ..Default::default()
    };
    build_options.write(&path).unwrap();
    let options = Options::new().with_string(READ_BUILD_OPTIONS, path.to_string_lossy());
    let reader = FakeImageReader::new();
    let root = Rc::new(Node::group(vec![
        geode(vec![triangle(None)]),
        geode(vec![triangle(None)]),
    ]));

    let scene = Converter::with_image_reader(Some(Arc::new(options)), &reader)
        .convert(&root, "scene.osgt")
        .unwrap();

    assert!(matches!(scene.node, SceneNode::Group { .. }));
}

#[test]
fn unreadable_build_options_fall_back_to_defaults() {
    let options = Options {
        map_rgb_to_rgba_hint: false,
        ..Default::default()
    }
    .with_string(READ_BUILD_OPTIONS, "does/not/exist.ron");
    let reader = FakeImageReader::new();

    let build_options =
        Converter::with_image_reader(Some(Arc::new(options)), &reader).resolve_build_options();

    assert!(!build_options.map_rgb_to_rgba_hint);
    assert!(build_options.insert_cull_groups);
    assert!(build_options.pipeline_cache.is_some());
    assert!(build_options.options.is_some());
}
