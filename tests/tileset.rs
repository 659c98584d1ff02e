use std::path::Path;
use tiles3d_rs::tileset::{Tile, CONTENT_GLTF_EXTENSION, MESH_GPU_INSTANCING_EXTENSION};
use tiles3d_rs::{
    Bounds, Building, ContentKind, Input, Mesh, OctreeNode, Positions, SpatialTree, Tileset,
    TilesetOptions, TilesetWriter, TILESET_FILE_NAME,
};

const WGS84: &str = "+proj=longlat +datum=WGS84 +no_defs";

fn cube(name: &str, min: [f64; 3], size: f64) -> Building {
    let mut positions = Vec::with_capacity(8);
    for i in 0..8 {
        positions.push([
            min[0] + size * (i & 1) as f64,
            min[1] + size * ((i >> 1) & 1) as f64,
            min[2] + size * ((i >> 2) & 1) as f64,
        ]);
    }
    let triangles = vec![
        [0, 1, 3],
        [0, 3, 2],
        [4, 6, 7],
        [4, 7, 5],
        [0, 4, 5],
        [0, 5, 1],
        [2, 3, 7],
        [2, 7, 6],
        [0, 2, 6],
        [0, 6, 4],
        [1, 5, 7],
        [1, 7, 3],
    ];
    Building::new(name, vec![Mesh::new(Positions::F64(positions), triangles)])
}

/// Root 0 with leaves 1..=8 holding `items`
fn two_level_tree(cell: Bounds, items: [Vec<usize>; 8]) -> SpatialTree {
    let mut nodes = vec![OctreeNode::internal(0, cell, [1, 2, 3, 4, 5, 6, 7, 8])];
    for (i, items) in items.into_iter().enumerate() {
        nodes.push(OctreeNode::leaf(i + 1, cell.octant(i), items));
    }
    SpatialTree::new(nodes, 0).unwrap()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
    }
}

fn content_files(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_dir() {
            for file in std::fs::read_dir(entry.path()).unwrap() {
                let file = file.unwrap();
                files.push(format!(
                    "{}/{}",
                    entry.file_name().to_string_lossy(),
                    file.file_name().to_string_lossy()
                ));
            }
        }
    }
    files.sort();
    files
}

fn assert_contains(parent: &Tile) {
    for child in parent.children.iter().flatten() {
        let (p, c) = (parent.bounding_volume.region, child.bounding_volume.region);
        assert!(p[0] <= c[0] + 1e-12 && p[1] <= c[1] + 1e-12, "{p:?} {c:?}");
        assert!(p[2] >= c[2] - 1e-12 && p[3] >= c[3] - 1e-12, "{p:?} {c:?}");
        assert!(p[4] <= c[4] && p[5] >= c[5], "{p:?} {c:?}");
        assert!(parent.geometric_error >= child.geometric_error);
        assert_contains(child);
    }
}

#[test]
fn single_building_leaf() {
    let dir = tempfile::tempdir().unwrap();
    let buildings = vec![cube("house", [0., 0., 0.], 1.)];
    let tree = SpatialTree::single_leaf(Bounds::new(0., 0., 0., 1., 1., 1.), vec![0]);
    let options = TilesetOptions::default()
        .crs(WGS84)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    assert_close(
        &tileset.root.bounding_volume.region,
        &[0., 0., 1f64.to_radians(), 1f64.to_radians(), 0., 1.],
    );
    assert_eq!(tileset.root.geometric_error, 0.0);
    assert!((tileset.geometric_error - 1.0).abs() < 1e-12);
    assert_eq!(tileset.root.content.as_ref().unwrap().uri, "0/0.b3dm");
    assert!(tileset.extensions_used.is_none());
    assert_eq!(content_files(dir.path()), vec!["0/0.b3dm"]);

    let b3dm = std::fs::read(dir.path().join("0").join("0.b3dm")).unwrap();
    assert_eq!(&b3dm[0..4], b"b3dm");
    assert_eq!(b3dm.len() % 8, 0);

    let json: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(dir.path().join(TILESET_FILE_NAME)).unwrap())
            .unwrap();
    assert_eq!(json["asset"]["version"], "1.0");
    assert_eq!(json["root"]["refine"], "REPLACE");
    assert_eq!(json["root"]["transform"][6], -1.0);
    assert_eq!(json["root"]["content"]["uri"], "0/0.b3dm");
    assert!(json["root"].get("children").is_none());
}

#[test]
fn empty_leaves_are_omitted() {
    let dir = tempfile::tempdir().unwrap();
    let buildings = vec![
        cube("a", [0.1, 0.1, 0.1], 0.2),
        cube("b", [0.6, 0.1, 0.1], 0.3),
    ];
    let tree = two_level_tree(
        Bounds::new(0., 0., 0., 1., 1., 1.),
        [
            vec![0],
            vec![1],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
            vec![],
        ],
    );
    let options = TilesetOptions::default()
        .crs(WGS84)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    let children = tileset.root.children.as_ref().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].content.as_ref().unwrap().uri, "1/1.b3dm");
    assert_eq!(children[1].content.as_ref().unwrap().uri, "2/2.b3dm");
    assert!(tileset.root.content.is_none());

    // union of the two buildings
    assert_close(
        &tileset.root.bounding_volume.region,
        &[
            0.1f64.to_radians(),
            0.1f64.to_radians(),
            0.9f64.to_radians(),
            0.4f64.to_radians(),
            0.1,
            0.4,
        ],
    );
    let expected = (0.2f64.powi(3) + 0.3f64.powi(3)).cbrt();
    assert!((tileset.root.geometric_error - expected).abs() < 1e-12);
    assert!((tileset.geometric_error - expected.cbrt()).abs() < 1e-12);
    assert_eq!(content_files(dir.path()), vec!["1/1.b3dm", "2/2.b3dm"]);
    assert_contains(&tileset.root);
}

#[test]
fn point_density_caps_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = fastrand::Rng::with_seed(42);
    let positions: Vec<[f64; 3]> = (0..5000)
        .map(|_| [rng.f64(), rng.f64(), rng.f64()])
        .collect();
    let tree = SpatialTree::single_leaf(Bounds::new(0., 0., 0., 1., 1., 1.), (0..5000).collect());
    let options = TilesetOptions::default()
        .crs(WGS84)
        .content_kind(ContentKind::Glb)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::points(&positions), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    assert_eq!(tileset.root.geometric_error, 0.0);
    assert!((tileset.geometric_error - 1.0).abs() < 1e-12);
    assert_eq!(content_files(dir.path()), vec!["0/0.glb"]);
    let glb = std::fs::read(dir.path().join("0").join("0.glb")).unwrap();
    assert_eq!(&glb[0..4], b"glTF");
}

#[test]
fn one_content_file_per_non_empty_leaf() {
    let dir = tempfile::tempdir().unwrap();
    let cell = Bounds::new(0., 0., 0., 2., 2., 2.);
    let mut rng = fastrand::Rng::with_seed(7);

    // root 0 -> 1..=8, node 1 -> 9..=16
    let mut nodes = vec![OctreeNode::internal(0, cell, [1, 2, 3, 4, 5, 6, 7, 8])];
    nodes.push(OctreeNode::internal(
        1,
        cell.octant(0),
        [9, 10, 11, 12, 13, 14, 15, 16],
    ));
    for i in 1..8 {
        nodes.push(OctreeNode::leaf(i + 1, cell.octant(i), vec![]));
    }
    for i in 0..8 {
        nodes.push(OctreeNode::leaf(9 + i, cell.octant(0).octant(i), vec![]));
    }
    let mut positions = Vec::new();
    for node in nodes.iter_mut().filter(|n| n.is_leaf()) {
        // leave about a third of the leaves empty
        if rng.u8(0..3) == 0 {
            continue;
        }
        let c = node.cell;
        let mut items = Vec::new();
        for _ in 0..rng.usize(1..50) {
            items.push(positions.len());
            positions.push([
                c.min_x + rng.f64() * (c.max_x - c.min_x),
                c.min_y + rng.f64() * (c.max_y - c.min_y),
                c.min_z + rng.f64() * (c.max_z - c.min_z),
            ]);
        }
        node.items = Some(items);
    }
    let non_empty: Vec<usize> = nodes
        .iter()
        .filter(|n| n.is_leaf() && !n.items().is_empty())
        .map(|n| n.id)
        .collect();
    let tree = SpatialTree::new(nodes, 0).unwrap();

    let options = TilesetOptions::default()
        .crs(WGS84)
        .content_kind(ContentKind::Gltf)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::points(&positions), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    let mut expected: Vec<String> = non_empty.iter().map(|id| format!("{id}/{id}.gltf")).collect();
    expected.sort();
    assert_eq!(content_files(dir.path()), expected);
    assert_eq!(writer.exporter().written().len(), non_empty.len());
    assert_eq!(writer.exporter().failed(), 0);
    assert_contains(&tileset.root);

    for id in &non_empty {
        let path = dir.path().join(id.to_string()).join(format!("{id}.gltf"));
        let gltf: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(gltf["asset"]["version"], "2.0");
    }
}

#[test]
fn gltf_contents_declare_extensions() {
    for kind in [ContentKind::Glb, ContentKind::Gltf] {
        let dir = tempfile::tempdir().unwrap();
        let positions = vec![[0.5, 0.5, 0.5]];
        let tree = SpatialTree::single_leaf(Bounds::new(0., 0., 0., 1., 1., 1.), vec![0]);
        let options = TilesetOptions::default()
            .crs(WGS84)
            .content_kind(kind)
            .output_dir(dir.path());
        let mut writer = TilesetWriter::new(&tree, Input::points(&positions), options).unwrap();
        let tileset = writer.write_to_output_dir().unwrap();

        let used = vec![CONTENT_GLTF_EXTENSION.to_string()];
        assert_eq!(tileset.extensions_used.as_ref(), Some(&used));
        assert_eq!(tileset.extensions_required.as_ref(), Some(&used));
        let declaration = &tileset.extensions.as_ref().unwrap()[CONTENT_GLTF_EXTENSION];
        assert_eq!(
            declaration.extensions_used,
            vec![MESH_GPU_INSTANCING_EXTENSION.to_string()]
        );
    }
}

#[test]
fn unusable_crs_still_writes_the_manifest() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let buildings = vec![cube("a", [10., 20., 30.], 5.)];
    let tree = SpatialTree::single_leaf(Bounds::new(10., 20., 30., 15., 25., 35.), vec![0]);
    let options = TilesetOptions::default()
        .crs("+proj=doesnotexist")
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    assert_eq!(tileset.root.bounding_volume.region, [0., 0., 0., 0., 30., 35.]);
    assert!(tileset.root.content.is_none());
    assert_eq!(writer.exporter().failed(), 1);
    assert!(content_files(dir.path()).is_empty());
    assert!(dir.path().join(TILESET_FILE_NAME).is_file());
}

#[test]
fn projected_crs_by_epsg_code() {
    let dir = tempfile::tempdir().unwrap();
    // UTM zone 32N around the central meridian
    let buildings = vec![cube("a", [500_000., 5_000_000., 0.], 10.)];
    let tree = SpatialTree::single_leaf(
        Bounds::new(500_000., 5_000_000., 0., 500_010., 5_000_010., 10.),
        vec![0],
    );
    let options = TilesetOptions::default()
        .crs("EPSG:32632")
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    let region = tileset.root.bounding_volume.region;
    assert!((region[0] - 9f64.to_radians()).abs() < 1e-6, "{region:?}");
    assert!(region[0] < region[2] && region[1] < region[3]);
    assert_eq!(&region[4..], &[0., 10.]);
    assert_eq!(content_files(dir.path()), vec!["0/0.b3dm"]);
}

#[test]
fn invalid_density_is_rejected() {
    let positions = vec![[0., 0., 0.]];
    let tree = SpatialTree::single_leaf(Bounds::new(0., 0., 0., 1., 1., 1.), vec![0]);
    for density in [0.0, -1.0, f64::NAN] {
        let result = TilesetWriter::new(
            &tree,
            Input::points_with_density(&positions, density),
            TilesetOptions::default(),
        );
        assert!(matches!(result, Err(tiles3d_rs::Error::InvalidDensity(_))));
    }
}

#[test]
fn tileset_error_of_a_two_level_tree() {
    let dir = tempfile::tempdir().unwrap();
    let buildings = vec![cube("a", [0., 0., 0.], 1.), cube("b", [3., 3., 3.], 1.)];
    let mut items: [Vec<usize>; 8] = Default::default();
    items[0] = vec![0];
    items[7] = vec![1];
    let tree = two_level_tree(Bounds::new(0., 0., 0., 4., 4., 4.), items);
    let options = TilesetOptions::default()
        .crs(WGS84)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    let root_error = 2f64.cbrt();
    assert!((tileset.root.geometric_error - root_error).abs() < 1e-12);
    assert!((tileset.geometric_error - root_error.cbrt()).abs() < 1e-12);
    assert!((tileset.geometric_error - 1.0801).abs() < 1e-4);
}

#[test]
fn items_without_geometry_keep_the_manifest_valid() {
    let dir = tempfile::tempdir().unwrap();
    let buildings = vec![Building::new("empty", vec![]), cube("a", [0.6, 0.1, 0.1], 0.3)];
    let mut items: [Vec<usize>; 8] = Default::default();
    items[0] = vec![0];
    items[1] = vec![1];
    let tree = two_level_tree(Bounds::new(0., 0., 0., 1., 1., 1.), items);
    let options = TilesetOptions::default()
        .crs(WGS84)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    let children = tileset.root.children.as_ref().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].content.as_ref().unwrap().uri, "2/2.b3dm");
    assert!(tileset.root.bounding_volume.region.iter().all(|v| v.is_finite()));
    assert_eq!(content_files(dir.path()), vec!["2/2.b3dm"]);

    let text = std::fs::read_to_string(dir.path().join(TILESET_FILE_NAME)).unwrap();
    assert!(!text.contains("null"));
    let parsed: Tileset = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed.root.count(), tileset.root.count());

    // a root holding only geometry-less items is written as an empty root
    let dir = tempfile::tempdir().unwrap();
    let tree = SpatialTree::single_leaf(Bounds::new(0., 0., 0., 1., 1., 1.), vec![0]);
    let options = TilesetOptions::default()
        .crs(WGS84)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();
    assert_eq!(tileset.root.bounding_volume.region, [0.0; 6]);
    assert!(tileset.root.content.is_none());
    assert!(content_files(dir.path()).is_empty());
}

#[test]
fn unwritable_content_destination_skips_only_that_tile() {
    let dir = tempfile::tempdir().unwrap();
    // a plain file where the directory of node 1 belongs
    std::fs::write(dir.path().join("1"), b"").unwrap();
    let buildings = vec![
        cube("a", [0.1, 0.1, 0.1], 0.2),
        cube("b", [0.6, 0.1, 0.1], 0.3),
    ];
    let mut items: [Vec<usize>; 8] = Default::default();
    items[0] = vec![0];
    items[1] = vec![1];
    let tree = two_level_tree(Bounds::new(0., 0., 0., 1., 1., 1.), items);
    let options = TilesetOptions::default()
        .crs(WGS84)
        .output_dir(dir.path());
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options).unwrap();
    let tileset = writer.write_to_output_dir().unwrap();

    let children = tileset.root.children.as_ref().unwrap();
    assert_eq!(children.len(), 2);
    let uris: Vec<Option<&str>> = children
        .iter()
        .map(|c| c.content.as_ref().map(|c| c.uri.as_str()))
        .collect();
    assert_eq!(uris, vec![None, Some("2/2.b3dm")]);
    assert_eq!(writer.exporter().failed(), 1);
    assert_eq!(writer.exporter().written().len(), 1);
    assert_eq!(content_files(dir.path()), vec!["2/2.b3dm"]);
    assert!(dir.path().join(TILESET_FILE_NAME).is_file());
}
