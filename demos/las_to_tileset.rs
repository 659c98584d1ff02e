use std::env;
use tiles3d_rs::{
    read_las_points, Bounds, ContentKind, Input, OctreeNode, SpatialTree, TilesetOptions,
    TilesetWriter,
};

const MAX_POINTS_PER_LEAF: usize = 50_000;
const MAX_DEPTH: usize = 8;

/// Splits `items` until every leaf holds at most `MAX_POINTS_PER_LEAF` points
fn subdivide(
    nodes: &mut Vec<OctreeNode>,
    positions: &[[f64; 3]],
    cell: Bounds,
    items: Vec<usize>,
    depth: usize,
) -> usize {
    let id = nodes.len();
    if items.len() <= MAX_POINTS_PER_LEAF || depth == MAX_DEPTH {
        nodes.push(OctreeNode::leaf(id, cell, items));
        return id;
    }
    nodes.push(OctreeNode::leaf(id, cell, vec![]));
    let center = cell.center();
    let mut octants: [Vec<usize>; 8] = Default::default();
    for i in items {
        let p = positions[i];
        let octant = usize::from(p[0] >= center[0])
            + 2 * usize::from(p[1] >= center[1])
            + 4 * usize::from(p[2] >= center[2]);
        octants[octant].push(i);
    }
    let mut children = [0; 8];
    for (i, items) in octants.into_iter().enumerate() {
        children[i] = subdivide(nodes, positions, cell.octant(i), items, depth + 1);
    }
    nodes[id] = OctreeNode::internal(id, cell, children);
    id
}

fn main() -> tiles3d_rs::Result<()> {
    env_logger::init();
    let lasfn = env::args().nth(1).expect("LAS file required");
    let crs = env::args().nth(2).expect("CRS required, e.g. EPSG:2056");
    let output_dir = env::args().nth(3).unwrap_or_else(|| "points".to_string());

    let positions = read_las_points(&lasfn)?;
    let mut cell = Bounds::default();
    for p in &positions {
        cell.expand_xyz(p[0], p[1], p[2]);
    }

    let mut nodes = Vec::new();
    let root = subdivide(&mut nodes, &positions, cell, (0..positions.len()).collect(), 0);
    let tree = SpatialTree::new(nodes, root)?;

    let options = TilesetOptions::default()
        .crs(crs)
        .content_kind(ContentKind::Glb)
        .output_dir(&output_dir);
    let mut writer = TilesetWriter::new(&tree, Input::points(&positions), options)?;
    let tileset = writer.write_to_output_dir()?;
    println!(
        "Wrote {} tiles for {} points to {output_dir}",
        tileset.root.count(),
        positions.len()
    );

    Ok(())
}
