use std::env;
use tiles3d_rs::{
    Bounds, Building, ContentKind, Input, Mesh, OctreeNode, Positions, SpatialTree,
    TilesetOptions, TilesetWriter,
};

/// A box shaped building with its footprint at `(x, y)` in UTM zone 32N
fn block(name: String, x: f64, y: f64, height: f64) -> Building {
    let size = 20.0;
    let positions = (0..8)
        .map(|i| {
            [
                x + size * (i & 1) as f64,
                y + size * ((i >> 1) & 1) as f64,
                height * ((i >> 2) & 1) as f64,
            ]
        })
        .collect();
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

fn main() -> tiles3d_rs::Result<()> {
    env_logger::init();
    let output_dir = env::args().nth(1).unwrap_or_else(|| "buildings".to_string());

    let (x0, y0) = (500_000.0, 5_000_000.0);
    let cell = Bounds::new(x0, y0, 0.0, x0 + 400.0, y0 + 400.0, 400.0);

    // a 10x10 grid of blocks, assigned to the lower octants of the root
    let mut buildings = Vec::new();
    let mut items: [Vec<usize>; 8] = Default::default();
    for row in 0..10 {
        for col in 0..10 {
            let (x, y) = (x0 + 40.0 * col as f64, y0 + 40.0 * row as f64);
            let octant = usize::from(col >= 5) + 2 * usize::from(row >= 5);
            items[octant].push(buildings.len());
            buildings.push(block(
                format!("block-{row}-{col}"),
                x,
                y,
                10.0 + 5.0 * ((row * col) % 7) as f64,
            ));
        }
    }
    let mut nodes = vec![OctreeNode::internal(0, cell, [1, 2, 3, 4, 5, 6, 7, 8])];
    for (i, items) in items.into_iter().enumerate() {
        nodes.push(OctreeNode::leaf(i + 1, cell.octant(i), items));
    }
    let tree = SpatialTree::new(nodes, 0)?;

    let options = TilesetOptions::default()
        .crs("EPSG:32632")
        .content_kind(ContentKind::B3dm)
        .merge_tile_meshes(true)
        .output_dir(&output_dir);
    let mut writer = TilesetWriter::new(&tree, Input::buildings(&buildings), options)?;
    let tileset = writer.write_to_output_dir()?;
    println!(
        "Wrote {} tiles to {output_dir}, geometric error {:.2}",
        tileset.root.count(),
        tileset.geometric_error
    );

    Ok(())
}
