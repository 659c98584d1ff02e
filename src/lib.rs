//! Library for writing [3D Tiles](https://www.ogc.org/standard/3dtiles/) tilesets
//! from building meshes or point clouds that are already partitioned into an octree.
//!
//! The bounds and geometric error of every node are aggregated bottom-up,
//! then the `tileset.json` manifest is written together with one glTF based
//! content file per non-empty leaf.

mod bounds;
mod error;
mod pointcloud;
mod writer;

pub mod content;
pub mod gltf;
pub mod info;
pub mod input;
pub mod projection;
pub mod tileset;
pub mod tree;

pub use bounds::Bounds;
pub use content::{ContentExporter, ContentKind, ContentWriter, TileContent};
pub use error::{Error, Result};
pub use gltf::GltfWriter;
pub use info::{NodeAggregate, TreeInformation};
pub use input::{Building, Input, Mesh, Positions, POINTS_PER_CUBIC_METER_DEFAULT};
pub use pointcloud::read_las_points;
pub use projection::{CrsTransform, Projector};
pub use tileset::{Tile, Tileset};
pub use tree::{OctreeNode, SpatialTree};
pub use writer::*;
