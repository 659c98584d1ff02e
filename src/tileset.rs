//! 3D Tiles manifest (`tileset.json`).

use crate::content::{ContentExporter, ContentWriter};
use crate::info::TreeInformation;
use crate::input::Input;
use crate::projection::Projector;
use crate::tree::{OctreeNode, SpatialTree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extension declaring glTF tile contents
pub const CONTENT_GLTF_EXTENSION: &str = "3DTILES_content_gltf";
/// glTF extension declared for glTF tile contents
pub const MESH_GPU_INSTANCING_EXTENSION: &str = "EXT_mesh_gpu_instancing";

/// Axis convention transform of the root tile, column major
pub const ROOT_TRANSFORM: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, -1.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDeclaration {
    pub extensions_used: Vec<String>,
    pub extensions_required: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tileset {
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions_used: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions_required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeMap<String, ExtensionDeclaration>>,
    pub geometric_error: f64,
    pub root: Tile,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingVolume {
    /// `[west, south, east, north, min height, max height]`, angles in radians
    pub region: [f64; 6],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Refine {
    Replace,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub uri: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub bounding_volume: BoundingVolume,
    pub geometric_error: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refine: Option<Refine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 16]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Tile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

impl Tile {
    /// Number of tiles in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().flatten().map(Tile::count).sum::<usize>()
    }
}

/// Builds the manifest tree, exporting leaf contents on the way.
pub struct ManifestBuilder<'a, W> {
    pub(crate) tree: &'a SpatialTree,
    pub(crate) input: &'a Input<'a>,
    pub(crate) info: &'a TreeInformation,
    pub(crate) projector: &'a Projector,
    pub(crate) exporter: &'a mut ContentExporter<W>,
}

impl<W: ContentWriter> ManifestBuilder<'_, W> {
    /// The whole manifest. The root is emitted even if the tree is empty.
    pub fn build(&mut self) -> Tileset {
        let tree = self.tree;
        self.exporter.reset();
        let kind = self.exporter.kind();
        let (extensions_used, extensions_required, extensions) =
            if kind.requires_gltf_extension() {
                let used = vec![CONTENT_GLTF_EXTENSION.to_string()];
                let declaration = ExtensionDeclaration {
                    extensions_used: vec![MESH_GPU_INSTANCING_EXTENSION.to_string()],
                    extensions_required: vec![MESH_GPU_INSTANCING_EXTENSION.to_string()],
                };
                (
                    Some(used.clone()),
                    Some(used),
                    Some(BTreeMap::from([(
                        CONTENT_GLTF_EXTENSION.to_string(),
                        declaration,
                    )])),
                )
            } else {
                (None, None, None)
            };
        Tileset {
            asset: Asset {
                version: "1.0".to_string(),
            },
            extensions_used,
            extensions_required,
            extensions,
            geometric_error: self.info.tileset_geometric_error(tree, self.input),
            root: self.build_tile(tree.root()),
        }
    }

    /// Manifest tile of `node`, recursing into its non-empty children in index order
    pub fn build_tile(&mut self, node: &OctreeNode) -> Tile {
        let (tree, info) = (self.tree, self.info);
        let aggregate = info.get(node.id);
        let is_root = node.id == tree.root().id;
        let mut tile = Tile {
            bounding_volume: BoundingVolume {
                region: if aggregate.empty {
                    [0.0; 6]
                } else {
                    self.projector.region(&aggregate.bounds)
                },
            },
            geometric_error: aggregate.geometric_error,
            refine: None,
            transform: None,
            children: None,
            content: None,
        };
        if is_root {
            tile.refine = Some(Refine::Replace);
            tile.transform = Some(ROOT_TRANSFORM);
        }
        if !node.is_leaf() {
            let children: Vec<Tile> = tree
                .children(node)
                .filter(|child| !info.is_empty(child.id))
                .map(|child| self.build_tile(child))
                .collect();
            if !children.is_empty() {
                tile.children = Some(children);
            }
        } else if !aggregate.empty {
            tile.content = self
                .exporter
                .export(node.id, self.input, node.items(), self.projector)
                .map(|uri| Content { uri });
        }
        tile
    }
}
